//! Closed error taxonomy and deterministic classification rules for tool
//! failures.

pub mod error;
pub mod rules;

pub use error::*;
pub use rules::*;
