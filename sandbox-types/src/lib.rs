//! Shared identifiers, the `EvalResult` wire type, and wasm-compat shims used
//! across the sandbox crates.

pub mod eval;
pub mod ids;
pub mod wasm;

pub use eval::*;
pub use ids::*;
pub use wasm::*;
