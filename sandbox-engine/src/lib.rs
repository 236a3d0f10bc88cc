//! The script sandbox: owns one `boa_engine` interpreter instance, enforces
//! non-reentrant `evaluate`, and wires up deadlines, cancellation, and the
//! pending-job pump.

pub mod host_calls;
pub mod options;
pub mod sandbox;

pub use options::{EvaluateOptions, SandboxOptions, SandboxOptionsBuilder};
pub use sandbox::Sandbox;
