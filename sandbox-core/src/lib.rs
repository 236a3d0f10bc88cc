//! The execution context, the tool-wrapper binding layer, and the facade
//! that wires a sandbox, a tool registry, and a phase controller together
//! for an embedding host.

pub mod collaborators;
pub mod context;
pub mod facade;
pub mod invoker;

pub use collaborators::{ConnectionManager, Connection, EventSink, LogSink, OAuthCredentials, WorkflowStatus, WorkflowStore};
pub use context::ExecutionContext;
pub use facade::SandboxCore;
pub use invoker::ToolInvoker;
