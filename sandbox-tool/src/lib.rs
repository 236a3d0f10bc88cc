//! The tool registry: `(namespace, name)`-addressed tools with typed
//! schemas and guest-facing documentation synthesis.

pub mod docs;
pub mod registry;
pub mod tool;

pub use docs::render_doc;
pub use registry::ToolRegistry;
pub use tool::{ToolDyn, ToolId};
