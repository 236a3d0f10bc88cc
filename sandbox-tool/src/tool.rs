//! The `Tool` abstraction: a typed, named capability exposed to the guest
//! under a namespace.

use sandbox_classify::ClassifiedError;
use sandbox_schema::SchemaNode;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Object-safe tool trait. Any concrete tool (Gmail, Drive, Notion, …,
/// none of which are implemented here) implements this and is stored as
/// `Arc<dyn ToolDyn>` in a [`crate::ToolRegistry`].
pub trait ToolDyn: Send + Sync {
    /// The namespace this tool is registered under, e.g. `"Gmail"`.
    fn namespace(&self) -> &str;

    /// The tool's name within its namespace, e.g. `"send"`.
    fn name(&self) -> &str;

    /// Human-readable description, included verbatim in generated docs.
    fn description(&self) -> &str;

    /// A one-line example invocation, included in generated docs.
    fn example(&self) -> Option<&str> {
        None
    }

    /// The input schema.
    fn input_schema(&self) -> &SchemaNode;

    /// The output schema, when the tool documents one.
    fn output_schema(&self) -> Option<&SchemaNode> {
        None
    }

    /// Whether this call is read-only. Absent means "always a mutation".
    ///
    /// A panicking/erroring predicate is treated as `false` (conservative).
    fn is_read_only(&self, _input: &Value) -> bool {
        false
    }

    /// Execute the tool body.
    fn call_dyn(
        &self,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ClassifiedError>> + Send + '_>>;
}

/// The fully-qualified address of a tool: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToolId {
    pub namespace: String,
    pub name: String,
}

impl ToolId {
    /// Build a `ToolId`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Render as `"Namespace.Name"`, the form used in error messages and
    /// docs lookups.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

impl std::fmt::Display for ToolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified())
    }
}
