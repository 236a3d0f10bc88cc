//! The tool registry: `(namespace, name)`-keyed storage plus documentation
//! synthesis.

use crate::docs::render_doc;
use crate::tool::{ToolDyn, ToolId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Registry of tools available to a sandbox session.
///
/// Mirrors `neuron-tool::ToolRegistry`'s `HashMap<name, Arc<dyn ToolDyn>>`
/// shape, keyed here by the pair `(namespace, name)` since tool addresses
/// are namespaced (the uniqueness invariant is over the
/// pair, not the bare name).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn ToolDyn>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Overwrites any existing tool at the same
    /// `(namespace, name)`.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        let id = ToolId::new(tool.namespace(), tool.name());
        self.tools.insert(id, tool);
    }

    /// Look up a tool by its fully-qualified address.
    #[must_use]
    pub fn get(&self, id: &ToolId) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(id)
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolDyn>> {
        self.tools.values()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Rendered documentation for every tool, keyed by `"Namespace.Name"`.
    ///
    /// A `BTreeMap` rather than a `HashMap` so `get_docs`'s prefix
    /// concatenation (below) is deterministically ordered.
    #[must_use]
    pub fn docs(&self) -> BTreeMap<String, String> {
        self.tools
            .values()
            .map(|tool| (ToolId::new(tool.namespace(), tool.name()).qualified(), render_doc(tool.as_ref())))
            .collect()
    }

    /// The guest-visible `getDocs(name)` helper: an exact `"Namespace.Name"`
    /// match, or the concatenation of every doc whose key starts with
    /// `name` (supporting namespace-level help).
    #[must_use]
    pub fn get_docs(&self, name: &str) -> Option<String> {
        let docs = self.docs();
        if let Some(doc) = docs.get(name) {
            return Some(doc.clone());
        }
        let matches: Vec<&String> = docs
            .iter()
            .filter(|(key, _)| key.starts_with(name))
            .map(|(_, doc)| doc)
            .collect();
        if matches.is_empty() {
            None
        } else {
            Some(
                matches
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolDyn;
    use sandbox_classify::ClassifiedError;
    use sandbox_schema::SchemaNode;
    use serde_json::{json, Value};
    use std::future::Future;
    use std::pin::Pin;

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn namespace(&self) -> &str {
            "Demo"
        }
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes input back."
        }
        fn input_schema(&self) -> &SchemaNode {
            static SCHEMA: std::sync::OnceLock<SchemaNode> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| SchemaNode::primitive("string"))
        }
        fn call_dyn(
            &self,
            input: Value,
        ) -> Pin<Box<dyn Future<Output = Result<Value, ClassifiedError>> + Send + '_>> {
            Box::pin(async move { Ok(json!({ "echoed": input })) })
        }
    }

    #[test]
    fn register_and_get_by_qualified_id() {
        let mut reg = ToolRegistry::new();
        assert!(reg.is_empty());
        reg.register(Arc::new(EchoTool));
        assert_eq!(reg.len(), 1);
        assert!(reg.get(&ToolId::new("Demo", "echo")).is_some());
        assert!(reg.get(&ToolId::new("Demo", "missing")).is_none());
    }

    #[test]
    fn get_docs_supports_exact_and_prefix_match() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        assert!(reg.get_docs("Demo.echo").is_some());
        assert!(reg.get_docs("Demo").unwrap().contains("Echoes input back."));
        assert!(reg.get_docs("Nope").is_none());
    }

    #[tokio::test]
    async fn call_dyn_executes_the_tool() {
        let mut reg = ToolRegistry::new();
        reg.register(Arc::new(EchoTool));
        let tool = reg.get(&ToolId::new("Demo", "echo")).unwrap();
        let out = tool.call_dyn(json!("hi")).await.unwrap();
        assert_eq!(out, json!({ "echoed": "hi" }));
    }
}
