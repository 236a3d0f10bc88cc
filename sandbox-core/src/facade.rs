//! The embedding-host facade: wires a [`Sandbox`], a [`ToolRegistry`], and
//! a [`PhaseController`] together so a host only has to build one thing to
//! run a script against a catalogue of tools.

use crate::collaborators::WorkflowStore;
use crate::context::ExecutionContext;
use crate::invoker::ToolInvoker;
use sandbox_classify::ClassifiedError;
use sandbox_engine::{EvaluateOptions, Sandbox, SandboxOptions};
use sandbox_marshal::{HandleTable, HostCallOutcomeKind, HostFunction};
use sandbox_phase::{Phase, PhaseController};
use sandbox_tool::ToolRegistry;
use sandbox_types::EvalResult;
use serde_json::Value;
use std::rc::Rc;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A guest-bound tool call: resolves to the tool's fully-qualified address
/// and dispatches through a shared [`ToolInvoker`]/[`ExecutionContext`].
///
/// Every call is dispatched as [`HostCallOutcomeKind::Pending`] — tool
/// bodies are async, so there is no synchronous fast path to take here;
/// the sandbox's pending-job pump drives the invocation to completion and
/// settles the guest promise it returned.
struct BoundTool {
    id: sandbox_tool::ToolId,
    invoker: Rc<ToolInvoker>,
    exec: Rc<ExecutionContext>,
}

impl HostFunction for BoundTool {
    fn call(&self, args: Vec<Value>, _table: &HandleTable) -> HostCallOutcomeKind {
        let input = args.into_iter().next().unwrap_or(Value::Null);
        let invoker = Rc::clone(&self.invoker);
        let exec = Rc::clone(&self.exec);
        let id = self.id.clone();
        HostCallOutcomeKind::Pending(Box::pin(async move { invoker.invoke(&id, input, &exec).await }))
    }
}

/// The guest-visible `getDocs(name)` helper, bound as a synchronous global.
struct GetDocsTool {
    registry: Arc<ToolRegistry>,
}

impl HostFunction for GetDocsTool {
    fn call(&self, args: Vec<Value>, _table: &HandleTable) -> HostCallOutcomeKind {
        let name = args.first().and_then(Value::as_str).unwrap_or_default();
        let doc = self.registry.get_docs(name).map_or(Value::Null, Value::String);
        HostCallOutcomeKind::Ready(Ok(doc))
    }
}

/// The wired-together embedding surface: one sandbox, one tool registry,
/// one phase controller, one execution context, bound for a single run.
pub struct SandboxCore {
    sandbox: Sandbox,
    invoker: Rc<ToolInvoker>,
    exec: Rc<ExecutionContext>,
}

impl SandboxCore {
    /// Build a `SandboxCore`: initialises the interpreter, then binds every
    /// registered tool as a method on its namespace's guest-global object
    /// (`Gmail.send(input)` rather than a flat `"Namespace.Name"` global),
    /// plus a top-level `getDocs(name)` global backed by the registry's
    /// documentation synthesis.
    pub fn new(
        sandbox_options: SandboxOptions,
        registry: Arc<ToolRegistry>,
        initial_phase: Phase,
        exec: ExecutionContext,
        workflow: Option<(Arc<dyn WorkflowStore>, CancellationToken)>,
    ) -> Result<Self, ClassifiedError> {
        let sandbox = Sandbox::initialise(sandbox_options)?;
        let mut invoker = ToolInvoker::new(Arc::clone(&registry), PhaseController::new(initial_phase));
        if let Some((store, abort)) = workflow {
            invoker = invoker.with_workflow_store(store, abort);
        }
        let invoker = Rc::new(invoker);
        let exec = Rc::new(exec);

        for tool in registry.iter() {
            let id = sandbox_tool::ToolId::new(tool.namespace(), tool.name());
            sandbox.bind_namespaced_tool(
                tool.namespace(),
                tool.name(),
                BoundTool {
                    id,
                    invoker: Rc::clone(&invoker),
                    exec: Rc::clone(&exec),
                },
            )?;
        }

        sandbox.bind_tool(
            "getDocs",
            GetDocsTool {
                registry: Arc::clone(&registry),
            },
        )?;

        Ok(Self { sandbox, invoker, exec })
    }

    /// Move the phase controller to a new phase before the next guest
    /// evaluation, resetting the single-mutation latch.
    pub fn set_phase(&self, phase: Phase) {
        self.invoker.set_phase(phase);
    }

    /// Evaluate guest source code against the bound tool catalogue.
    pub async fn evaluate(&self, code: &str, opts: EvaluateOptions) -> EvalResult {
        self.sandbox.evaluate(code, opts).await
    }

    /// The execution context this core was built with.
    #[must_use]
    pub fn execution_context(&self) -> &ExecutionContext {
        &self.exec
    }

    /// Release the interpreter. Idempotent.
    pub fn dispose(&self) {
        self.sandbox.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::test_support::{RecordingEventSink, RecordingLogSink};
    use sandbox_classify::ClassifiedError as CE;
    use sandbox_schema::SchemaNode;
    use std::future::Future;
    use std::pin::Pin;

    struct UpperTool;

    impl sandbox_tool::ToolDyn for UpperTool {
        fn namespace(&self) -> &str {
            "Text"
        }
        fn name(&self) -> &str {
            "upper"
        }
        fn description(&self) -> &str {
            "Uppercases a string."
        }
        fn input_schema(&self) -> &SchemaNode {
            static SCHEMA: std::sync::OnceLock<SchemaNode> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| SchemaNode::primitive("string"))
        }
        fn is_read_only(&self, _input: &Value) -> bool {
            true
        }
        fn call_dyn(
            &self,
            input: Value,
        ) -> Pin<Box<dyn Future<Output = Result<Value, CE>> + Send + '_>> {
            Box::pin(async move {
                let s = input.as_str().unwrap_or_default().to_uppercase();
                Ok(Value::String(s))
            })
        }
    }

    #[tokio::test]
    async fn bound_tool_is_callable_from_guest_code() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));
        let exec = ExecutionContext::new(Arc::new(RecordingEventSink::default()), Arc::new(RecordingLogSink::default()));
        let core = SandboxCore::new(SandboxOptions::default(), Arc::new(registry), Phase::Null, exec, None).unwrap();

        let result = core
            .evaluate("return await Text.upper('abc');", EvaluateOptions::default())
            .await;
        match result {
            EvalResult::Ok { result, .. } => assert_eq!(result, serde_json::json!("ABC")),
            EvalResult::Err { error_message } => panic!("unexpected error: {error_message}"),
        }
    }

    #[tokio::test]
    async fn get_docs_is_reachable_from_guest_code() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool));
        let exec = ExecutionContext::new(Arc::new(RecordingEventSink::default()), Arc::new(RecordingLogSink::default()));
        let core = SandboxCore::new(SandboxOptions::default(), Arc::new(registry), Phase::Null, exec, None).unwrap();

        let result = core
            .evaluate("return getDocs('Text.upper');", EvaluateOptions::default())
            .await;
        match result {
            EvalResult::Ok { result, .. } => {
                assert!(result.as_str().unwrap_or_default().contains("Uppercases a string."));
            }
            EvalResult::Err { error_message } => panic!("unexpected error: {error_message}"),
        }
    }
}
