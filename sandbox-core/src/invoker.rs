//! The Tool Wrapper: the fixed, closed pipeline every guest-bound tool call
//! runs through.
//!
//! Modelled on a `neuron-tool`-style middleware pipeline
//! (`ToolMiddleware`/`Next`, axum-`from_fn`-shaped), but closed rather than
//! user-extensible: callers never get to add their own stage, only seven
//! fixed steps run, in order, so `ToolInvoker::invoke` is a straight
//! `?`-chained sequence of private steps rather than a literal `Next`
//! continuation threading a caller-assembled `Vec`. The ordering guarantee
//! a `Next` chain exists to protect — each stage either short-circuits or
//! hands off to the next — is preserved all the same: nothing here
//! interleaves.

use crate::collaborators::{WorkflowStatus, WorkflowStore};
use crate::context::ExecutionContext;
use sandbox_classify::ClassifiedError;
use sandbox_phase::{Operation, PhaseController};
use sandbox_schema::validate;
use sandbox_tool::{ToolDyn, ToolId, ToolRegistry};
use serde_json::Value;
use std::cell::RefCell;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Workflow-mode configuration: present only when the caller bound a
/// `workflow_id`. Enables workflow-liveness checks before each call and
/// turns an invalid-input classification into a fatal abort of the whole
/// workflow rather than a recoverable per-call error.
struct WorkflowMode {
    store: Arc<dyn WorkflowStore>,
    abort: CancellationToken,
}

/// Binds a [`ToolRegistry`] and a [`PhaseController`] together and runs
/// every call through the fixed seven-step pipeline.
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
    phase: RefCell<PhaseController>,
    workflow: Option<WorkflowMode>,
}

impl ToolInvoker {
    /// Build an invoker with no workflow-liveness checking (task mode).
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, phase: PhaseController) -> Self {
        Self {
            registry,
            phase: RefCell::new(phase),
            workflow: None,
        }
    }

    /// Enable workflow-liveness checks and fatal-abort-on-invalid-input.
    #[must_use]
    pub fn with_workflow_store(mut self, store: Arc<dyn WorkflowStore>, abort: CancellationToken) -> Self {
        self.workflow = Some(WorkflowMode { store, abort });
        self
    }

    /// Change the current phase, resetting the single-mutation latch.
    pub fn set_phase(&self, phase: sandbox_phase::Phase) {
        self.phase.borrow_mut().set_phase(phase);
    }

    /// Run one tool call through the fixed pipeline.
    pub async fn invoke(&self, id: &ToolId, input: Value, exec: &ExecutionContext) -> Result<Value, ClassifiedError> {
        let tool = self
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| ClassifiedError::logic(format!("unknown tool '{id}'")).with_source(id.qualified()))?;

        self.check_workflow_liveness(exec).await?;
        self.validate_input(tool.as_ref(), id, &input, exec)?;

        let op = classify_operation(id, tool.as_ref(), &input);
        self.phase.borrow_mut().check(op)?;

        tracing::debug!(tool = %id, op = ?op, "sandbox.tool.dispatch");
        let output = tool.call_dyn(input).await.map_err(|err| {
            err.with_source(id.qualified())
                .with_message_prefix(format!("Failed at {id}: "))
        })?;

        self.validate_output(tool.as_ref(), id, &output)?;
        tracing::debug!(tool = %id, "sandbox.tool.settled");
        Ok(output)
    }

    /// Step 1: if a `workflow_id` is bound, fail the run (not the call)
    /// when the workflow is no longer active.
    async fn check_workflow_liveness(&self, exec: &ExecutionContext) -> Result<(), ClassifiedError> {
        let Some(workflow) = &self.workflow else {
            return Ok(());
        };
        let Some(workflow_id) = &exec.workflow_id else {
            return Ok(());
        };
        match workflow.store.get(workflow_id).await? {
            None | Some(WorkflowStatus::Active) => Ok(()),
            Some(_) => Err(ClassifiedError::WorkflowPaused {
                message: format!("workflow {workflow_id} is no longer active"),
            }),
        }
    }

    /// Step 2: validate input against the tool's declared schema. In
    /// workflow mode, an invalid call is fatal: the error is stashed on
    /// the Execution Context and the sandbox is signalled to abort.
    fn validate_input(
        &self,
        tool: &dyn ToolDyn,
        id: &ToolId,
        input: &Value,
        exec: &ExecutionContext,
    ) -> Result<(), ClassifiedError> {
        if let Err(reason) = validate(tool.input_schema(), input) {
            let err = ClassifiedError::logic(format!("invalid input for {id}: {reason}")).with_source(id.qualified());
            if let Some(workflow) = &self.workflow {
                if exec.workflow_id.is_some() {
                    exec.stash_error(err.clone());
                    workflow.abort.cancel();
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Step 6: validate the tool's output, when it declares an output
    /// schema.
    fn validate_output(&self, tool: &dyn ToolDyn, id: &ToolId, output: &Value) -> Result<(), ClassifiedError> {
        let Some(schema) = tool.output_schema() else {
            return Ok(());
        };
        validate(schema, output)
            .map_err(|reason| ClassifiedError::logic(format!("invalid output from {id}: {reason}")).with_source(id.qualified()))
    }
}

/// Step 3: classify the call into one of the four operation classes.
///
/// Topic-specific names (`peek`/`getByIds`/`publish`) are recognised by
/// name regardless of namespace; everything else falls back to the tool's
/// `is_read_only` predicate. A predicate that panics collapses to
/// `Mutate` (conservative) rather than poisoning the call.
fn classify_operation(id: &ToolId, tool: &dyn ToolDyn, input: &Value) -> Operation {
    match id.name.as_str() {
        "peek" | "getByIds" => return Operation::TopicPeek,
        "publish" => return Operation::TopicPublish,
        _ => {}
    }
    let read_only = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| tool.is_read_only(input))).unwrap_or(false);
    if read_only {
        Operation::Read
    } else {
        Operation::Mutate
    }
}
