//! The per-run `ExecutionContext`: the identifiers a script run carries,
//! its append-only event/log sinks, and the slot the Tool Wrapper uses to
//! stash a fatal error before aborting the sandbox.

use crate::collaborators::{EventSink, LogSink};
use sandbox_classify::ClassifiedError;
use sandbox_types::{Event, HandlerRunId, ScriptRunId, TaskRunId, TaskType, WorkflowId};
use std::cell::RefCell;
use std::sync::Arc;

/// Identifiers and collaborators for one `evaluate` call.
///
/// Created by the caller before `evaluate`, read-only to the guest (only
/// reachable through bound tool closures, never exposed as a global
/// itself), and dropped with the run.
pub struct ExecutionContext {
    pub workflow_id: Option<WorkflowId>,
    pub script_run_id: Option<ScriptRunId>,
    pub handler_run_id: Option<HandlerRunId>,
    pub task_run_id: Option<TaskRunId>,
    pub task_type: Option<TaskType>,
    events: Arc<dyn EventSink>,
    logs: Arc<dyn LogSink>,
    classified_error: RefCell<Option<ClassifiedError>>,
}

impl ExecutionContext {
    /// Build a context with no identifiers set (task mode, effectively).
    #[must_use]
    pub fn new(events: Arc<dyn EventSink>, logs: Arc<dyn LogSink>) -> Self {
        Self {
            workflow_id: None,
            script_run_id: None,
            handler_run_id: None,
            task_run_id: None,
            task_type: None,
            events,
            logs,
            classified_error: RefCell::new(None),
        }
    }

    /// Attach a workflow identifier, enabling liveness checks upstream in
    /// the [`crate::ToolInvoker`].
    #[must_use]
    pub fn with_workflow_id(mut self, workflow_id: WorkflowId) -> Self {
        self.workflow_id = Some(workflow_id);
        self
    }

    /// Attach the remaining run identifiers, surfaced for event tagging.
    #[must_use]
    pub fn with_run_identifiers(
        mut self,
        script_run_id: Option<ScriptRunId>,
        task_run_id: Option<TaskRunId>,
        handler_run_id: Option<HandlerRunId>,
        task_type: Option<TaskType>,
    ) -> Self {
        self.script_run_id = script_run_id;
        self.task_run_id = task_run_id;
        self.handler_run_id = handler_run_id;
        self.task_type = task_type;
        self
    }

    /// Append a structured event to the current run's event log.
    pub async fn create_event(&self, ty: impl Into<String>, payload: serde_json::Value) {
        self.events.create_event(Event::new(ty, payload)).await;
    }

    /// Append a formatted log line.
    pub async fn on_log(&self, line: impl Into<String>) {
        self.logs.on_log(line.into()).await;
    }

    /// Stash a fatal error before the caller aborts the sandbox. The Tool
    /// Wrapper uses this when invalid input in workflow mode is fatal
    /// rather than merely thrown back to the guest.
    pub fn stash_error(&self, error: ClassifiedError) {
        *self.classified_error.borrow_mut() = Some(error);
    }

    /// Take the stashed error, if any, leaving the slot empty.
    #[must_use]
    pub fn take_classified_error(&self) -> Option<ClassifiedError> {
        self.classified_error.borrow_mut().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::test_support::{RecordingEventSink, RecordingLogSink};

    #[tokio::test]
    async fn create_event_reaches_the_sink() {
        let events = Arc::new(RecordingEventSink::default());
        let logs = Arc::new(RecordingLogSink::default());
        let ctx = ExecutionContext::new(events.clone(), logs);
        ctx.create_event("note.created", serde_json::json!({"id": 1})).await;
        assert_eq!(events.events().len(), 1);
        assert_eq!(events.events()[0].ty, "note.created");
    }

    #[test]
    fn stash_and_take_roundtrips() {
        let events = Arc::new(RecordingEventSink::default());
        let logs = Arc::new(RecordingLogSink::default());
        let ctx = ExecutionContext::new(events, logs);
        assert!(ctx.take_classified_error().is_none());
        ctx.stash_error(ClassifiedError::logic("bad input"));
        let err = ctx.take_classified_error().unwrap();
        assert_eq!(err.message(), "bad input");
        assert!(ctx.take_classified_error().is_none());
    }
}
