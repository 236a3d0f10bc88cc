//! External collaborators the core depends on but never implements:
//! workflow liveness, connection credentials, and the append-only
//! event/log sinks. Object-safe `async_trait`s, the same shape as
//! `layer0::StateStore`/`SessionStorage` — the core holds `Arc<dyn Trait>`
//! of these, never a concrete database.

use async_trait::async_trait;
use sandbox_classify::ClassifiedError;
use sandbox_types::{Event, WorkflowId};

/// The liveness status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    Active,
    Paused,
    Stopped,
}

/// Reports whether a workflow instance is still live. Consulted once per
/// tool call when a `workflow_id` is bound.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// `Ok(None)` means the workflow is untracked (treated as active —
    /// not every caller registers a workflow up front).
    async fn get(&self, workflow_id: &WorkflowId) -> Result<Option<WorkflowStatus>, ClassifiedError>;
}

/// A provider connection's OAuth credentials.
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// A single connection to an external service.
#[derive(Debug, Clone)]
pub struct Connection {
    pub service: String,
    pub account_id: String,
}

/// Provider-connection lookups and error reporting. Tool implementations
/// (out of scope here) are the primary caller; the core only needs the
/// shape so it can be generic over it.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn get_credentials(
        &self,
        service: &str,
        account_id: &str,
    ) -> Result<OAuthCredentials, ClassifiedError>;

    async fn list_connections_by_service(&self, service: &str) -> Result<Vec<Connection>, ClassifiedError>;

    async fn mark_error(&self, service: &str, account_id: &str, message: &str) -> Result<(), ClassifiedError>;
}

/// Append-only event sink. Must tolerate high call rates; failures are not
/// propagated back to the guest (an event is best-effort telemetry, not a
/// guaranteed-delivery side channel).
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn create_event(&self, event: Event);
}

/// Append-only log sink.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn on_log(&self, line: String);
}

/// Small hand-written in-memory fakes for tests, mirroring
/// `layer0::test_utils::in_memory_store` rather than reaching for a
/// mocking crate.
pub mod test_support {
    use super::{Connection, ConnectionManager, EventSink, LogSink, OAuthCredentials, WorkflowStatus, WorkflowStore};
    use async_trait::async_trait;
    use sandbox_classify::ClassifiedError;
    use sandbox_types::{Event, WorkflowId};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// A workflow store backed by a fixed in-memory map.
    #[derive(Default)]
    pub struct InMemoryWorkflowStore {
        statuses: HashMap<String, WorkflowStatus>,
    }

    impl InMemoryWorkflowStore {
        #[must_use]
        pub fn with_status(workflow_id: impl Into<String>, status: WorkflowStatus) -> Self {
            let mut statuses = HashMap::new();
            statuses.insert(workflow_id.into(), status);
            Self { statuses }
        }
    }

    #[async_trait]
    impl WorkflowStore for InMemoryWorkflowStore {
        async fn get(&self, workflow_id: &WorkflowId) -> Result<Option<WorkflowStatus>, ClassifiedError> {
            Ok(self.statuses.get(workflow_id.as_str()).copied())
        }
    }

    /// An event sink that records every event it receives, for assertions.
    #[derive(Default)]
    pub struct RecordingEventSink {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventSink for RecordingEventSink {
        async fn create_event(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RecordingEventSink {
        #[must_use]
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    /// A log sink that records every line it receives.
    #[derive(Default)]
    pub struct RecordingLogSink {
        lines: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LogSink for RecordingLogSink {
        async fn on_log(&self, line: String) {
            self.lines.lock().unwrap().push(line);
        }
    }

    impl RecordingLogSink {
        #[must_use]
        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }
    }

    /// A connection manager that always fails; most tool-wrapper tests
    /// never touch it, so this exists only to satisfy the trait bound.
    pub struct NoConnections;

    #[async_trait]
    impl ConnectionManager for NoConnections {
        async fn get_credentials(&self, _service: &str, _account_id: &str) -> Result<OAuthCredentials, ClassifiedError> {
            Err(ClassifiedError::internal("no connections configured"))
        }

        async fn list_connections_by_service(&self, _service: &str) -> Result<Vec<Connection>, ClassifiedError> {
            Ok(Vec::new())
        }

        async fn mark_error(&self, _service: &str, _account_id: &str, _message: &str) -> Result<(), ClassifiedError> {
            Ok(())
        }
    }
}
