//! Run-scoped identifiers.
//!
//! These wrap a plain `String` so the four identifiers an [`ExecutionContext`]
//! carries cannot be transposed at a call site by accident — passing a
//! `TaskRunId` where a `ScriptRunId` is expected is a type error, not a
//! silent bug.
//!
//! [`ExecutionContext`]: sandbox_core equivalent — not defined in this crate.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! run_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn new_v4() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

run_id!(WorkflowId, "Identifies a long-running workflow instance.");
run_id!(ScriptRunId, "Identifies a single `evaluate` call within a run.");
run_id!(TaskRunId, "Identifies a scheduled task's execution.");
run_id!(HandlerRunId, "Identifies a single handler invocation within a task run.");

/// The kind of task a script run was invoked on behalf of.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Plans future work; read-mostly.
    Planner,
    /// Performs upkeep/repair actions.
    Maintainer,
    /// Executes a single unit of assigned work.
    Worker,
    /// Drives a multi-step workflow handler.
    Workflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let w = WorkflowId::from("w-1");
        let s = ScriptRunId::from("w-1");
        assert_eq!(w.as_str(), s.as_str());
        // Compile-time distinctness is the point; this just checks Display/From.
        assert_eq!(w.to_string(), "w-1");
    }

    #[test]
    fn task_type_renders_snake_case() {
        let json = serde_json::to_string(&TaskType::Workflow).unwrap();
        assert_eq!(json, "\"workflow\"");
    }
}
