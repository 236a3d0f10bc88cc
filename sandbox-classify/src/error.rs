//! The closed `ClassifiedError` taxonomy and its routing policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a caller should do with a given [`ClassifiedError`].
///
/// Returned as data by [`ClassifiedError::routing`] rather than encoded as
/// prose, mirroring `neuron-types::error`'s `is_retryable()` convention —
/// routing decisions are something a scheduler consults programmatically,
/// not something a human reads off a doc comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorRouting {
    /// Stop and show the error to the user (connection likely needs
    /// re-authorisation).
    SurfaceToUser,
    /// Retry with exponential backoff.
    RetryWithBackoff,
    /// Hand off to the agent-driven repair/maintenance path.
    RepairPath,
    /// A programmer bug; do not retry, report it.
    NonRetryableBug,
    /// Not a failure — abort the run cleanly.
    AbortCleanly,
}

/// The closed sum type of script/tool failures.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifiedError {
    /// Credentials are invalid or expired.
    #[error("{}", format_message("auth", message, source))]
    Auth {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        service_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        account_id: Option<String>,
    },
    /// The caller lacks permission for the operation.
    #[error("{}", format_message("permission", message, source))]
    Permission {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// A transient network/infrastructure failure.
    #[error("{}", format_message("network", message, source))]
    Network {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
    },
    /// A bug in the script/handler logic (bad input, phase violation, ...).
    #[error("{}", format_message("logic", message, source))]
    Logic {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// A bug in the engine itself; never retry.
    #[error("{}", format_message("internal", message, source))]
    Internal {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// Not an error: the owning workflow is no longer active.
    #[error("workflow paused: {message}")]
    WorkflowPaused { message: String },
}

fn format_message(kind: &str, message: &str, source: &Option<String>) -> String {
    match source {
        Some(source) => format!("[{kind}] {source}: {message}"),
        None => format!("[{kind}] {message}"),
    }
}

impl ClassifiedError {
    /// The routing policy for this error kind.
    #[must_use]
    pub fn routing(&self) -> ErrorRouting {
        match self {
            Self::Auth { .. } | Self::Permission { .. } => ErrorRouting::SurfaceToUser,
            Self::Network { .. } => ErrorRouting::RetryWithBackoff,
            Self::Logic { .. } => ErrorRouting::RepairPath,
            Self::Internal { .. } => ErrorRouting::NonRetryableBug,
            Self::WorkflowPaused { .. } => ErrorRouting::AbortCleanly,
        }
    }

    /// Build a `logic` error.
    #[must_use]
    pub fn logic(message: impl Into<String>) -> Self {
        Self::Logic {
            message: message.into(),
            cause: None,
            source: None,
        }
    }

    /// Build an `internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            cause: None,
            source: None,
        }
    }

    /// Set (or overwrite) the `source` field.
    #[must_use]
    pub fn with_source(mut self, new_source: impl Into<String>) -> Self {
        let new_source = new_source.into();
        match &mut self {
            Self::Auth { source, .. }
            | Self::Permission { source, .. }
            | Self::Network { source, .. }
            | Self::Logic { source, .. }
            | Self::Internal { source, .. } => {
                if source.is_none() {
                    *source = Some(new_source);
                }
            }
            Self::WorkflowPaused { .. } => {}
        }
        self
    }

    /// Prefix the message, used by the Tool Wrapper when re-wrapping an
    /// error thrown through a tool call (`"Failed at Namespace.Name: "`).
    #[must_use]
    pub fn with_message_prefix(mut self, prefix: impl fmt::Display) -> Self {
        let prefix = prefix.to_string();
        match &mut self {
            Self::Auth { message, .. }
            | Self::Permission { message, .. }
            | Self::Network { message, .. }
            | Self::Logic { message, .. }
            | Self::Internal { message, .. } => {
                *message = format!("{prefix}{message}");
            }
            Self::WorkflowPaused { .. } => {}
        }
        self
    }

    /// The plain message, without kind/source formatting.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Auth { message, .. }
            | Self::Permission { message, .. }
            | Self::Network { message, .. }
            | Self::Logic { message, .. }
            | Self::Internal { message, .. }
            | Self::WorkflowPaused { message } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_matches_the_policy_table() {
        assert_eq!(
            ClassifiedError::logic("x").routing(),
            ErrorRouting::RepairPath
        );
        assert_eq!(
            ClassifiedError::internal("x").routing(),
            ErrorRouting::NonRetryableBug
        );
        assert_eq!(
            ClassifiedError::WorkflowPaused {
                message: "x".into()
            }
            .routing(),
            ErrorRouting::AbortCleanly
        );
    }

    #[test]
    fn with_source_does_not_overwrite_existing() {
        let err = ClassifiedError::logic("x").with_source("A.b").with_source("C.d");
        assert_eq!(
            format!("{err}"),
            "[logic] A.b: x"
        );
    }

    #[test]
    fn with_message_prefix_prepends() {
        let err = ClassifiedError::logic("bad input").with_message_prefix("Failed at A.b: ");
        assert_eq!(err.message(), "Failed at A.b: bad input");
    }
}
