//! The result shape returned by a single [`evaluate`] call.
//!
//! [`evaluate`]: sandbox_engine's `Sandbox::evaluate`, not defined here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The outcome of one `evaluate` call.
///
/// `Ok` carries the script's return value plus an optional opaque `state`
/// the guest may hand back alongside it when the host injected a `state`
/// global for this step. `Err` carries a formatted message — classification
/// into [`sandbox_classify::ClassifiedError`] happens at the tool-wrapper
/// boundary, not here; a bare script failure (a syntax error, an uncaught
/// guest exception with no tool involved) is not a classified error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ok", rename_all = "snake_case")]
pub enum EvalResult {
    /// The script completed and returned a value.
    Ok {
        /// The script's return value.
        result: Value,
        /// Opaque state handed back alongside the result, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        state: Option<Value>,
    },
    /// The script threw, the deadline passed, or it was aborted.
    Err {
        /// A formatted description of the failure.
        error_message: String,
    },
}

impl EvalResult {
    /// Build a successful result with no carried state.
    #[must_use]
    pub fn ok(result: Value) -> Self {
        Self::Ok { result, state: None }
    }

    /// Build a successful result carrying opaque state.
    #[must_use]
    pub fn ok_with_state(result: Value, state: Value) -> Self {
        Self::Ok {
            result,
            state: Some(state),
        }
    }

    /// Build a failed result from a message.
    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self::Err {
            error_message: message.into(),
        }
    }

    /// True if this is the `Ok` variant.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// An opaque event appended to a run's event log by a tool body.
///
/// The core does not define a schema for `payload` beyond it being JSON —
/// that is left to individual tool implementations (out of scope here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// The event's type tag, e.g. `"email.sent"`.
    #[serde(rename = "type")]
    pub ty: String,
    /// Arbitrary JSON payload.
    pub payload: Value,
}

impl Event {
    /// Construct a new event.
    pub fn new(ty: impl Into<String>, payload: Value) -> Self {
        Self {
            ty: ty.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_without_state_omits_the_field() {
        let r = EvalResult::ok(json!(5));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["ok"], "ok");
        assert!(v.get("state").is_none());
    }

    #[test]
    fn err_carries_message() {
        let r = EvalResult::err("boom");
        assert!(!r.is_ok());
    }
}
