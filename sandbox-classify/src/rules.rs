//! Deterministic classification rules: HTTP status, filesystem errno codes,
//! free-text heuristics, and provider-specific shapes.

use crate::ClassifiedError;

/// Classify an HTTP-shaped failure by status code.
#[must_use]
pub fn classify_http(status: u16, message: &str) -> ClassifiedError {
    match status {
        401 => ClassifiedError::Auth {
            message: message.to_string(),
            cause: None,
            source: None,
            service_id: None,
            account_id: None,
        },
        403 => ClassifiedError::Permission {
            message: message.to_string(),
            cause: None,
            source: None,
        },
        408 | 429 | 500..=599 => ClassifiedError::Network {
            message: message.to_string(),
            cause: None,
            source: None,
            status_code: Some(status),
        },
        _ => ClassifiedError::logic(message),
    }
}

/// Classify a filesystem failure by its errno-style code (`"EACCES"`, …).
#[must_use]
pub fn classify_fs(code: &str, message: &str) -> ClassifiedError {
    match code {
        "EACCES" | "EPERM" => ClassifiedError::Permission {
            message: message.to_string(),
            cause: None,
            source: None,
        },
        "ENOENT" | "ENOTDIR" | "EISDIR" => ClassifiedError::logic(message),
        "ECONNREFUSED" | "ETIMEDOUT" | "ECONNRESET" => ClassifiedError::Network {
            message: message.to_string(),
            cause: None,
            source: None,
            status_code: None,
        },
        _ => ClassifiedError::logic(message),
    }
}

const AUTH_KEYWORDS: &[&str] = &[
    "unauthorized",
    "oauth",
    "token expired",
    "invalid credentials",
];
const PERMISSION_KEYWORDS: &[&str] = &["forbidden", "access denied", "permission denied"];
const NETWORK_KEYWORDS: &[&str] = &[
    "timeout",
    "connection",
    "service unavailable",
    "gateway timeout",
    "econnrefused",
    "etimedout",
    "econnreset",
];

/// Classify a free-text error message via keyword heuristics.
#[must_use]
pub fn classify_generic(message: &str) -> ClassifiedError {
    let lower = message.to_lowercase();
    if AUTH_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return ClassifiedError::Auth {
            message: message.to_string(),
            cause: None,
            source: None,
            service_id: None,
            account_id: None,
        };
    }
    if PERMISSION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return ClassifiedError::Permission {
            message: message.to_string(),
            cause: None,
            source: None,
        };
    }
    if NETWORK_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return ClassifiedError::Network {
            message: message.to_string(),
            cause: None,
            source: None,
            status_code: None,
        };
    }
    ClassifiedError::logic(message)
}

/// The shape of a raw, not-yet-classified failure seen at a tool boundary.
///
/// Distinguishing these up front lets [`ensure_classified`] route to the
/// right rule set without guessing from string content alone.
#[derive(Debug, Clone)]
pub enum RawFailure {
    /// Already a [`ClassifiedError`] — pass through unchanged.
    Classified(ClassifiedError),
    /// An HTTP-shaped failure.
    Http { status: u16, message: String },
    /// A filesystem failure with an errno-style code.
    Fs { code: String, message: String },
    /// A Google-API-shaped provider failure. OAuth refresh failures are
    /// reported as HTTP 400 by Google, so substring detection must run
    /// *before* status-code dispatch.
    GoogleProvider { status: u16, message: String },
    /// A Notion-API-shaped provider failure, carrying its own error code.
    NotionProvider { code: String, status: u16, message: String },
    /// Nothing structured is known; fall back to free-text heuristics.
    Message(String),
}

const GOOGLE_OAUTH_FAILURE_SUBSTRINGS: &[&str] =
    &["invalid_grant", "token has been expired or revoked"];

/// Classify a provider-shaped failure (Google, Notion), falling back to
/// generic HTTP/text classification for unrecognised shapes.
#[must_use]
pub fn classify_provider(failure: &RawFailure) -> ClassifiedError {
    match failure {
        RawFailure::Classified(err) => err.clone(),
        RawFailure::Http { status, message } => classify_http(*status, message),
        RawFailure::Fs { code, message } => classify_fs(code, message),
        RawFailure::Message(message) => classify_generic(message),
        RawFailure::GoogleProvider { status, message } => {
            let lower = message.to_lowercase();
            if GOOGLE_OAUTH_FAILURE_SUBSTRINGS
                .iter()
                .any(|s| lower.contains(s))
            {
                ClassifiedError::Auth {
                    message: message.clone(),
                    cause: None,
                    source: None,
                    service_id: Some("google".to_string()),
                    account_id: None,
                }
            } else {
                classify_http(*status, message)
            }
        }
        RawFailure::NotionProvider {
            code,
            status,
            message,
        } => match code.as_str() {
            "unauthorized" | "invalid_token" => ClassifiedError::Auth {
                message: message.clone(),
                cause: None,
                source: None,
                service_id: Some("notion".to_string()),
                account_id: None,
            },
            "restricted_resource" => ClassifiedError::Permission {
                message: message.clone(),
                cause: None,
                source: None,
            },
            "object_not_found" | "validation_error" => ClassifiedError::logic(message),
            "rate_limited" => ClassifiedError::Network {
                message: message.clone(),
                cause: None,
                source: None,
                status_code: Some(429),
            },
            "internal_server_error" | "service_unavailable" | "database_connection_unavailable" => {
                ClassifiedError::Network {
                    message: message.clone(),
                    cause: None,
                    source: None,
                    status_code: Some(500),
                }
            }
            _ => {
                if *status != 0 {
                    classify_http(*status, message)
                } else {
                    ClassifiedError::internal(message.clone())
                }
            }
        },
    }
}

/// Ensure an arbitrary raw failure is classified, routing to the right rule
/// set by shape. Already-classified errors pass through unchanged.
#[must_use]
pub fn ensure_classified(failure: RawFailure, source: &str) -> ClassifiedError {
    classify_provider(&failure).with_source(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_statuses_classify_per_table() {
        assert!(matches!(classify_http(401, "x"), ClassifiedError::Auth { .. }));
        assert!(matches!(
            classify_http(403, "x"),
            ClassifiedError::Permission { .. }
        ));
        match classify_http(500, "x") {
            ClassifiedError::Network { status_code, .. } => assert_eq!(status_code, Some(500)),
            other => panic!("expected network, got {other:?}"),
        }
        assert!(matches!(classify_http(400, "x"), ClassifiedError::Logic { .. }));
    }

    #[test]
    fn fs_codes_classify_per_table() {
        assert!(matches!(
            classify_fs("EACCES", "x"),
            ClassifiedError::Permission { .. }
        ));
        assert!(matches!(classify_fs("ENOENT", "x"), ClassifiedError::Logic { .. }));
        assert!(matches!(
            classify_fs("ECONNREFUSED", "x"),
            ClassifiedError::Network { .. }
        ));
    }

    #[test]
    fn google_oauth_failure_is_auth_despite_400_status() {
        let failure = RawFailure::GoogleProvider {
            status: 400,
            message: "invalid_grant: token has been expired or revoked".to_string(),
        };
        assert!(matches!(classify_provider(&failure), ClassifiedError::Auth { .. }));
    }

    #[test]
    fn notion_rate_limited_is_network_429() {
        let failure = RawFailure::NotionProvider {
            code: "rate_limited".to_string(),
            status: 429,
            message: "slow down".to_string(),
        };
        match classify_provider(&failure) {
            ClassifiedError::Network { status_code, .. } => assert_eq!(status_code, Some(429)),
            other => panic!("expected network, got {other:?}"),
        }
    }

    #[test]
    fn ensure_classified_tags_the_source() {
        let err = ensure_classified(RawFailure::Message("forbidden".to_string()), "Gmail.send");
        assert!(matches!(err, ClassifiedError::Permission { .. }));
        assert_eq!(format!("{err}"), "[permission] Gmail.send: forbidden");
    }
}
