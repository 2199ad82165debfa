//! Connector error type and HTTP status classification.

use std::time::Duration;

use fluxori_core::ErrorCode;
use thiserror::Error;

/// Default wait when a 429 response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Errors that can occur when talking to a marketplace.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectorError {
    /// Input or credentials rejected before or by the marketplace.
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation was attempted before `initialize` succeeded.
    #[error("connector not initialized")]
    NotInitialized,

    /// The connector was closed.
    #[error("connector closed")]
    Closed,

    /// Failing fast after repeated failures.
    #[error("circuit open, retry in {}s", .retry_in.as_secs())]
    CircuitOpen { retry_in: Duration },

    /// Marketplace rejected the credentials.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Rate limited by the marketplace.
    #[error("rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    /// Connection could not be established or was dropped.
    #[error("network error: {0}")]
    Network(String),

    /// Request or attempt timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Failure pattern suggests a scheduled power outage upstream.
    #[error("possible load shedding: {0}")]
    LoadShedding(String),

    /// Any other non-success response.
    #[error("marketplace API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Operation not offered by this marketplace.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl ConnectorError {
    /// The error code reported to callers.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) | Self::Unsupported(_) => ErrorCode::ValidationError,
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::Closed => ErrorCode::ConnectorClosed,
            Self::CircuitOpen { .. } => ErrorCode::CircuitOpen,
            Self::Auth(_) => ErrorCode::AuthError,
            Self::RateLimited { .. } => ErrorCode::RateLimitExceeded,
            Self::Network(_) => ErrorCode::NetworkError,
            Self::Timeout(_) => ErrorCode::TimeoutError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::LoadShedding(_) => ErrorCode::LoadSheddingError,
            Self::Api { .. } | Self::Parse(_) => ErrorCode::UnknownError,
        }
    }

    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. }
            | Self::Network(_)
            | Self::Timeout(_)
            | Self::LoadShedding(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure happened below HTTP (no response received).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_) | Self::LoadShedding(_))
    }

    /// Classify a non-success HTTP response.
    ///
    /// `retry_after` is the parsed `Retry-After` header, if present.
    #[must_use]
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        let message = summarize_body(body);
        match status {
            401 | 403 => Self::Auth(message),
            404 => Self::NotFound(message),
            408 | 504 => Self::Timeout(format!("HTTP {status}")),
            429 => Self::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            400 | 422 => Self::Validation(message),
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_decode() {
            Self::Parse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

/// Trim an error body down to something loggable.
fn summarize_body(body: &str) -> String {
    const MAX_LEN: usize = 200;

    let body = body.trim();
    if body.is_empty() {
        return "no response body".to_string();
    }
    // Prefer a `message` field when the marketplace returns JSON errors.
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .get("message")
            .or_else(|| value.get("error").and_then(|e| e.get("message")))
            .or_else(|| value.get("error"))
            .and_then(serde_json::Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }
    body.chars().take(MAX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ConnectorError::from_status(401, "", None),
            ConnectorError::Auth(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(403, "", None),
            ConnectorError::Auth(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(404, "", None),
            ConnectorError::NotFound(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(504, "", None),
            ConnectorError::Timeout(_)
        ));
        assert!(matches!(
            ConnectorError::from_status(422, "", None),
            ConnectorError::Validation(_)
        ));
        assert_eq!(
            ConnectorError::from_status(503, "down", None),
            ConnectorError::Api {
                status: 503,
                message: "down".to_string()
            }
        );
    }

    #[test]
    fn test_rate_limit_default_retry_after() {
        assert_eq!(
            ConnectorError::from_status(429, "", None),
            ConnectorError::RateLimited { retry_after: 60 }
        );
        assert_eq!(
            ConnectorError::from_status(429, "", Some(7)),
            ConnectorError::RateLimited { retry_after: 7 }
        );
    }

    #[test]
    fn test_retryable() {
        assert!(ConnectorError::Network("reset".into()).is_retryable());
        assert!(ConnectorError::RateLimited { retry_after: 1 }.is_retryable());
        assert!(
            ConnectorError::Api {
                status: 502,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !ConnectorError::Api {
                status: 409,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!ConnectorError::Auth("bad key".into()).is_retryable());
        assert!(!ConnectorError::NotFound("x".into()).is_retryable());
        assert!(!ConnectorError::Validation("x".into()).is_retryable());
    }

    #[test]
    fn test_codes() {
        assert_eq!(ConnectorError::Closed.code(), ErrorCode::ConnectorClosed);
        assert_eq!(
            ConnectorError::CircuitOpen {
                retry_in: Duration::from_secs(5)
            }
            .code(),
            ErrorCode::CircuitOpen
        );
        assert_eq!(
            ConnectorError::Unsupported("ack".into()).code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            ConnectorError::LoadShedding("x".into()).code(),
            ErrorCode::LoadSheddingError
        );
    }

    #[test]
    fn test_body_summary_prefers_json_message() {
        let error = ConnectorError::from_status(400, r#"{"message":"bad sku"}"#, None);
        assert_eq!(error, ConnectorError::Validation("bad sku".to_string()));

        let error = ConnectorError::from_status(
            400,
            r#"{"error":{"code":"x","message":"quantity too large"}}"#,
            None,
        );
        assert_eq!(error, ConnectorError::Validation("quantity too large".to_string()));

        let error = ConnectorError::from_status(500, "", None);
        assert_eq!(
            error.to_string(),
            "marketplace API error (500): no response body"
        );
    }
}
