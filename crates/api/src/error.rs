//! Unified error handling with Sentry integration.
//!
//! Route-level failures use [`AppError`]; connector operations that come back
//! as an [`OperationResult`] are rendered by [`operation_response`], which
//! keeps per-item failures in the body and picks the status from the code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fluxori_connectors::ConnectorError;
use fluxori_core::{ErrorCode, Marketplace, OperationResult};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A connector rejected the request (connect, initialize, ...).
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// No connector registered for the organization and marketplace.
    #[error("No {marketplace} connector for organization {organization}")]
    NotConnected {
        organization: String,
        marketplace: Marketplace,
    },

    /// Caller did not present a valid API token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// HTTP status for a connector error code.
///
/// Marketplace auth failures are the marketplace rejecting stored
/// credentials, not the API caller, so they map to 502.
#[must_use]
pub const fn status_for_code(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound | ErrorCode::ProductNotFound | ErrorCode::OrderNotFound => {
            StatusCode::NOT_FOUND
        }
        ErrorCode::CircuitOpen | ErrorCode::LoadSheddingError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::NotInitialized | ErrorCode::ConnectorClosed => StatusCode::CONFLICT,
        ErrorCode::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::AuthError
        | ErrorCode::NetworkError
        | ErrorCode::UnknownError
        | ErrorCode::ProductFetchError
        | ErrorCode::OrderFetchError
        | ErrorCode::StockUpdateFailed
        | ErrorCode::PriceUpdateFailed
        | ErrorCode::OrderAcknowledgeFailed => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    /// The status this error responds with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Connector(err) => status_for_code(err.code()),
            Self::NotConnected { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn code(&self) -> &'static str {
        match self {
            Self::Connector(err) => err.code().as_str(),
            Self::NotConnected { .. } => "NOT_CONNECTED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                status = status.as_u16(),
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Connector(err) => err.to_string(),
            _ => self.to_string(),
        };

        (
            status,
            Json(json!({ "code": self.code(), "message": message })),
        )
            .into_response()
    }
}

/// Render an operation result: 200 for success and partial success, the
/// code's status for errors. The body is always the full result.
pub fn operation_response<T: Serialize>(result: &OperationResult<T>) -> Response {
    let status = result.code().map_or(StatusCode::OK, status_for_code);
    if status.is_server_error()
        && let OperationResult::Error { code, message, .. } = result
    {
        let event_id = sentry::capture_message(&format!("{code}: {message}"), sentry::Level::Error);
        tracing::error!(
            %code,
            %message,
            status = status.as_u16(),
            sentry_event_id = %event_id,
            "Connector operation failed"
        );
    }
    (status, Json(result)).into_response()
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
