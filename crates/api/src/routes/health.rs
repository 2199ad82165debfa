//! Health endpoints.

use axum::{Json, extract::State, http::StatusCode};
use fluxori_connectors::ConnectorSummary;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// The service has no backing store; once the router is serving it is
/// ready. Marketplace reachability is reported per connector instead.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// Lifecycle snapshot of every registered connector.
pub async fn connectors(State(state): State<AppState>) -> Json<Vec<ConnectorSummary>> {
    Json(state.registry().statuses().await)
}
