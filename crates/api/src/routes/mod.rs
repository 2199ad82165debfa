//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                     - Liveness
//! GET    /health/ready                               - Readiness
//! GET    /health/connectors                          - Connector lifecycle snapshot
//!
//! # Connectors (Bearer API_TOKEN required)
//! POST   /organizations/{org}/connectors             - Connect (credentials JSON)
//! GET    /organizations/{org}/connectors             - List connected marketplaces
//! DELETE /organizations/{org}/connectors/{mp}        - Disconnect
//! GET    /organizations/{org}/connectors/{mp}/status - Test connection
//! GET    /organizations/{org}/connectors/{mp}/network
//! POST   /organizations/{org}/connectors/{mp}/refresh
//! GET    /organizations/{org}/connectors/{mp}/products[/{sku}]
//! GET    /organizations/{org}/connectors/{mp}/orders[/{id}]
//! POST   /organizations/{org}/connectors/{mp}/orders/{id}/acknowledge
//! POST   /organizations/{org}/connectors/{mp}/stock
//! POST   /organizations/{org}/connectors/{mp}/prices
//! ```

pub mod connectors;
pub mod health;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::require_api_token;
use crate::state::AppState;

/// Health routes (no authentication).
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/health/connectors", get(health::connectors))
}

/// Connector routes behind the bearer token check.
pub fn connector_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org}/connectors",
            get(connectors::list).post(connectors::connect),
        )
        .route(
            "/organizations/{org}/connectors/{mp}",
            axum::routing::delete(connectors::disconnect),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/status",
            get(connectors::status),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/network",
            get(connectors::network),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/refresh",
            post(connectors::refresh),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/products",
            get(connectors::products),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/products/{sku}",
            get(connectors::product),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/orders",
            get(connectors::orders),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/orders/{id}",
            get(connectors::order),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/orders/{id}/acknowledge",
            post(connectors::acknowledge),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/stock",
            post(connectors::update_stock),
        )
        .route(
            "/organizations/{org}/connectors/{mp}/prices",
            post(connectors::update_prices),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_token,
        ))
}
