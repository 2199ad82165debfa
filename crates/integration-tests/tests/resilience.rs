//! Lifecycle, retry and circuit breaker behavior through the public
//! connector API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use fluxori_connectors::testing::MockTransport;
use fluxori_connectors::{ConnectorError, ConnectorFactory, HttpResponse};
use fluxori_core::{
    ConnectorCredentials, ConnectorState, ErrorCode, Marketplace, OperationResult,
    OrganizationId, PaginationOptions,
};
use fluxori_integration_tests::{fast_settings, registry, wantitall_credentials, ORG};
use reqwest::Method;
use serde_json::json;
use tokio::time::Instant;

const PRODUCTS: &str = "/sellers/S-100/products";

fn empty_products() -> serde_json::Value {
    json!({ "data": [], "meta": { "total": 0 } })
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_missing_seller_id_rejected_without_network() {
    let transport = Arc::new(MockTransport::new());
    let registry = registry(&transport, fast_settings());

    let credentials = ConnectorCredentials::new(OrganizationId::new(ORG), Marketplace::Wantitall)
        .with_api_key("wa-1a2b3c4d5e6f");
    let error = registry.connect(credentials).await.err().unwrap();

    assert!(matches!(error, ConnectorError::Validation(_)));
    assert!(error.to_string().contains("sellerId"));
    assert_eq!(transport.request_count(), 0);
    assert!(
        registry
            .get(&OrganizationId::new(ORG), Marketplace::Wantitall)
            .await
            .is_none()
    );
}

#[tokio::test(start_paused = true)]
async fn test_operations_before_initialize_report_not_initialized() {
    let transport = Arc::new(MockTransport::new());
    let factory = ConnectorFactory::new(fast_settings(), transport.clone());
    let connector = factory.create(Marketplace::Wantitall).unwrap();

    let result = connector.get_products(PaginationOptions::default()).await;
    assert_eq!(result.code(), Some(ErrorCode::NotInitialized));

    let status = connector.test_connection().await;
    assert!(!status.connected);
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_closed_connector_rejects_operations() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(Method::GET, PRODUCTS, 200, &empty_products());
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    assert!(
        connector
            .get_products(PaginationOptions::default())
            .await
            .is_success()
    );
    assert!(
        registry
            .disconnect(&OrganizationId::new(ORG), Marketplace::Wantitall)
            .await
    );

    assert_eq!(connector.state().await, ConnectorState::Closed);
    let result = connector.get_products(PaginationOptions::default()).await;
    assert_eq!(result.code(), Some(ErrorCode::ConnectorClosed));
    assert!(matches!(
        connector.initialize(wantitall_credentials()).await,
        Err(ConnectorError::Closed)
    ));
}

// =============================================================================
// Connection tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_connection_failure_is_reported_not_raised() {
    let transport = Arc::new(MockTransport::new());
    transport.fail(
        Method::GET,
        "/sellers/S-100",
        ConnectorError::Network("connection refused".to_string()),
    );
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    let status = connector.test_connection().await;

    assert!(!status.connected);
    assert!(status.latency_ms.is_none());
    assert!(status.message.contains("connection refused"));
    // Health probes are never retried.
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connection_success_reports_latency() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(Method::GET, "/sellers/S-100", 200, &json!({ "data": { "id": "S-100" } }));
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    let status = connector.test_connection().await;

    assert!(status.connected);
    assert!(status.latency_ms.is_some());
    let sent = transport.requests();
    assert_eq!(
        sent[0].header_value("Authorization"),
        Some("Bearer wa-1a2b3c4d5e6f")
    );
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_server_errors_retried_then_reported() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(Method::GET, PRODUCTS, HttpResponse::new(503, "maintenance"));
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    let result = connector.get_products(PaginationOptions::default()).await;

    assert_eq!(result.code(), Some(ErrorCode::ProductFetchError));
    // One attempt plus one retry.
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_recovers_on_retry() {
    let transport = Arc::new(MockTransport::new());
    transport
        .respond(Method::GET, PRODUCTS, HttpResponse::new(502, "bad gateway"))
        .respond_json(Method::GET, PRODUCTS, 200, &empty_products());
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    let result = connector.get_products(PaginationOptions::default()).await;

    assert!(result.is_success());
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_waits_for_retry_after() {
    let transport = Arc::new(MockTransport::new());
    transport
        .respond(
            Method::GET,
            PRODUCTS,
            HttpResponse::new(429, "slow down").with_header("Retry-After", "2"),
        )
        .respond_json(Method::GET, PRODUCTS, 200, &empty_products());
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    let started = Instant::now();
    let result = connector.get_products(PaginationOptions::default()).await;

    assert!(result.is_success());
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_auth_errors_not_retried_and_keep_circuit_closed() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::GET,
        PRODUCTS,
        401,
        &json!({ "message": "invalid api key" }),
    );
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    for _ in 0..5 {
        let result = connector.get_products(PaginationOptions::default()).await;
        assert_eq!(result.code(), Some(ErrorCode::ProductFetchError));
        let message = error_message(&result);
        assert!(message.starts_with("AUTH_ERROR"));
        assert!(message.contains("invalid api key"));
    }

    assert_eq!(transport.request_count(), 5);
    assert_eq!(connector.state().await, ConnectorState::Ready);
}

// =============================================================================
// Circuit breaker
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_circuit_opens_then_recovers_after_cooldown() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(Method::GET, PRODUCTS, HttpResponse::new(503, "maintenance"));
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    for _ in 0..3 {
        let result = connector.get_products(PaginationOptions::default()).await;
        assert_eq!(result.code(), Some(ErrorCode::ProductFetchError));
    }
    assert_eq!(connector.state().await, ConnectorState::Degraded);
    let sent = transport.request_count();

    let result = connector.get_products(PaginationOptions::default()).await;
    assert_eq!(result.code(), Some(ErrorCode::CircuitOpen));
    assert_eq!(transport.request_count(), sent, "open circuit must not send");

    tokio::time::advance(Duration::from_secs(31)).await;
    transport.clear_routes();
    transport.respond_json(Method::GET, PRODUCTS, 200, &empty_products());

    let result = connector.get_products(PaginationOptions::default()).await;
    assert!(result.is_success());
    assert_eq!(connector.state().await, ConnectorState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_reopens_circuit() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(Method::GET, PRODUCTS, HttpResponse::new(500, "boom"));
    let registry = registry(&transport, fast_settings());
    let connector = registry.connect(wantitall_credentials()).await.unwrap();

    for _ in 0..3 {
        let _ = connector.get_products(PaginationOptions::default()).await;
    }
    tokio::time::advance(Duration::from_secs(31)).await;

    let probe = connector.get_products(PaginationOptions::default()).await;
    assert_eq!(probe.code(), Some(ErrorCode::ProductFetchError));

    let result = connector.get_products(PaginationOptions::default()).await;
    assert_eq!(result.code(), Some(ErrorCode::CircuitOpen));
    assert_eq!(connector.state().await, ConnectorState::Degraded);
}

fn error_message<T>(result: &OperationResult<T>) -> &str {
    match result {
        OperationResult::Error { message, .. } => message,
        _ => panic!("expected an error result"),
    }
}
