//! HTTP surface: routing, authentication and error mapping.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use fluxori_connectors::HttpResponse;
use fluxori_connectors::testing::MockTransport;
use fluxori_integration_tests::{API_TOKEN, ORG, api, wantitall_credentials};
use reqwest::Method;
use serde_json::{Value, json};
use tower::ServiceExt;

const BASE: &str = "/organizations/org-test/connectors";

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {API_TOKEN}"))
}

fn get(uri: &str) -> Request<Body> {
    authed("GET", uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    authed("POST", uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn wantitall_body() -> Value {
    json!({
        "organizationId": ORG,
        "marketplace": "wantitall",
        "apiKey": "wa-1a2b3c4d5e6f",
        "sellerId": "S-100"
    })
}

async fn connected_router(transport: &Arc<MockTransport>) -> Router {
    let (router, state) = api(transport);
    state
        .registry()
        .connect(wantitall_credentials())
        .await
        .unwrap();
    router
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_needs_no_token() {
    let (router, _) = api(&Arc::new(MockTransport::new()));

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));

    let request = Request::builder()
        .uri("/health/ready")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_health_connectors_lists_registered() {
    let transport = Arc::new(MockTransport::new());
    let router = connected_router(&transport).await;

    let request = Request::builder()
        .uri("/health/connectors")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["organizationId"], ORG);
    assert_eq!(body[0]["marketplace"], "wantitall");
    assert_eq!(body[0]["state"], "ready");
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_connector_routes_require_token() {
    let (router, _) = api(&Arc::new(MockTransport::new()));

    let request = Request::builder().uri(BASE).body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let request = Request::builder()
        .uri(BASE)
        .header(header::AUTHORIZATION, "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_connect_then_list() {
    let (router, _) = api(&Arc::new(MockTransport::new()));

    let (status, body) = send(&router, post_json(BASE, &wantitall_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["marketplace"], "wantitall");
    assert_eq!(body["state"], "ready");

    let (status, body) = send(&router, get(BASE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marketplaces"], json!(["wantitall"]));
}

#[tokio::test]
async fn test_connect_rejects_mismatched_organization() {
    let (router, _) = api(&Arc::new(MockTransport::new()));

    let mut body = wantitall_body();
    body["organizationId"] = json!("someone-else");
    let (status, body) = send(&router, post_json(BASE, &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_connect_with_missing_credentials_is_validation_error() {
    let transport = Arc::new(MockTransport::new());
    let (router, _) = api(&transport);

    let mut body = wantitall_body();
    body.as_object_mut().unwrap().remove("sellerId");
    let (status, body) = send(&router, post_json(BASE, &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("sellerId"));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_connect_unsupported_marketplace() {
    let (router, _) = api(&Arc::new(MockTransport::new()));

    let body = json!({ "organizationId": ORG, "marketplace": "shopify", "apiKey": "k" });
    let (status, body) = send(&router, post_json(BASE, &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Shopify"));
}

#[tokio::test]
async fn test_disconnect() {
    let transport = Arc::new(MockTransport::new());
    let router = connected_router(&transport).await;
    let uri = format!("{BASE}/wantitall");

    let request = authed("DELETE", &uri).body(Body::empty()).unwrap();
    assert_eq!(send(&router, request).await.0, StatusCode::NO_CONTENT);

    let request = authed("DELETE", &uri).body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_CONNECTED");
}

// =============================================================================
// Operations
// =============================================================================

#[tokio::test]
async fn test_products_through_router() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::GET,
        "/sellers/S-100/products",
        200,
        &json!({
            "data": [{
                "id": "p-1",
                "sku": "WA-1",
                "name": "Braai Tongs",
                "price": "149.90",
                "quantity": 8,
                "status": "active"
            }],
            "meta": { "total": 1 }
        }),
    );
    let router = connected_router(&transport).await;

    let (status, body) = send(&router, get(&format!("{BASE}/wantitall/products?page_size=10"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["items"][0]["sku"], "WA-1");
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(transport.requests()[0].query_value("limit"), Some("10"));
}

#[tokio::test]
async fn test_unconnected_marketplace_is_not_found() {
    let (router, _) = api(&Arc::new(MockTransport::new()));

    let (status, body) = send(&router, get(&format!("{BASE}/takealot/products"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_CONNECTED");
}

#[tokio::test]
async fn test_unknown_marketplace_is_bad_request() {
    let (router, _) = api(&Arc::new(MockTransport::new()));

    let (status, body) = send(&router, get(&format!("{BASE}/ebay/products"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("ebay"));
}

#[tokio::test]
async fn test_partial_batch_returns_ok_with_failures() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::POST,
        "/inventory/batch",
        200,
        &json!({
            "results": [
                { "sku": "WA-1", "success": true },
                { "sku": "WA-2", "success": false, "error": { "code": "SKU_NOT_FOUND" } }
            ]
        }),
    );
    let router = connected_router(&transport).await;

    let updates = json!([
        { "sku": "WA-1", "quantity": 3 },
        { "sku": "WA-2", "quantity": 1 }
    ]);
    let (status, body) = send(&router, post_json(&format!("{BASE}/wantitall/stock"), &updates)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "partial_success");
    assert_eq!(body["failedItems"][0]["itemId"], "WA-2");
    assert_eq!(body["failedItems"][0]["code"], "NOT_FOUND");
}

#[tokio::test(start_paused = true)]
async fn test_open_circuit_is_service_unavailable() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        Method::GET,
        "/sellers/S-100/products",
        HttpResponse::new(503, "maintenance"),
    );
    let router = connected_router(&transport).await;
    let uri = format!("{BASE}/wantitall/products");

    for _ in 0..3 {
        let (status, body) = send(&router, get(&uri)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "PRODUCT_FETCH_ERROR");
    }

    let (status, body) = send(&router, get(&uri)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "CIRCUIT_OPEN");
}

#[tokio::test]
async fn test_product_not_found_maps_to_404() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::GET,
        "/sellers/S-100/products/NOPE",
        404,
        &json!({ "message": "no such product" }),
    );
    let router = connected_router(&transport).await;

    let (status, body) = send(&router, get(&format!("{BASE}/wantitall/products/NOPE"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");
}
