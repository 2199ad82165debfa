//! End-to-end marketplace mappings: request shapes out, common schema in.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use fluxori_connectors::testing::MockTransport;
use fluxori_connectors::{Connector, HttpResponse};
use fluxori_core::{
    ErrorCode, OrderId, OrderStatus, PaginationOptions, Price, PriceUpdate, ProductStatus,
    StockUpdate,
};
use fluxori_integration_tests::{
    fast_settings, registry, takealot_credentials, wantitall_credentials,
    woocommerce_credentials,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::json;

async fn connect(
    transport: &Arc<MockTransport>,
    credentials: fluxori_core::ConnectorCredentials,
) -> Arc<dyn Connector> {
    registry(transport, fast_settings())
        .connect(credentials)
        .await
        .unwrap()
}

fn rands(amount: i64) -> Decimal {
    Decimal::from(amount)
}

// =============================================================================
// Takealot
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_takealot_offers_map_to_products() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::GET,
        "/v2/offers",
        200,
        &json!({
            "offers": [{
                "offer_id": 101,
                "sku": "TK-1",
                "title": "Kettle",
                "selling_price": 499,
                "rrp": 599,
                "leadtime_stock": [
                    { "quantity_available": 3 },
                    { "quantity_available": 2 }
                ],
                "status": "Buyable"
            }],
            "total_results": 1
        }),
    );
    let connector = connect(&transport, takealot_credentials()).await;

    let result = connector.get_products(PaginationOptions::default()).await;

    let page = result.into_data().unwrap();
    assert_eq!(page.total, Some(1));
    assert!(!page.has_more);
    let product = &page.items[0];
    assert_eq!(product.id, "101");
    assert_eq!(product.sku, "TK-1");
    assert_eq!(product.stock_level, 5);
    assert_eq!(product.price, Price::zar(rands(499)));
    assert_eq!(product.compare_at_price, Some(Price::zar(rands(599))));
    assert_eq!(product.status, ProductStatus::Active);

    let sent = transport.requests();
    assert_eq!(sent[0].query_value("page_number"), Some("1"));
    assert_eq!(sent[0].query_value("page_size"), Some("50"));
    assert_eq!(
        sent[0].header_value("Authorization"),
        Some("Key tk-9f8e7d6c5b4a")
    );
}

#[tokio::test(start_paused = true)]
async fn test_takealot_sales_grouped_into_orders() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::GET,
        "/v2/sales",
        200,
        &json!({
            "sales": [
                {
                    "order_id": 9001,
                    "sku": "TK-1",
                    "product_title": "Kettle",
                    "quantity": 2,
                    "selling_price": 499,
                    "sale_status": "Shipped to Customer",
                    "customer": "N. Dlamini"
                },
                {
                    "order_id": 9001,
                    "sku": "TK-2",
                    "product_title": "Toaster",
                    "selling_price": 100,
                    "sale_status": "Shipped to Customer"
                },
                {
                    "order_id": 9002,
                    "sku": "TK-1",
                    "product_title": "Kettle",
                    "selling_price": 499,
                    "sale_status": "Cancelled by Customer"
                }
            ],
            "page_summary": { "total": 3 }
        }),
    );
    let connector = connect(&transport, takealot_credentials()).await;

    let page = connector
        .get_orders(PaginationOptions::default())
        .await
        .into_data()
        .unwrap();

    assert_eq!(page.items.len(), 2);
    let first = &page.items[0];
    assert_eq!(first.id, OrderId::new("9001"));
    assert_eq!(first.status, OrderStatus::Shipped);
    assert_eq!(first.line_items.len(), 2);
    assert_eq!(first.total, Price::zar(rands(1098)));
    assert_eq!(first.customer_name.as_deref(), Some("N. Dlamini"));
    assert_eq!(page.items[1].status, OrderStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_takealot_stock_updates_are_per_offer() {
    let transport = Arc::new(MockTransport::new());
    transport
        .respond_json(Method::PATCH, "/v2/offers/offer", 200, &json!({}))
        .respond_json(
            Method::PATCH,
            "/v2/offers/offer",
            404,
            &json!({ "message": "offer not found" }),
        );
    let connector = connect(&transport, takealot_credentials()).await;

    let result = connector
        .update_stock(vec![StockUpdate::new("TK-1", 7), StockUpdate::new("TK-2", 3)])
        .await;

    assert!(result.is_partial());
    assert_eq!(result.data().unwrap()[0].sku, "TK-1");
    let failed = result.failed_items();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].item_id, "TK-2");
    assert_eq!(failed[0].code, ErrorCode::NotFound);

    let sent = transport.requests_matching("/offers/offer");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].query_value("identifier"), Some("SKUTK-1"));
    let body = sent[0].body.as_ref().unwrap();
    assert_eq!(body["leadtime_stock"][0]["merchant_warehouse_id"], 1027);
    assert_eq!(body["leadtime_stock"][0]["quantity"], 7);
}

#[tokio::test(start_paused = true)]
async fn test_takealot_has_no_order_acknowledgment() {
    let transport = Arc::new(MockTransport::new());
    let connector = connect(&transport, takealot_credentials()).await;

    let result = connector.acknowledge_order(&OrderId::new("9001")).await;

    assert_eq!(result.code(), Some(ErrorCode::ValidationError));
    assert_eq!(transport.request_count(), 0);
}

// =============================================================================
// Wantitall
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_wantitall_mixed_stock_batch_is_partial() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::POST,
        "/inventory/batch",
        200,
        &json!({
            "results": [
                { "sku": "WA-1", "success": true },
                {
                    "sku": "WA-2",
                    "success": false,
                    "error": { "code": "SKU_NOT_FOUND", "message": "unknown sku" }
                }
            ]
        }),
    );
    let connector = connect(&transport, wantitall_credentials()).await;

    let result = connector
        .update_stock(vec![
            StockUpdate::new("WA-1", 4),
            StockUpdate::new("WA-2", 9),
            StockUpdate::new("WA-3", -1),
        ])
        .await;

    assert!(result.is_partial());
    assert_eq!(result.data().unwrap().len(), 1);
    let failed = result.failed_items();
    assert_eq!(failed.len(), 2);
    let not_found = failed.iter().find(|f| f.item_id == "WA-2").unwrap();
    assert_eq!(not_found.code, ErrorCode::NotFound);
    assert_eq!(not_found.message, "unknown sku");
    let invalid = failed.iter().find(|f| f.item_id == "WA-3").unwrap();
    assert_eq!(invalid.code, ErrorCode::ValidationError);

    // The locally rejected item is never sent.
    let sent = transport.requests_matching("/inventory/batch");
    assert_eq!(sent.len(), 1);
    let items = sent[0].body.as_ref().unwrap()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_wantitall_price_batch_all_rejected_is_error() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::POST,
        "/prices/batch",
        200,
        &json!({
            "results": [
                {
                    "sku": "WA-1",
                    "success": false,
                    "error": { "code": "INVALID_PRICE", "message": "below floor" }
                }
            ]
        }),
    );
    let connector = connect(&transport, wantitall_credentials()).await;

    let result = connector
        .update_prices(vec![PriceUpdate::new("WA-1", Price::zar(rands(5)))])
        .await;

    assert_eq!(result.code(), Some(ErrorCode::PriceUpdateFailed));
    assert_eq!(result.failed_items()[0].code, ErrorCode::ValidationError);
}

#[tokio::test(start_paused = true)]
async fn test_wantitall_unknown_sku_is_product_not_found() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::GET,
        "/products/NOPE",
        404,
        &json!({ "error": { "message": "no such product" } }),
    );
    let connector = connect(&transport, wantitall_credentials()).await;

    let result = connector.get_product_by_sku("NOPE").await;

    assert_eq!(result.code(), Some(ErrorCode::ProductNotFound));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wantitall_acknowledge_order() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::POST,
        "/orders/W-1/acknowledge",
        200,
        &json!({ "data": { "acknowledged": true, "reference": "ACK-77" } }),
    );
    let connector = connect(&transport, wantitall_credentials()).await;

    let ack = connector
        .acknowledge_order(&OrderId::new("W-1"))
        .await
        .into_data()
        .unwrap();

    assert!(ack.acknowledged);
    assert_eq!(ack.marketplace_reference.as_deref(), Some("ACK-77"));
}

#[tokio::test(start_paused = true)]
async fn test_wantitall_refresh_rotates_token() {
    let transport = Arc::new(MockTransport::new());
    transport
        .respond_json(
            Method::POST,
            "/auth/refresh",
            200,
            &json!({ "access_token": "fresh-token", "expires_in": 3600 }),
        )
        .respond_json(Method::GET, "/sellers/S-100", 200, &json!({ "data": {} }));
    let credentials = wantitall_credentials()
        .with_access_token("stale-token")
        .with_refresh_token("refresh-me");
    let connector = connect(&transport, credentials).await;

    let status = connector.refresh_connection().await;

    assert!(status.connected);
    let refresh = transport.requests_matching("/auth/refresh");
    assert_eq!(refresh[0].body.as_ref().unwrap()["refresh_token"], "refresh-me");
    let probe = transport.requests_matching("/sellers/S-100");
    assert_eq!(
        probe.last().unwrap().header_value("Authorization"),
        Some("Bearer fresh-token")
    );
}

#[tokio::test(start_paused = true)]
async fn test_wantitall_failed_refresh_keeps_testing_connection() {
    let transport = Arc::new(MockTransport::new());
    transport
        .respond_json(Method::POST, "/auth/refresh", 401, &json!({ "message": "expired" }))
        .respond_json(Method::GET, "/sellers/S-100", 200, &json!({ "data": {} }));
    let credentials = wantitall_credentials()
        .with_access_token("stale-token")
        .with_refresh_token("refresh-me");
    let connector = connect(&transport, credentials).await;

    let status = connector.refresh_connection().await;

    assert!(status.connected);
    let probe = transport.requests_matching("/sellers/S-100");
    assert_eq!(
        probe.last().unwrap().header_value("Authorization"),
        Some("Bearer stale-token")
    );
}

// =============================================================================
// WooCommerce
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_woocommerce_products_use_total_header() {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        Method::GET,
        "/wp-json/wc/v3/products",
        HttpResponse::json_body(
            200,
            &json!([{
                "id": 55,
                "sku": "WC-1",
                "name": "Rooibos Tea",
                "description": "",
                "price": "79.00",
                "regular_price": "99.00",
                "sale_price": "79.00",
                "stock_quantity": 12,
                "status": "publish"
            }]),
        )
        .with_header("X-WP-Total", "42"),
    );
    let connector = connect(&transport, woocommerce_credentials()).await;

    let page = connector
        .get_products(PaginationOptions::new(1, 10))
        .await
        .into_data()
        .unwrap();

    assert_eq!(page.total, Some(42));
    assert!(page.has_more);
    let product = &page.items[0];
    assert_eq!(product.price, Price::zar(Decimal::new(7900, 2)));
    assert_eq!(product.compare_at_price, Some(Price::zar(Decimal::new(9900, 2))));
    assert_eq!(product.description, None);
    assert_eq!(product.status, ProductStatus::Active);

    let sent = transport.requests();
    assert!(sent[0].url.starts_with("https://shop.example.co.za/wp-json/wc/v3/products"));
    assert!(
        sent[0]
            .header_value("Authorization")
            .unwrap()
            .starts_with("Basic ")
    );
}

#[tokio::test(start_paused = true)]
async fn test_woocommerce_stock_resolves_skus_before_batch() {
    let transport = Arc::new(MockTransport::new());
    transport
        .respond_json(
            Method::GET,
            "/wp-json/wc/v3/products",
            200,
            &json!([
                { "id": 55, "sku": "WC-1" },
                { "id": 56, "sku": "WC-2" }
            ]),
        )
        .respond_json(
            Method::POST,
            "/products/batch",
            200,
            &json!({
                "update": [
                    { "id": 55 },
                    {
                        "id": 56,
                        "error": {
                            "code": "woocommerce_rest_invalid_stock",
                            "message": "stock management disabled"
                        }
                    }
                ]
            }),
        );
    let connector = connect(&transport, woocommerce_credentials()).await;

    let result = connector
        .update_stock(vec![
            StockUpdate::new("WC-1", 5),
            StockUpdate::new("WC-2", 1),
            StockUpdate::new("WC-404", 2),
        ])
        .await;

    assert!(result.is_partial());
    assert_eq!(result.data().unwrap().len(), 1);
    let failed = result.failed_items();
    assert_eq!(failed.len(), 2);
    let missing = failed.iter().find(|f| f.item_id == "WC-404").unwrap();
    assert_eq!(missing.code, ErrorCode::NotFound);
    let rejected = failed.iter().find(|f| f.item_id == "WC-2").unwrap();
    assert_eq!(rejected.code, ErrorCode::ValidationError);

    let lookup = &transport.requests()[0];
    assert_eq!(lookup.query_value("sku"), Some("WC-1,WC-2,WC-404"));
    let batch = transport.requests_matching("/products/batch");
    let updates = batch[0].body.as_ref().unwrap()["update"].as_array().unwrap().clone();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0]["id"], 55);
    assert_eq!(updates[0]["manage_stock"], true);
    assert_eq!(updates[0]["stock_quantity"], 5);
}

#[tokio::test(start_paused = true)]
async fn test_woocommerce_order_acknowledge_sets_processing() {
    let transport = Arc::new(MockTransport::new());
    transport.respond_json(
        Method::PUT,
        "/wp-json/wc/v3/orders/812",
        200,
        &json!({
            "id": 812,
            "number": "812",
            "status": "processing",
            "total": "250.00",
            "billing": { "first_name": "Thandi", "last_name": "Mokoena" }
        }),
    );
    let connector = connect(&transport, woocommerce_credentials()).await;

    let ack = connector
        .acknowledge_order(&OrderId::new("812"))
        .await
        .into_data()
        .unwrap();

    assert!(ack.acknowledged);
    assert_eq!(ack.marketplace_reference.as_deref(), Some("812"));
    let sent = transport.requests();
    assert_eq!(sent[0].body.as_ref().unwrap()["status"], "processing");
}
