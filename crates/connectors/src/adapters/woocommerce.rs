//! WooCommerce REST API v3.
//!
//! Self-hosted: every store has its own base URL. Writes go through
//! `/products/batch`, which addresses products by id, so SKUs are resolved
//! first.

use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fluxori_core::{
    BatchOutcome, ConnectorCredentials, CredentialField, CurrencyCode, ErrorCode, ItemFailure,
    Marketplace, MarketplaceOrder, MarketplaceProduct, OrderAcknowledgment, OrderId,
    OrderLineItem, OrderStatus, PaginatedResponse, PaginationOptions, Price, PriceUpdate,
    ProductStatus, StockUpdate,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{expose, item_error_code, parse_amount, parse_timestamp};
use crate::adapter::{ApiClient, MarketplaceAdapter, OrderPage, ProductPage};
use crate::error::ConnectorError;
use crate::transport::HttpRequest;

const API_PATH: &str = "/wp-json/wc/v3";

const REQUIRED_FIELDS: &[CredentialField] = &[
    CredentialField::ApiKey,
    CredentialField::ApiSecret,
    CredentialField::StoreUrl,
];

/// WooCommerce caps batch endpoints at 100 operations.
const BATCH_LIMIT: usize = 100;

/// Adapter for WooCommerce stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct WooCommerceAdapter;

impl WooCommerceAdapter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn api_url(credentials: &ConnectorCredentials, path: &str) -> String {
    let store = credentials.store_url.as_deref().unwrap_or_default();
    format!("{}{API_PATH}{path}", store.trim_end_matches('/'))
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct WcProduct {
    id: u64,
    #[serde(default)]
    sku: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    regular_price: String,
    #[serde(default)]
    sale_price: String,
    #[serde(default)]
    stock_quantity: Option<i64>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    permalink: Option<String>,
    #[serde(default)]
    date_modified_gmt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WcOrder {
    id: u64,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    date_created_gmt: Option<String>,
    #[serde(default)]
    billing: Option<WcBilling>,
    #[serde(default)]
    line_items: Vec<WcLineItem>,
    #[serde(default)]
    total: String,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WcBilling {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct WcLineItem {
    #[serde(default)]
    sku: String,
    #[serde(default)]
    name: String,
    quantity: i64,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
struct WcBatchResponse {
    #[serde(default)]
    update: Vec<WcBatchItem>,
}

#[derive(Debug, Deserialize)]
struct WcBatchItem {
    #[serde(default)]
    error: Option<WcError>,
}

#[derive(Debug, Deserialize)]
struct WcError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

// =============================================================================
// Conversions
// =============================================================================

fn convert_product(product: WcProduct) -> MarketplaceProduct {
    let regular = parse_amount(&product.regular_price);
    let sale = parse_amount(&product.sale_price);
    let (price, compare_at) = match (sale, regular) {
        (Some(sale), Some(regular)) if sale < regular => (sale, Some(regular)),
        _ => (
            parse_amount(&product.price)
                .or(regular)
                .unwrap_or_default(),
            None,
        ),
    };
    let status = match product.status.as_str() {
        "publish" => ProductStatus::Active,
        "draft" | "pending" => ProductStatus::Draft,
        "private" => ProductStatus::Inactive,
        _ => ProductStatus::Unknown,
    };

    MarketplaceProduct {
        id: product.id.to_string(),
        sku: product.sku,
        title: product.name,
        description: Some(product.description).filter(|d| !d.trim().is_empty()),
        price: Price::zar(price),
        compare_at_price: compare_at.map(Price::zar),
        stock_level: product.stock_quantity.unwrap_or_default(),
        status,
        barcode: None,
        marketplace_url: product.permalink,
        updated_at: product.date_modified_gmt.as_deref().and_then(parse_timestamp),
    }
}

fn convert_order(order: WcOrder) -> MarketplaceOrder {
    let currency = order
        .currency
        .as_deref()
        .map_or_else(CurrencyCode::default, CurrencyCode::from_code_or_default);
    let customer_name = order
        .billing
        .map(|b| format!("{} {}", b.first_name, b.last_name).trim().to_string())
        .filter(|name| !name.is_empty());

    MarketplaceOrder {
        id: OrderId::new(order.id.to_string()),
        order_number: order.number.unwrap_or_else(|| order.id.to_string()),
        status: OrderStatus::from_marketplace(&order.status),
        created_at: order.date_created_gmt.as_deref().and_then(parse_timestamp),
        customer_name,
        line_items: order
            .line_items
            .into_iter()
            .map(|item| OrderLineItem {
                sku: item.sku,
                title: item.name,
                quantity: item.quantity,
                unit_price: Price::new(item.price, currency),
            })
            .collect(),
        total: Price::new(parse_amount(&order.total).unwrap_or_default(), currency),
    }
}

fn price_payload(update: &PriceUpdate, id: u64) -> Value {
    match &update.compare_at_price {
        Some(compare_at) => json!({
            "id": id,
            "regular_price": compare_at.amount.to_string(),
            "sale_price": update.price.amount.to_string(),
        }),
        None => json!({
            "id": id,
            "regular_price": update.price.amount.to_string(),
            "sale_price": "",
        }),
    }
}

fn stock_payload(update: &StockUpdate, id: u64) -> Value {
    json!({
        "id": id,
        "manage_stock": true,
        "stock_quantity": update.quantity,
    })
}

/// `X-WP-Total` as a number.
fn wp_total(response: &crate::transport::HttpResponse) -> Option<u64> {
    response
        .header("x-wp-total")
        .and_then(|total| total.trim().parse().ok())
}

// =============================================================================
// Batch writes
// =============================================================================

impl WooCommerceAdapter {
    /// Product ids for the given SKUs; unknown SKUs are left out.
    async fn resolve_ids(
        api: &ApiClient<'_>,
        skus: &[&str],
    ) -> Result<HashMap<String, u64>, ConnectorError> {
        let request = HttpRequest::get(api_url(api.credentials(), "/products"))
            .query("sku", skus.join(","))
            .query("per_page", BATCH_LIMIT);
        let products: Vec<WcProduct> = api.send_json(request).await?;

        Ok(products
            .into_iter()
            .filter(|p| !p.sku.is_empty())
            .map(|p| (p.sku, p.id))
            .collect())
    }

    /// Resolve SKUs, send one `/products/batch` update, and match results
    /// back by position.
    async fn batch_update<T, S, P>(
        api: &ApiClient<'_>,
        items: &[T],
        sku_of: S,
        payload_of: P,
    ) -> Result<BatchOutcome<T>, ConnectorError>
    where
        T: Clone + Send + Sync,
        S: Fn(&T) -> &str + Send + Sync,
        P: Fn(&T, u64) -> Value + Send + Sync,
    {
        let skus: Vec<&str> = items.iter().map(&sku_of).collect();
        let ids = Self::resolve_ids(api, &skus).await?;

        let mut outcome = BatchOutcome::new();
        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            let sku = sku_of(item);
            match ids.get(sku) {
                Some(id) => resolved.push((item, *id)),
                None => outcome.fail(ItemFailure::new(
                    sku,
                    ErrorCode::NotFound,
                    format!("sku {sku} not found in store"),
                )),
            }
        }
        if resolved.is_empty() {
            return Ok(outcome);
        }

        let payload: Vec<Value> = resolved.iter().map(|(item, id)| payload_of(item, *id)).collect();
        let request = HttpRequest::post(api_url(api.credentials(), "/products/batch"))
            .json(&json!({ "update": payload }))?;
        let response: WcBatchResponse = api.send_json(request).await?;
        debug!(sent = resolved.len(), returned = response.update.len(), "Batch update response");

        let mut results = response.update.into_iter();
        for (item, _) in resolved {
            let sku = sku_of(item);
            match results.next() {
                Some(WcBatchItem { error: None }) => outcome.succeed(item.clone()),
                Some(WcBatchItem { error: Some(error) }) => outcome.fail(ItemFailure::new(
                    sku,
                    item_error_code(&error.code),
                    error.message,
                )),
                None => outcome.fail(ItemFailure::new(
                    sku,
                    ErrorCode::UnknownError,
                    "no result returned for sku",
                )),
            }
        }
        Ok(outcome)
    }
}

// =============================================================================
// Adapter
// =============================================================================

#[async_trait]
impl MarketplaceAdapter for WooCommerceAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::WooCommerce
    }

    fn required_fields(&self) -> &'static [CredentialField] {
        REQUIRED_FIELDS
    }

    fn prepare(&self, credentials: &ConnectorCredentials) -> Result<(), ConnectorError> {
        let store_url = credentials.store_url.as_deref().unwrap_or_default();
        let parsed = url::Url::parse(store_url)
            .map_err(|e| ConnectorError::Validation(format!("invalid storeUrl: {e}")))?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ConnectorError::Validation(
                "storeUrl must be an http(s) URL".to_string(),
            ));
        }
        Ok(())
    }

    fn authorize(&self, credentials: &ConnectorCredentials, request: HttpRequest) -> HttpRequest {
        let pair = format!(
            "{}:{}",
            expose(credentials.api_key.as_ref()),
            expose(credentials.api_secret.as_ref())
        );
        request.header("Authorization", format!("Basic {}", STANDARD.encode(pair)))
    }

    fn health_check(&self, credentials: &ConnectorCredentials) -> HttpRequest {
        HttpRequest::get(api_url(credentials, "/system_status"))
    }

    fn max_batch_size(&self) -> usize {
        BATCH_LIMIT
    }

    #[instrument(skip(self, api), fields(page = options.page))]
    async fn fetch_products(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<ProductPage, ConnectorError> {
        let mut request = HttpRequest::get(api_url(api.credentials(), "/products"))
            .query("page", options.page)
            .query("per_page", options.page_size);
        if let Some(since) = options.since {
            request = request.query("modified_after", since.to_rfc3339());
        }
        let response = api.send(request).await?;
        let products: Vec<WcProduct> = response.json()?;

        let products = products.into_iter().map(convert_product).collect();
        Ok(PaginatedResponse::new(products, options, wp_total(&response)))
    }

    #[instrument(skip(self, api))]
    async fn fetch_product(
        &self,
        api: &ApiClient<'_>,
        sku: &str,
    ) -> Result<MarketplaceProduct, ConnectorError> {
        let request = HttpRequest::get(api_url(api.credentials(), "/products")).query("sku", sku);
        let products: Vec<WcProduct> = api.send_json(request).await?;

        products
            .into_iter()
            .find(|p| p.sku == sku)
            .map(convert_product)
            .ok_or_else(|| ConnectorError::NotFound(format!("product {sku}")))
    }

    #[instrument(skip(self, api), fields(page = options.page))]
    async fn fetch_orders(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<OrderPage, ConnectorError> {
        let mut request = HttpRequest::get(api_url(api.credentials(), "/orders"))
            .query("page", options.page)
            .query("per_page", options.page_size);
        if let Some(since) = options.since {
            request = request.query("after", since.to_rfc3339());
        }
        let response = api.send(request).await?;
        let orders: Vec<WcOrder> = response.json()?;

        let orders = orders.into_iter().map(convert_order).collect();
        Ok(PaginatedResponse::new(orders, options, wp_total(&response)))
    }

    #[instrument(skip(self, api))]
    async fn fetch_order(
        &self,
        api: &ApiClient<'_>,
        order_id: &OrderId,
    ) -> Result<MarketplaceOrder, ConnectorError> {
        let url = api_url(api.credentials(), &format!("/orders/{order_id}"));
        let order: WcOrder = api.send_json(HttpRequest::get(url)).await?;
        Ok(convert_order(order))
    }

    #[instrument(skip(self, api, updates), fields(count = updates.len()))]
    async fn push_stock(
        &self,
        api: &ApiClient<'_>,
        updates: &[StockUpdate],
    ) -> Result<BatchOutcome<StockUpdate>, ConnectorError> {
        Self::batch_update(api, updates, |u| u.sku.as_str(), stock_payload).await
    }

    #[instrument(skip(self, api, updates), fields(count = updates.len()))]
    async fn push_prices(
        &self,
        api: &ApiClient<'_>,
        updates: &[PriceUpdate],
    ) -> Result<BatchOutcome<PriceUpdate>, ConnectorError> {
        Self::batch_update(api, updates, |u| u.sku.as_str(), price_payload).await
    }

    #[instrument(skip(self, api))]
    async fn acknowledge(
        &self,
        api: &ApiClient<'_>,
        order_id: &OrderId,
    ) -> Result<OrderAcknowledgment, ConnectorError> {
        let url = api_url(api.credentials(), &format!("/orders/{order_id}"));
        let request = HttpRequest::put(url).json(&json!({ "status": "processing" }))?;
        let order: WcOrder = api.send_json(request).await?;

        Ok(OrderAcknowledgment {
            order_id: order_id.clone(),
            acknowledged: OrderStatus::from_marketplace(&order.status) == OrderStatus::Processing,
            marketplace_reference: order.number,
        })
    }
}
