//! Wantitall seller API.
//!
//! Batch endpoints report a result per SKU; refresh tokens are exchanged at
//! `/auth/refresh` when the seller connected with OAuth-style credentials.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use fluxori_core::{
    AccessToken, BatchOutcome, ConnectorCredentials, CredentialField, CurrencyCode, ErrorCode,
    ItemFailure, Marketplace, MarketplaceOrder, MarketplaceProduct, OrderAcknowledgment, OrderId,
    OrderLineItem, OrderStatus, PaginatedResponse, PaginationOptions, Price, PriceUpdate,
    ProductStatus, StockUpdate,
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{expose, item_error_code, parse_timestamp};
use crate::adapter::{ApiClient, MarketplaceAdapter, OrderPage, ProductPage};
use crate::error::ConnectorError;
use crate::transport::HttpRequest;

/// Wantitall API base URL.
pub const BASE_URL: &str = "https://api.wantitall.co.za/v1";

const REQUIRED_FIELDS: &[CredentialField] = &[CredentialField::ApiKey, CredentialField::SellerId];

/// Adapter for Wantitall.
#[derive(Debug, Clone)]
pub struct WantitallAdapter {
    base_url: String,
}

impl Default for WantitallAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WantitallAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL under the seller's namespace.
    fn seller_url(&self, credentials: &ConnectorCredentials, path: &str) -> String {
        format!(
            "{}/sellers/{}{path}",
            self.base_url,
            credentials.seller_id.as_deref().unwrap_or_default()
        )
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    meta: Option<ListMeta>,
}

#[derive(Debug, Deserialize)]
struct ListMeta {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ItemResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct Product {
    id: String,
    sku: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    price: Decimal,
    #[serde(default)]
    list_price: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    quantity: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    ean: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Order {
    id: String,
    #[serde(default)]
    order_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    customer: Option<Customer>,
    #[serde(default)]
    items: Vec<OrderItem>,
    total: Decimal,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderItem {
    sku: String,
    #[serde(default)]
    name: Option<String>,
    quantity: i64,
    unit_price: Decimal,
}

#[derive(Debug, Serialize)]
struct StockItem<'a> {
    sku: &'a str,
    quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PriceItem<'a> {
    sku: &'a str,
    price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    list_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct BatchRequest<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(default)]
    results: Vec<BatchResult>,
}

#[derive(Debug, Deserialize)]
struct BatchResult {
    sku: String,
    success: bool,
    #[serde(default)]
    error: Option<BatchError>,
}

#[derive(Debug, Deserialize)]
struct BatchError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Acknowledgment {
    #[serde(default)]
    acknowledged: bool,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

// =============================================================================
// Conversions
// =============================================================================

fn convert_product(product: Product) -> MarketplaceProduct {
    let currency = product
        .currency
        .as_deref()
        .map_or_else(CurrencyCode::default, CurrencyCode::from_code_or_default);
    let status = match product.status.as_deref() {
        Some("active") => ProductStatus::Active,
        Some("inactive" | "suspended") => ProductStatus::Inactive,
        Some("draft") => ProductStatus::Draft,
        _ => ProductStatus::Unknown,
    };

    MarketplaceProduct {
        id: product.id,
        sku: product.sku,
        title: product.name,
        description: product.description,
        price: Price::new(product.price, currency),
        compare_at_price: product.list_price.map(|amount| Price::new(amount, currency)),
        stock_level: product.quantity,
        status,
        barcode: product.ean,
        marketplace_url: product.url,
        updated_at: product.updated_at.as_deref().and_then(parse_timestamp),
    }
}

fn convert_order(order: Order) -> MarketplaceOrder {
    let currency = order
        .currency
        .as_deref()
        .map_or_else(CurrencyCode::default, CurrencyCode::from_code_or_default);

    MarketplaceOrder {
        order_number: order.order_number.unwrap_or_else(|| order.id.clone()),
        id: OrderId::new(order.id),
        status: order
            .status
            .as_deref()
            .map_or(OrderStatus::Unknown, OrderStatus::from_marketplace),
        created_at: order.created_at.as_deref().and_then(parse_timestamp),
        customer_name: order.customer.and_then(|c| c.name),
        line_items: order
            .items
            .into_iter()
            .map(|item| OrderLineItem {
                title: item.name.unwrap_or_default(),
                sku: item.sku,
                quantity: item.quantity,
                unit_price: Price::new(item.unit_price, currency),
            })
            .collect(),
        total: Price::new(order.total, currency),
    }
}

/// Match per-SKU results back to the submitted items.
fn collect_results<T: Clone>(
    items: &[T],
    sku_of: impl Fn(&T) -> &str,
    response: BatchResponse,
) -> BatchOutcome<T> {
    let mut outcome = BatchOutcome::new();
    for item in items {
        let sku = sku_of(item);
        match response.results.iter().find(|r| r.sku == sku) {
            Some(result) if result.success => outcome.succeed(item.clone()),
            Some(result) => {
                let (code, message) = result.error.as_ref().map_or_else(
                    || (ErrorCode::UnknownError, "rejected by Wantitall".to_string()),
                    |error| {
                        (
                            error
                                .code
                                .as_deref()
                                .map_or(ErrorCode::UnknownError, item_error_code),
                            error
                                .message
                                .clone()
                                .unwrap_or_else(|| "rejected by Wantitall".to_string()),
                        )
                    },
                );
                outcome.fail(ItemFailure::new(sku, code, message));
            }
            None => outcome.fail(ItemFailure::new(
                sku,
                ErrorCode::UnknownError,
                "no result returned for sku",
            )),
        }
    }
    outcome
}

// =============================================================================
// Adapter
// =============================================================================

#[async_trait]
impl MarketplaceAdapter for WantitallAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Wantitall
    }

    fn required_fields(&self) -> &'static [CredentialField] {
        REQUIRED_FIELDS
    }

    fn authorize(&self, credentials: &ConnectorCredentials, request: HttpRequest) -> HttpRequest {
        let token = credentials
            .access_token
            .as_ref()
            .map_or_else(|| expose(credentials.api_key.as_ref()), |t| t.expose_secret());
        request
            .header("Authorization", format!("Bearer {token}"))
            .header(
                "X-Seller-Id",
                credentials.seller_id.clone().unwrap_or_default(),
            )
    }

    fn health_check(&self, credentials: &ConnectorCredentials) -> HttpRequest {
        HttpRequest::get(self.seller_url(credentials, ""))
    }

    fn max_batch_size(&self) -> usize {
        100
    }

    fn supports_token_refresh(&self) -> bool {
        true
    }

    #[instrument(skip(self, api))]
    async fn refresh_token(&self, api: &ApiClient<'_>) -> Result<AccessToken, ConnectorError> {
        let refresh_token = expose(api.credentials().refresh_token.as_ref());
        let request = HttpRequest::post(format!("{}/auth/refresh", self.base_url))
            .json(&RefreshRequest { refresh_token })?;
        let response: RefreshResponse = api.send_json(request).await?;

        let expires_at = response
            .expires_in
            .map(|seconds| Utc::now() + ChronoDuration::seconds(seconds));
        Ok(AccessToken::new(response.access_token, expires_at))
    }

    #[instrument(skip(self, api), fields(page = options.page))]
    async fn fetch_products(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<ProductPage, ConnectorError> {
        let mut request = HttpRequest::get(self.seller_url(api.credentials(), "/products"))
            .query("page", options.page)
            .query("limit", options.page_size);
        if let Some(since) = options.since {
            request = request.query("updated_after", since.to_rfc3339());
        }
        let response: ListResponse<Product> = api.send_json(request).await?;

        let total = response.meta.and_then(|meta| meta.total);
        let products = response.data.into_iter().map(convert_product).collect();
        Ok(PaginatedResponse::new(products, options, total))
    }

    #[instrument(skip(self, api))]
    async fn fetch_product(
        &self,
        api: &ApiClient<'_>,
        sku: &str,
    ) -> Result<MarketplaceProduct, ConnectorError> {
        let url = self.seller_url(api.credentials(), &format!("/products/{sku}"));
        let response: ItemResponse<Product> = api.send_json(HttpRequest::get(url)).await?;
        Ok(convert_product(response.data))
    }

    #[instrument(skip(self, api), fields(page = options.page))]
    async fn fetch_orders(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<OrderPage, ConnectorError> {
        let mut request = HttpRequest::get(self.seller_url(api.credentials(), "/orders"))
            .query("page", options.page)
            .query("limit", options.page_size);
        if let Some(since) = options.since {
            request = request.query("created_after", since.to_rfc3339());
        }
        let response: ListResponse<Order> = api.send_json(request).await?;

        let total = response.meta.and_then(|meta| meta.total);
        let orders = response.data.into_iter().map(convert_order).collect();
        Ok(PaginatedResponse::new(orders, options, total))
    }

    #[instrument(skip(self, api))]
    async fn fetch_order(
        &self,
        api: &ApiClient<'_>,
        order_id: &OrderId,
    ) -> Result<MarketplaceOrder, ConnectorError> {
        let url = self.seller_url(api.credentials(), &format!("/orders/{order_id}"));
        let response: ItemResponse<Order> = api.send_json(HttpRequest::get(url)).await?;
        Ok(convert_order(response.data))
    }

    #[instrument(skip(self, api, updates), fields(count = updates.len()))]
    async fn push_stock(
        &self,
        api: &ApiClient<'_>,
        updates: &[StockUpdate],
    ) -> Result<BatchOutcome<StockUpdate>, ConnectorError> {
        let body = BatchRequest {
            items: updates
                .iter()
                .map(|u| StockItem {
                    sku: &u.sku,
                    quantity: u.quantity,
                    location_id: u.location_id.as_deref(),
                })
                .collect(),
        };
        let request =
            HttpRequest::post(self.seller_url(api.credentials(), "/inventory/batch")).json(&body)?;
        let response: BatchResponse = api.send_json(request).await?;

        Ok(collect_results(updates, |u| u.sku.as_str(), response))
    }

    #[instrument(skip(self, api, updates), fields(count = updates.len()))]
    async fn push_prices(
        &self,
        api: &ApiClient<'_>,
        updates: &[PriceUpdate],
    ) -> Result<BatchOutcome<PriceUpdate>, ConnectorError> {
        let body = BatchRequest {
            items: updates
                .iter()
                .map(|u| PriceItem {
                    sku: &u.sku,
                    price: u.price.amount,
                    list_price: u.compare_at_price.as_ref().map(|p| p.amount),
                })
                .collect(),
        };
        let request =
            HttpRequest::post(self.seller_url(api.credentials(), "/prices/batch")).json(&body)?;
        let response: BatchResponse = api.send_json(request).await?;

        Ok(collect_results(updates, |u| u.sku.as_str(), response))
    }

    #[instrument(skip(self, api))]
    async fn acknowledge(
        &self,
        api: &ApiClient<'_>,
        order_id: &OrderId,
    ) -> Result<OrderAcknowledgment, ConnectorError> {
        let url = self.seller_url(api.credentials(), &format!("/orders/{order_id}/acknowledge"));
        let response: ItemResponse<Acknowledgment> =
            api.send_json(HttpRequest::post(url)).await?;

        Ok(OrderAcknowledgment {
            order_id: order_id.clone(),
            acknowledged: response.data.acknowledged,
            marketplace_reference: response.data.reference,
        })
    }
}
