//! Takealot Seller API v2.
//!
//! Offers are Takealot's listings. Sales are reported per order item and
//! grouped into orders here. Stock and price changes are made one offer at a
//! time; Takealot has no order acknowledgment endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fluxori_core::{
    BatchOutcome, ConnectorCredentials, CredentialField, ErrorCode, ItemFailure, Marketplace,
    MarketplaceOrder, MarketplaceProduct, OrderAcknowledgment, OrderId, OrderLineItem,
    OrderStatus, PaginatedResponse, PaginationOptions, Price, PriceUpdate, ProductStatus,
    StockUpdate,
};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{expose, parse_timestamp};
use crate::adapter::{ApiClient, MarketplaceAdapter, OrderPage, ProductPage};
use crate::error::ConnectorError;
use crate::rate_limit::RateLimit;
use crate::transport::HttpRequest;

/// Takealot Seller API base URL.
pub const BASE_URL: &str = "https://seller-api.takealot.com/v2";

const REQUIRED_FIELDS: &[CredentialField] = &[CredentialField::ApiKey];

/// Adapter for Takealot.
#[derive(Debug, Clone)]
pub struct TakealotAdapter {
    base_url: String,
}

impl Default for TakealotAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TakealotAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the adapter at another host (sandbox or tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    offers: Vec<Offer>,
    total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    offer_id: u64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    title: Option<String>,
    selling_price: Decimal,
    #[serde(default)]
    rrp: Option<Decimal>,
    #[serde(default)]
    leadtime_stock: Vec<LeadtimeStock>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    barcode: Option<String>,
    #[serde(default)]
    offer_url: Option<String>,
    #[serde(default)]
    date_updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LeadtimeStock {
    #[serde(default)]
    quantity_available: i64,
}

#[derive(Debug, Deserialize)]
struct SalesResponse {
    #[serde(default)]
    sales: Vec<Sale>,
    page_summary: Option<PageSummary>,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Sale {
    order_id: u64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    product_title: Option<String>,
    #[serde(default = "one")]
    quantity: i64,
    selling_price: Decimal,
    #[serde(default)]
    order_date: Option<String>,
    #[serde(default)]
    sale_status: Option<String>,
    #[serde(default)]
    customer: Option<String>,
}

const fn one() -> i64 {
    1
}

// =============================================================================
// Conversions
// =============================================================================

fn product_status(status: Option<&str>) -> ProductStatus {
    match status.map(str::to_ascii_lowercase).as_deref() {
        Some("buyable") => ProductStatus::Active,
        Some(s) if s.starts_with("not buyable") || s.starts_with("disabled") => {
            ProductStatus::Inactive
        }
        _ => ProductStatus::Unknown,
    }
}

fn convert_offer(offer: Offer) -> MarketplaceProduct {
    MarketplaceProduct {
        id: offer.offer_id.to_string(),
        sku: offer.sku.unwrap_or_default(),
        title: offer.title.unwrap_or_default(),
        description: None,
        price: Price::zar(offer.selling_price),
        compare_at_price: offer.rrp.filter(|rrp| !rrp.is_zero()).map(Price::zar),
        stock_level: offer.leadtime_stock.iter().map(|s| s.quantity_available).sum(),
        status: product_status(offer.status.as_deref()),
        barcode: offer.barcode.filter(|b| !b.is_empty()),
        marketplace_url: offer.offer_url,
        updated_at: offer.date_updated.as_deref().and_then(parse_timestamp),
    }
}

/// Group per-item sales into orders, keeping first-seen order.
fn group_sales(sales: Vec<Sale>) -> Vec<MarketplaceOrder> {
    let mut orders: Vec<MarketplaceOrder> = Vec::new();
    for sale in sales {
        let order_id = sale.order_id.to_string();
        let line = OrderLineItem {
            sku: sale.sku.unwrap_or_default(),
            title: sale.product_title.unwrap_or_default(),
            quantity: sale.quantity,
            unit_price: Price::zar(sale.selling_price),
        };
        let line_total = sale.selling_price * Decimal::from(sale.quantity);

        if let Some(order) = orders.iter_mut().find(|o| o.id.as_str() == order_id) {
            order.total.amount += line_total;
            order.line_items.push(line);
            continue;
        }

        orders.push(MarketplaceOrder {
            id: OrderId::new(order_id.clone()),
            order_number: order_id,
            status: sale
                .sale_status
                .as_deref()
                .map_or(OrderStatus::Unknown, OrderStatus::from_marketplace),
            created_at: sale.order_date.as_deref().and_then(parse_timestamp),
            customer_name: sale.customer,
            line_items: vec![line],
            total: Price::zar(line_total),
        });
    }
    orders
}

/// Offers are addressed by `identifier=SKU<sku>`.
fn by_sku(request: HttpRequest, sku: &str) -> HttpRequest {
    request.query("identifier", format!("SKU{sku}"))
}

fn since_filter(since: DateTime<Utc>) -> String {
    format!("start_date:{}", since.format("%Y-%m-%d"))
}

fn whole_rands(amount: Decimal) -> Option<i64> {
    amount.round().to_i64()
}

// =============================================================================
// Adapter
// =============================================================================

#[async_trait]
impl MarketplaceAdapter for TakealotAdapter {
    fn marketplace(&self) -> Marketplace {
        Marketplace::Takealot
    }

    fn required_fields(&self) -> &'static [CredentialField] {
        REQUIRED_FIELDS
    }

    fn authorize(&self, credentials: &ConnectorCredentials, request: HttpRequest) -> HttpRequest {
        request.header(
            "Authorization",
            format!("Key {}", expose(credentials.api_key.as_ref())),
        )
    }

    fn health_check(&self, _credentials: &ConnectorCredentials) -> HttpRequest {
        HttpRequest::get(self.url("/offers/count"))
    }

    fn default_rate_limit(&self) -> Option<RateLimit> {
        RateLimit::new(1, 5)
    }

    fn max_batch_size(&self) -> usize {
        25
    }

    #[instrument(skip(self, api), fields(page = options.page))]
    async fn fetch_products(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<ProductPage, ConnectorError> {
        let request = HttpRequest::get(self.url("/offers"))
            .query("page_number", options.page)
            .query("page_size", options.page_size);
        let response: OffersResponse = api.send_json(request).await?;

        let products = response.offers.into_iter().map(convert_offer).collect();
        Ok(PaginatedResponse::new(products, options, response.total_results))
    }

    #[instrument(skip(self, api))]
    async fn fetch_product(
        &self,
        api: &ApiClient<'_>,
        sku: &str,
    ) -> Result<MarketplaceProduct, ConnectorError> {
        let request = by_sku(HttpRequest::get(self.url("/offers/offer")), sku);
        let offer: Offer = api.send_json(request).await?;
        Ok(convert_offer(offer))
    }

    #[instrument(skip(self, api), fields(page = options.page))]
    async fn fetch_orders(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<OrderPage, ConnectorError> {
        let mut request = HttpRequest::get(self.url("/sales"))
            .query("page_number", options.page)
            .query("page_size", options.page_size);
        if let Some(since) = options.since {
            request = request.query("filters", since_filter(since));
        }
        let response: SalesResponse = api.send_json(request).await?;

        let total = response.page_summary.and_then(|summary| summary.total);
        Ok(PaginatedResponse::new(group_sales(response.sales), options, total))
    }

    #[instrument(skip(self, api))]
    async fn fetch_order(
        &self,
        api: &ApiClient<'_>,
        order_id: &OrderId,
    ) -> Result<MarketplaceOrder, ConnectorError> {
        let request =
            HttpRequest::get(self.url("/sales")).query("filters", format!("order_id:{order_id}"));
        let response: SalesResponse = api.send_json(request).await?;

        group_sales(response.sales)
            .into_iter()
            .find(|order| order.id == *order_id)
            .ok_or_else(|| ConnectorError::NotFound(format!("order {order_id}")))
    }

    #[instrument(skip(self, api, updates), fields(count = updates.len()))]
    async fn push_stock(
        &self,
        api: &ApiClient<'_>,
        updates: &[StockUpdate],
    ) -> Result<BatchOutcome<StockUpdate>, ConnectorError> {
        let default_warehouse = api.credentials().merchant_warehouse_id.as_deref();
        let mut outcome = BatchOutcome::new();

        for update in updates {
            let Some(warehouse) = update.location_id.as_deref().or(default_warehouse) else {
                outcome.fail(ItemFailure::new(
                    &update.sku,
                    ErrorCode::ValidationError,
                    "merchantWarehouseId is required for Takealot stock updates",
                ));
                continue;
            };
            let warehouse_id = warehouse
                .parse::<u64>()
                .map_or_else(|_| json!(warehouse), |id| json!(id));

            let request = by_sku(HttpRequest::patch(self.url("/offers/offer")), &update.sku)
                .json(&json!({
                    "leadtime_stock": [{
                        "merchant_warehouse_id": warehouse_id,
                        "quantity": update.quantity,
                    }]
                }))?;

            match api.send(request).await {
                Ok(_) => outcome.succeed(update.clone()),
                Err(error) => {
                    outcome.fail(ItemFailure::new(&update.sku, error.code(), error.to_string()));
                }
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self, api, updates), fields(count = updates.len()))]
    async fn push_prices(
        &self,
        api: &ApiClient<'_>,
        updates: &[PriceUpdate],
    ) -> Result<BatchOutcome<PriceUpdate>, ConnectorError> {
        let mut outcome = BatchOutcome::new();

        for update in updates {
            let Some(selling_price) = whole_rands(update.price.amount) else {
                outcome.fail(ItemFailure::new(
                    &update.sku,
                    ErrorCode::ValidationError,
                    "price out of range",
                ));
                continue;
            };
            let mut body = json!({ "selling_price": selling_price });
            if let Some(rrp) = update
                .compare_at_price
                .as_ref()
                .and_then(|p| whole_rands(p.amount))
            {
                body["rrp"] = json!(rrp);
            }

            let request = by_sku(HttpRequest::patch(self.url("/offers/offer")), &update.sku)
                .json(&body)?;

            match api.send(request).await {
                Ok(_) => outcome.succeed(update.clone()),
                Err(error) => {
                    outcome.fail(ItemFailure::new(&update.sku, error.code(), error.to_string()));
                }
            }
        }
        Ok(outcome)
    }

    async fn acknowledge(
        &self,
        _api: &ApiClient<'_>,
        _order_id: &OrderId,
    ) -> Result<OrderAcknowledgment, ConnectorError> {
        Err(ConnectorError::Unsupported(
            "Takealot does not support order acknowledgment".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_offer() {
        let offer: Offer = serde_json::from_value(json!({
            "offer_id": 9001,
            "sku": "TK-1",
            "title": "Kettle",
            "selling_price": 349,
            "rrp": 499,
            "leadtime_stock": [
                {"merchant_warehouse": {"warehouse_id": 1}, "quantity_available": 4},
                {"merchant_warehouse": {"warehouse_id": 2}, "quantity_available": 3}
            ],
            "status": "Buyable",
            "barcode": "6001234567890",
            "offer_url": "https://www.takealot.com/x/PLID1"
        }))
        .expect("offer");

        let product = convert_offer(offer);
        assert_eq!(product.id, "9001");
        assert_eq!(product.sku, "TK-1");
        assert_eq!(product.price.amount, Decimal::from(349));
        assert_eq!(product.compare_at_price.map(|p| p.amount), Some(Decimal::from(499)));
        assert_eq!(product.stock_level, 7);
        assert_eq!(product.status, ProductStatus::Active);
    }

    #[test]
    fn test_product_status() {
        assert_eq!(product_status(Some("Not Buyable")), ProductStatus::Inactive);
        assert_eq!(product_status(Some("Disabled by Seller")), ProductStatus::Inactive);
        assert_eq!(product_status(None), ProductStatus::Unknown);
    }

    #[test]
    fn test_group_sales() {
        let sales: Vec<Sale> = serde_json::from_value(json!([
            {"order_id": 1, "sku": "A", "product_title": "A", "quantity": 2,
             "selling_price": 100, "order_date": "2024-03-01 10:00:00",
             "sale_status": "Shipped to Customer", "customer": "Thandi"},
            {"order_id": 2, "sku": "B", "quantity": 1, "selling_price": 50},
            {"order_id": 1, "sku": "C", "quantity": 1, "selling_price": 25.5}
        ]))
        .expect("sales");

        let orders = group_sales(sales);
        assert_eq!(orders.len(), 2);

        let first = orders.first().expect("first order");
        assert_eq!(first.id.as_str(), "1");
        assert_eq!(first.line_items.len(), 2);
        assert_eq!(first.total.amount, Decimal::new(2255, 1));
        assert_eq!(first.status, OrderStatus::Shipped);
        assert!(first.created_at.is_some());
    }

    #[test]
    fn test_since_filter() {
        let since = "2024-03-05T14:00:00Z".parse().expect("date");
        assert_eq!(since_filter(since), "start_date:2024-03-05");
    }

    #[test]
    fn test_authorize_uses_key_scheme() {
        let adapter = TakealotAdapter::new();
        let credentials = ConnectorCredentials::new(
            fluxori_core::OrganizationId::new("org"),
            Marketplace::Takealot,
        )
        .with_api_key("abc123");

        let request = adapter.authorize(&credentials, adapter.health_check(&credentials));
        assert_eq!(request.header_value("Authorization"), Some("Key abc123"));
        assert_eq!(request.url, "https://seller-api.takealot.com/v2/offers/count");
    }
}
