//! Per-marketplace field mapping.
//!
//! A [`MarketplaceAdapter`] knows one marketplace's endpoints, auth scheme and
//! payload shapes. It never sends requests itself: every call goes through
//! the [`ApiClient`] it is handed, which routes through the connector's
//! retry, circuit breaker and network monitor.

use async_trait::async_trait;
use fluxori_core::{
    AccessToken, BatchOutcome, ConnectorCredentials, CredentialField, Marketplace,
    MarketplaceOrder, MarketplaceProduct, OrderAcknowledgment, OrderId, PaginatedResponse,
    PaginationOptions, PriceUpdate, StockUpdate,
};
use serde::de::DeserializeOwned;

use crate::error::ConnectorError;
use crate::rate_limit::RateLimit;
use crate::transport::{HttpRequest, HttpResponse};

/// One page of products.
pub type ProductPage = PaginatedResponse<MarketplaceProduct>;

/// One page of orders.
pub type OrderPage = PaginatedResponse<MarketplaceOrder>;

/// The resilient request path an [`ApiClient`] forwards to.
#[async_trait]
pub(crate) trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ConnectorError>;
}

/// Handle adapters use to talk to their marketplace.
pub struct ApiClient<'a> {
    executor: &'a dyn RequestExecutor,
    credentials: ConnectorCredentials,
}

impl<'a> ApiClient<'a> {
    pub(crate) const fn new(
        executor: &'a dyn RequestExecutor,
        credentials: ConnectorCredentials,
    ) -> Self {
        Self {
            executor,
            credentials,
        }
    }

    /// Credentials the connector was initialized with.
    #[must_use]
    pub const fn credentials(&self) -> &ConnectorCredentials {
        &self.credentials
    }

    /// Send a request and return the successful response.
    ///
    /// # Errors
    ///
    /// Returns the classified error for transport failures and non-2xx
    /// responses that survived retries.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ConnectorError> {
        self.executor.execute(request).await
    }

    /// Send a request and deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// As [`ApiClient::send`], plus `ConnectorError::Parse` for unexpected
    /// bodies.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> Result<T, ConnectorError> {
        self.send(request).await?.json()
    }
}

/// Marketplace-specific behavior plugged into a connector.
///
/// Operation methods return `Err` only for failures that affect the whole
/// call; batch writes report per-item failures in the returned
/// [`BatchOutcome`].
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync + 'static {
    fn marketplace(&self) -> Marketplace;

    /// Credential fields that must be present before initialization.
    fn required_fields(&self) -> &'static [CredentialField];

    /// Validate credentials beyond presence (URL syntax and the like).
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` for unusable credentials.
    fn prepare(&self, _credentials: &ConnectorCredentials) -> Result<(), ConnectorError> {
        Ok(())
    }

    /// Add authentication to a request.
    fn authorize(&self, credentials: &ConnectorCredentials, request: HttpRequest) -> HttpRequest;

    /// Cheapest authenticated request that proves connectivity.
    fn health_check(&self, credentials: &ConnectorCredentials) -> HttpRequest;

    /// Throttle applied when settings don't override it.
    fn default_rate_limit(&self) -> Option<RateLimit> {
        None
    }

    /// Largest batch the marketplace accepts in one write.
    fn max_batch_size(&self) -> usize {
        50
    }

    fn supports_token_refresh(&self) -> bool {
        false
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh_token(&self, _api: &ApiClient<'_>) -> Result<AccessToken, ConnectorError> {
        Err(ConnectorError::Unsupported(format!(
            "{} does not support token refresh",
            self.marketplace().display_name()
        )))
    }

    async fn fetch_products(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<ProductPage, ConnectorError>;

    /// Look up one product; `ConnectorError::NotFound` if the SKU is unknown.
    async fn fetch_product(
        &self,
        api: &ApiClient<'_>,
        sku: &str,
    ) -> Result<MarketplaceProduct, ConnectorError>;

    async fn fetch_orders(
        &self,
        api: &ApiClient<'_>,
        options: &PaginationOptions,
    ) -> Result<OrderPage, ConnectorError>;

    /// Look up one order; `ConnectorError::NotFound` if the id is unknown.
    async fn fetch_order(
        &self,
        api: &ApiClient<'_>,
        order_id: &OrderId,
    ) -> Result<MarketplaceOrder, ConnectorError>;

    /// Push one chunk of already-validated stock updates.
    async fn push_stock(
        &self,
        api: &ApiClient<'_>,
        updates: &[StockUpdate],
    ) -> Result<BatchOutcome<StockUpdate>, ConnectorError>;

    /// Push one chunk of already-validated price updates.
    async fn push_prices(
        &self,
        api: &ApiClient<'_>,
        updates: &[PriceUpdate],
    ) -> Result<BatchOutcome<PriceUpdate>, ConnectorError>;

    async fn acknowledge(
        &self,
        api: &ApiClient<'_>,
        order_id: &OrderId,
    ) -> Result<OrderAcknowledgment, ConnectorError>;
}
