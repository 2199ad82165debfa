//! Marketplace operation façade.
//!
//! Every operation follows the same shape: check lifecycle, check the
//! circuit, delegate to the adapter, and fold any error into an
//! [`OperationResult`] with a stable code. Operations never return `Err`.

use std::sync::Arc;

use async_trait::async_trait;
use fluxori_core::{
    BatchOutcome, ConnectionStatus, ConnectorCredentials, ConnectorState, ErrorCode, ItemFailure, Marketplace,
    MarketplaceOrder, MarketplaceProduct, NetworkStatus, OperationResult, OrderAcknowledgment,
    OrderId, PaginationOptions, PriceUpdate, StockUpdate,
};
use tracing::{info, instrument};

use crate::adapter::{MarketplaceAdapter, OrderPage, ProductPage};
use crate::base::BaseConnector;
use crate::cache::ProductCache;
use crate::error::ConnectorError;
use crate::network::NetworkAdvice;
use crate::settings::ConnectorSettings;
use crate::transport::Transport;

/// A connector to one marketplace for one organization.
#[async_trait]
pub trait Connector: Send + Sync {
    fn marketplace(&self) -> Marketplace;

    async fn state(&self) -> ConnectorState;

    /// Validate and store credentials without contacting the marketplace.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` naming any missing credential
    /// field, or `ConnectorError::Closed` after [`Connector::close`].
    async fn initialize(&self, credentials: ConnectorCredentials) -> Result<(), ConnectorError>;

    async fn test_connection(&self) -> ConnectionStatus;

    async fn check_network_status(&self) -> NetworkStatus;

    async fn refresh_connection(&self) -> ConnectionStatus;

    async fn close(&self);

    async fn get_products(&self, options: PaginationOptions) -> OperationResult<ProductPage>;

    async fn get_product_by_sku(&self, sku: &str) -> OperationResult<MarketplaceProduct>;

    async fn get_orders(&self, options: PaginationOptions) -> OperationResult<OrderPage>;

    async fn get_order_by_id(&self, order_id: &OrderId) -> OperationResult<MarketplaceOrder>;

    async fn update_stock(&self, updates: Vec<StockUpdate>) -> OperationResult<Vec<StockUpdate>>;

    async fn update_prices(&self, updates: Vec<PriceUpdate>) -> OperationResult<Vec<PriceUpdate>>;

    async fn acknowledge_order(&self, order_id: &OrderId) -> OperationResult<OrderAcknowledgment>;
}

/// [`Connector`] built from a [`BaseConnector`] and an adapter.
pub struct MarketplaceConnector<A: MarketplaceAdapter> {
    base: BaseConnector<A>,
    cache: ProductCache,
}

impl<A: MarketplaceAdapter> MarketplaceConnector<A> {
    #[must_use]
    pub fn new(adapter: A, transport: Arc<dyn Transport>, settings: &ConnectorSettings) -> Self {
        Self {
            base: BaseConnector::new(adapter, transport, settings),
            cache: ProductCache::new(settings.cache_ttl),
        }
    }

    #[must_use]
    pub const fn base(&self) -> &BaseConnector<A> {
        &self.base
    }

    async fn batch_size(&self) -> usize {
        let network = self.base.network().status().await;
        network.recommended_batch_size(self.base.adapter().max_batch_size())
    }
}

#[async_trait]
impl<A: MarketplaceAdapter> Connector for MarketplaceConnector<A> {
    fn marketplace(&self) -> Marketplace {
        self.base.marketplace()
    }

    async fn state(&self) -> ConnectorState {
        self.base.state().await
    }

    async fn initialize(&self, credentials: ConnectorCredentials) -> Result<(), ConnectorError> {
        self.base.initialize(credentials).await
    }

    async fn test_connection(&self) -> ConnectionStatus {
        self.base.test_connection().await
    }

    async fn check_network_status(&self) -> NetworkStatus {
        self.base.check_network_status().await
    }

    async fn refresh_connection(&self) -> ConnectionStatus {
        self.base.refresh_connection().await
    }

    async fn close(&self) {
        self.base.close().await;
        self.cache.invalidate_all().await;
    }

    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    async fn get_products(&self, options: PaginationOptions) -> OperationResult<ProductPage> {
        let options = options.normalized();
        if let Err(error) = self.base.ensure_ready().await {
            return failure(ErrorCode::ProductFetchError, &error);
        }

        // Checked before the breaker so cached pages outlive an open circuit.
        let network = self.base.network().status().await;
        if let Some(page) = self.cache.get(&options, network.possible_load_shedding).await {
            return OperationResult::success(page);
        }

        let api = match self.base.admit().await {
            Ok(api) => api,
            Err(error) => return failure(ErrorCode::ProductFetchError, &error),
        };

        match self.base.adapter().fetch_products(&api, &options).await {
            Ok(page) => {
                self.cache.insert(options, page.clone()).await;
                OperationResult::success(page)
            }
            Err(error) => failure(ErrorCode::ProductFetchError, &error),
        }
    }

    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    async fn get_product_by_sku(&self, sku: &str) -> OperationResult<MarketplaceProduct> {
        if sku.trim().is_empty() {
            return OperationResult::error(ErrorCode::ValidationError, "sku must not be empty");
        }
        let api = match self.base.admit().await {
            Ok(api) => api,
            Err(error) => return failure(ErrorCode::ProductFetchError, &error),
        };

        match self.base.adapter().fetch_product(&api, sku).await {
            Ok(product) => OperationResult::success(product),
            Err(ConnectorError::NotFound(_)) => OperationResult::error(
                ErrorCode::ProductNotFound,
                format!("product {sku} not found"),
            ),
            Err(error) => failure(ErrorCode::ProductFetchError, &error),
        }
    }

    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    async fn get_orders(&self, options: PaginationOptions) -> OperationResult<OrderPage> {
        let options = options.normalized();
        let api = match self.base.admit().await {
            Ok(api) => api,
            Err(error) => return failure(ErrorCode::OrderFetchError, &error),
        };

        match self.base.adapter().fetch_orders(&api, &options).await {
            Ok(page) => OperationResult::success(page),
            Err(error) => failure(ErrorCode::OrderFetchError, &error),
        }
    }

    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    async fn get_order_by_id(&self, order_id: &OrderId) -> OperationResult<MarketplaceOrder> {
        let api = match self.base.admit().await {
            Ok(api) => api,
            Err(error) => return failure(ErrorCode::OrderFetchError, &error),
        };

        match self.base.adapter().fetch_order(&api, order_id).await {
            Ok(order) => OperationResult::success(order),
            Err(ConnectorError::NotFound(_)) => OperationResult::error(
                ErrorCode::OrderNotFound,
                format!("order {order_id} not found"),
            ),
            Err(error) => failure(ErrorCode::OrderFetchError, &error),
        }
    }

    #[instrument(skip(self, updates), fields(marketplace = %self.marketplace(), count = updates.len()))]
    async fn update_stock(&self, updates: Vec<StockUpdate>) -> OperationResult<Vec<StockUpdate>> {
        let api = match self.base.admit().await {
            Ok(api) => api,
            Err(error) => return failure(ErrorCode::StockUpdateFailed, &error),
        };

        let (valid, mut outcome) = split_invalid(updates);
        let batch_size = self.batch_size().await;

        for chunk in valid.chunks(batch_size) {
            match self.base.adapter().push_stock(&api, chunk).await {
                Ok(result) => outcome.extend(result),
                Err(error) => fail_chunk(&mut outcome, chunk, &error),
            }
        }

        if !outcome.successful.is_empty() {
            self.cache.invalidate_all().await;
        }
        info!(
            succeeded = outcome.successful.len(),
            failed = outcome.failed.len(),
            batch_size,
            "Stock update finished"
        );
        outcome.into_result(ErrorCode::StockUpdateFailed)
    }

    #[instrument(skip(self, updates), fields(marketplace = %self.marketplace(), count = updates.len()))]
    async fn update_prices(&self, updates: Vec<PriceUpdate>) -> OperationResult<Vec<PriceUpdate>> {
        let api = match self.base.admit().await {
            Ok(api) => api,
            Err(error) => return failure(ErrorCode::PriceUpdateFailed, &error),
        };

        let (valid, mut outcome) = split_invalid(updates);
        let batch_size = self.batch_size().await;

        for chunk in valid.chunks(batch_size) {
            match self.base.adapter().push_prices(&api, chunk).await {
                Ok(result) => outcome.extend(result),
                Err(error) => fail_chunk(&mut outcome, chunk, &error),
            }
        }

        if !outcome.successful.is_empty() {
            self.cache.invalidate_all().await;
        }
        info!(
            succeeded = outcome.successful.len(),
            failed = outcome.failed.len(),
            batch_size,
            "Price update finished"
        );
        outcome.into_result(ErrorCode::PriceUpdateFailed)
    }

    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    async fn acknowledge_order(&self, order_id: &OrderId) -> OperationResult<OrderAcknowledgment> {
        let api = match self.base.admit().await {
            Ok(api) => api,
            Err(error) => return failure(ErrorCode::OrderAcknowledgeFailed, &error),
        };

        match self.base.adapter().acknowledge(&api, order_id).await {
            Ok(ack) => OperationResult::success(ack),
            Err(ConnectorError::NotFound(_)) => OperationResult::error(
                ErrorCode::OrderNotFound,
                format!("order {order_id} not found"),
            ),
            Err(error) => failure(ErrorCode::OrderAcknowledgeFailed, &error),
        }
    }
}

impl<A: MarketplaceAdapter> std::fmt::Debug for MarketplaceConnector<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceConnector")
            .field("base", &self.base)
            .field("cache", &self.cache)
            .finish()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Fold an error into the operation's result.
///
/// Lifecycle codes and unsupported operations keep their own code; anything
/// else is reported under the operation code with the classified code in
/// the message.
fn failure<T>(operation: ErrorCode, error: &ConnectorError) -> OperationResult<T> {
    let code = error.code();
    if code.is_lifecycle() || matches!(error, ConnectorError::Unsupported(_)) {
        OperationResult::error(code, error.to_string())
    } else {
        OperationResult::error(operation, format!("{code}: {error}"))
    }
}

/// An item of a batch write.
trait BatchItem {
    fn item_id(&self) -> &str;
    fn rejection(&self) -> Option<String>;
}

impl BatchItem for StockUpdate {
    fn item_id(&self) -> &str {
        &self.sku
    }

    fn rejection(&self) -> Option<String> {
        self.validate()
    }
}

impl BatchItem for PriceUpdate {
    fn item_id(&self) -> &str {
        &self.sku
    }

    fn rejection(&self) -> Option<String> {
        self.validate()
    }
}

/// Separate items that can be sent from those rejected locally.
fn split_invalid<T: BatchItem>(items: Vec<T>) -> (Vec<T>, BatchOutcome<T>) {
    let mut outcome = BatchOutcome::new();
    let mut valid = Vec::with_capacity(items.len());
    for item in items {
        match item.rejection() {
            Some(reason) => outcome.fail(ItemFailure::new(
                item.item_id(),
                ErrorCode::ValidationError,
                reason,
            )),
            None => valid.push(item),
        }
    }
    (valid, outcome)
}

/// Mark every item of a chunk failed with the chunk's error.
fn fail_chunk<T: BatchItem>(outcome: &mut BatchOutcome<T>, chunk: &[T], error: &ConnectorError) {
    for item in chunk {
        outcome.fail(ItemFailure::new(item.item_id(), error.code(), error.to_string()));
    }
}
