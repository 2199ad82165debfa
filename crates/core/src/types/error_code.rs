//! Fixed set of error codes surfaced by connector operations.

use serde::{Deserialize, Serialize};

/// Error code attached to failed operations and failed batch items.
///
/// Serialized as `SCREAMING_SNAKE_CASE` (`RATE_LIMIT_EXCEEDED`, ...), the
/// form the dashboard switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Classification of transport and HTTP failures.
    AuthError,
    RateLimitExceeded,
    NetworkError,
    TimeoutError,
    ValidationError,
    NotFound,
    LoadSheddingError,
    UnknownError,

    // Lifecycle.
    NotInitialized,
    ConnectorClosed,
    CircuitOpen,

    // Operation-level codes.
    ProductFetchError,
    ProductNotFound,
    OrderFetchError,
    OrderNotFound,
    StockUpdateFailed,
    PriceUpdateFailed,
    OrderAcknowledgeFailed,
}

impl ErrorCode {
    /// The wire form of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthError => "AUTH_ERROR",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::LoadSheddingError => "LOAD_SHEDDING_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::ConnectorClosed => "CONNECTOR_CLOSED",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::ProductFetchError => "PRODUCT_FETCH_ERROR",
            Self::ProductNotFound => "PRODUCT_NOT_FOUND",
            Self::OrderFetchError => "ORDER_FETCH_ERROR",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::StockUpdateFailed => "STOCK_UPDATE_FAILED",
            Self::PriceUpdateFailed => "PRICE_UPDATE_FAILED",
            Self::OrderAcknowledgeFailed => "ORDER_ACKNOWLEDGE_FAILED",
        }
    }

    /// Codes that describe the connector's own state rather than the
    /// outcome of talking to the marketplace. Operations pass these through
    /// unchanged instead of folding them into an operation code.
    #[must_use]
    pub const fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::NotInitialized | Self::ConnectorClosed | Self::CircuitOpen
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
