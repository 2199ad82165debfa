//! Fluxori Connectors - Resilient marketplace connector layer.
//!
//! One [`Connector`] per organization per marketplace, each wrapping a
//! [`MarketplaceAdapter`] (endpoints, auth, payload mapping) in the shared
//! request path:
//!
//! ```text
//! lifecycle check -> circuit breaker -> rate limiter -> retry/backoff -> Transport
//!                                                            |
//!                                                    network monitor
//! ```
//!
//! Operations never return `Err`; every outcome, including partial batch
//! failures, comes back as an [`OperationResult`](fluxori_core::OperationResult).
//!
//! # Modules
//!
//! - [`transport`] - HTTP capability and the reqwest implementation
//! - [`retry`] - Exponential backoff with jitter
//! - [`circuit_breaker`] - Closed / open / half-open breaker
//! - [`network`] - Latency, loss and load-shedding heuristics
//! - [`base`] - Lifecycle, credentials and the resilient request path
//! - [`connector`] - Marketplace operation façade
//! - [`adapters`] - Takealot, Wantitall and WooCommerce mappings
//! - [`registry`] - Per-organization connector registry

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod adapter;
pub mod adapters;
pub mod base;
pub mod cache;
pub mod circuit_breaker;
pub mod connector;
pub mod error;
pub mod network;
pub mod rate_limit;
pub mod registry;
pub mod retry;
pub mod settings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use adapter::{ApiClient, MarketplaceAdapter, OrderPage, ProductPage};
pub use base::BaseConnector;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use connector::{Connector, MarketplaceConnector};
pub use error::ConnectorError;
pub use network::{NetworkAdvice, NetworkMonitor, NetworkMonitorConfig};
pub use rate_limit::{OutboundLimiter, RateLimit};
pub use registry::{ConnectorFactory, ConnectorRegistry, ConnectorSummary};
pub use retry::RetryPolicy;
pub use settings::ConnectorSettings;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
