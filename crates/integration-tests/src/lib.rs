//! Shared fixtures for Fluxori integration tests.
//!
//! Every test talks to a scripted [`MockTransport`]; nothing reaches a real
//! marketplace.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fluxori-integration-tests
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use fluxori_api::state::AppState;
use fluxori_connectors::testing::MockTransport;
use fluxori_connectors::{
    ConnectorFactory, ConnectorRegistry, ConnectorSettings, RateLimit, Transport,
};
use fluxori_core::{ConnectorCredentials, Marketplace, OrganizationId};
use secrecy::SecretString;

/// Token the test router expects.
pub const API_TOKEN: &str = "t0k3n-Qx9vLm2Rb7Kp4Wz8Hs5Nd1Fj6Gc3Ya";

pub const ORG: &str = "org-test";

/// Settings with short, deterministic delays.
///
/// - 3 failures open the circuit, 30s cooldown
/// - 1 retry, 100ms backoff without jitter, 5s cap (room for `Retry-After`)
/// - no cache, throttle wide open
#[must_use]
pub fn fast_settings() -> ConnectorSettings {
    let mut settings = ConnectorSettings::default()
        .with_failure_threshold(3)
        .with_cooldown(Duration::from_secs(30))
        .with_max_retries(1)
        .with_cache_ttl(Duration::ZERO);
    if let Some(limit) = RateLimit::new(1_000, 1_000) {
        settings = settings.with_rate_limit(limit);
    }
    settings.retry.initial_backoff = Duration::from_millis(100);
    settings.retry.max_backoff = Duration::from_secs(5);
    settings.retry.jitter = false;
    settings
}

/// A registry whose connectors all use `transport`.
#[must_use]
pub fn registry(transport: &Arc<MockTransport>, settings: ConnectorSettings) -> ConnectorRegistry {
    let transport: Arc<dyn Transport> = Arc::clone(transport) as Arc<dyn Transport>;
    ConnectorRegistry::new(ConnectorFactory::new(settings, transport))
}

/// The API router over a registry backed by `transport`.
#[must_use]
pub fn api(transport: &Arc<MockTransport>) -> (Router, AppState) {
    let state = AppState::new(
        SecretString::from(API_TOKEN),
        registry(transport, fast_settings()),
    );
    (fluxori_api::app(state.clone()), state)
}

#[must_use]
pub fn takealot_credentials() -> ConnectorCredentials {
    ConnectorCredentials::new(OrganizationId::new(ORG), Marketplace::Takealot)
        .with_api_key("tk-9f8e7d6c5b4a")
        .with_merchant_warehouse_id("1027")
}

#[must_use]
pub fn wantitall_credentials() -> ConnectorCredentials {
    ConnectorCredentials::new(OrganizationId::new(ORG), Marketplace::Wantitall)
        .with_api_key("wa-1a2b3c4d5e6f")
        .with_seller_id("S-100")
}

#[must_use]
pub fn woocommerce_credentials() -> ConnectorCredentials {
    ConnectorCredentials::new(OrganizationId::new(ORG), Marketplace::WooCommerce)
        .with_api_key("ck_live_7h6g5f")
        .with_api_secret("cs_live_4e3d2c")
        .with_store_url("https://shop.example.co.za")
}
