//! Connector tuning shared by every connector a factory builds.

use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::network::NetworkMonitorConfig;
use crate::rate_limit::RateLimit;
use crate::retry::RetryPolicy;

/// Resilience settings for connectors.
///
/// Built by the API and CLI from environment variables; defaults suit
/// production use.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorSettings {
    pub breaker: CircuitBreakerConfig,
    pub retry: RetryPolicy,
    pub network: NetworkMonitorConfig,
    /// Overall timeout applied by the HTTP client.
    pub request_timeout: Duration,
    /// Base TTL of the product listing cache. Zero disables caching.
    pub cache_ttl: Duration,
    /// Replaces the marketplace's default throttle when set.
    pub rate_limit: Option<RateLimit>,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            breaker: CircuitBreakerConfig::default(),
            retry: RetryPolicy::default(),
            network: NetworkMonitorConfig::default(),
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(300),
            rate_limit: None,
        }
    }
}

impl ConnectorSettings {
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.breaker.failure_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.breaker.cooldown = cooldown;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.retry.max_retries = retries;
        self
    }

    /// Set both the client timeout and the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self.retry.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }
}
