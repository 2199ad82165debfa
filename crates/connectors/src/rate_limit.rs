//! Outbound request throttling.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Requests-per-second quota with a burst allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub per_second: NonZeroU32,
    pub burst: NonZeroU32,
}

impl RateLimit {
    /// Build a limit, returning `None` if either value is zero.
    #[must_use]
    pub fn new(per_second: u32, burst: u32) -> Option<Self> {
        Some(Self {
            per_second: NonZeroU32::new(per_second)?,
            burst: NonZeroU32::new(burst)?,
        })
    }
}

/// In-memory limiter shared by every request of one connector.
#[derive(Clone)]
pub struct OutboundLimiter {
    limit: RateLimit,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl OutboundLimiter {
    #[must_use]
    pub fn new(limit: RateLimit) -> Self {
        let quota = Quota::per_second(limit.per_second).allow_burst(limit.burst);
        Self {
            limit,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Wait for a permit.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a permit if one is available right now.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for OutboundLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundLimiter")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limits_rejected() {
        assert!(RateLimit::new(0, 5).is_none());
        assert!(RateLimit::new(1, 0).is_none());
        assert!(RateLimit::new(1, 5).is_some());
    }

    #[test]
    fn test_burst_then_throttle() {
        let limit = RateLimit::new(1, 3).expect("valid limit");
        let limiter = OutboundLimiter::new(limit);

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_acquire_within_burst_is_immediate() {
        let limiter = OutboundLimiter::new(RateLimit::new(10, 10).expect("valid limit"));
        for _ in 0..10 {
            limiter.acquire().await;
        }
    }
}
