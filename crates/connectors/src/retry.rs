//! Retry policy with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use fluxori_core::NetworkStatus;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::ConnectorError;
use crate::network::NetworkAdvice;

/// How failed attempts are retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Randomize each delay between half and the full backoff.
    pub jitter: bool,
    /// Timeout for a single attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retries(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry` (0-based), without jitter.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_backoff.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_backoff)
    }

    /// Delay before retry number `retry` after `error`.
    ///
    /// Rate limiting waits at least the marketplace's `Retry-After`, capped
    /// at `max_backoff`.
    #[must_use]
    pub fn delay_for(&self, retry: u32, error: &ConnectorError) -> Duration {
        let mut delay = self.backoff(retry);
        if self.jitter && !delay.is_zero() {
            let half = delay / 2;
            let spread = u64::try_from(half.as_millis()).unwrap_or(u64::MAX);
            delay = half + Duration::from_millis(rand::rng().random_range(0..=spread));
        }
        if let ConnectorError::RateLimited { retry_after } = error {
            delay = delay.max(Duration::from_secs(*retry_after));
        }
        delay.min(self.max_backoff)
    }

    /// Tune the policy to current network conditions.
    ///
    /// Load shedding doubles retries and attempt timeout and stretches
    /// backoff by half; poor or critical quality adds half again as many
    /// retries and stretches backoff by a fifth.
    #[must_use]
    pub fn adapted_to(&self, status: &NetworkStatus) -> Self {
        let (retries, backoff, timeout) = if status.possible_load_shedding {
            (2.0, 1.5, 2.0)
        } else if status.should_defer_non_critical() {
            (1.5, 1.2, 1.0)
        } else {
            return self.clone();
        };

        Self {
            max_retries: scale_count(self.max_retries, retries),
            initial_backoff: scale_duration(self.initial_backoff, backoff),
            max_backoff: scale_duration(self.max_backoff, backoff),
            multiplier: self.multiplier,
            jitter: self.jitter,
            attempt_timeout: scale_duration(self.attempt_timeout, timeout),
        }
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error,
    /// or retries are exhausted.
    ///
    /// The closure receives the 0-based attempt number. Each attempt is
    /// bounded by `attempt_timeout`.
    ///
    /// # Errors
    ///
    /// Returns the last error seen.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, ConnectorError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ConnectorError>>,
    {
        let mut retry = 0;
        loop {
            let outcome = tokio::time::timeout(self.attempt_timeout, attempt(retry))
                .await
                .unwrap_or_else(|_| {
                    Err(ConnectorError::Timeout(format!(
                        "attempt exceeded {}s",
                        self.attempt_timeout.as_secs()
                    )))
                });

            match outcome {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && retry < self.max_retries => {
                    let delay = self.delay_for(retry, &error);
                    debug!(
                        attempt = retry + 1,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(error) => {
                    if retry > 0 {
                        warn!(attempts = retry + 1, error = %error, "Giving up after retries");
                    }
                    return Err(error);
                }
            }
        }
    }
}

/// Saturates at `Duration::MAX` instead of panicking on overflow.
fn scale_duration(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale_count(count: u32, factor: f64) -> u32 {
    (f64::from(count) * factor).ceil() as u32
}
