//! Circuit breaker.
//!
//! - Closed: requests pass through; consecutive failures are counted.
//! - Open: requests fail immediately until the cooldown elapses.
//! - `HalfOpen`: one request at a time is let through to probe recovery;
//!   enough successes close the circuit, any failure reopens it.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::ConnectorError;

/// State of the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    /// Failing fast until `next_probe`.
    Open { next_probe: Instant },
    HalfOpen,
}

impl CircuitState {
    /// Short name for logs and status payloads.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open { .. } => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Consecutive half-open successes before the circuit closes.
    pub success_threshold: u32,
    /// Time spent open before letting a probe through.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            cooldown: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    /// When the in-flight half-open probe was admitted.
    probe_started: Option<Instant>,
}

impl BreakerState {
    /// Whether a new call may start now, or how long until one may.
    fn admission(&self, cooldown: Duration, now: Instant) -> Result<(), Duration> {
        match self.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open { next_probe } if now < next_probe => Err(next_probe - now),
            CircuitState::Open { .. } => Ok(()),
            // A probe that never reported back stops blocking after a cooldown.
            CircuitState::HalfOpen => match self.probe_started {
                Some(started) if now < started + cooldown => Err(started + cooldown - now),
                _ => Ok(()),
            },
        }
    }
}

/// Tracks consecutive failures for one connector.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                probe_started: None,
            }),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.state
    }

    pub async fn consecutive_failures(&self) -> u32 {
        self.state.lock().await.consecutive_failures
    }

    /// Whether a call would be admitted, without claiming the probe slot.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::CircuitOpen` while the circuit is open or a
    /// half-open probe is in flight.
    pub async fn check(&self) -> Result<(), ConnectorError> {
        let state = self.state.lock().await;
        state
            .admission(self.config.cooldown, Instant::now())
            .map_err(|retry_in| ConnectorError::CircuitOpen { retry_in })
    }

    /// Admit a call, moving Open to `HalfOpen` once the cooldown is over.
    ///
    /// While half-open only one call is admitted until it reports back.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::CircuitOpen` with the remaining wait while
    /// the circuit is open or a probe is in flight.
    pub async fn try_acquire(&self) -> Result<(), ConnectorError> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state
            .admission(self.config.cooldown, now)
            .map_err(|retry_in| ConnectorError::CircuitOpen { retry_in })?;

        match state.state {
            CircuitState::Closed => {}
            CircuitState::Open { .. } => {
                info!("Circuit half-open, probing marketplace");
                state.state = CircuitState::HalfOpen;
                state.consecutive_successes = 0;
                state.probe_started = Some(now);
            }
            CircuitState::HalfOpen => state.probe_started = Some(now),
        }
        Ok(())
    }

    /// Record a successful call. Returns the new state if it changed.
    pub async fn record_success(&self) -> Option<CircuitState> {
        let mut state = self.state.lock().await;
        match state.state {
            CircuitState::Closed => {
                state.consecutive_failures = 0;
                None
            }
            CircuitState::HalfOpen => {
                state.consecutive_successes += 1;
                state.probe_started = None;
                if state.consecutive_successes >= self.config.success_threshold {
                    info!("Circuit closed after successful probe");
                    state.state = CircuitState::Closed;
                    state.consecutive_failures = 0;
                    state.consecutive_successes = 0;
                    Some(CircuitState::Closed)
                } else {
                    None
                }
            }
            // A call admitted before the circuit opened finished late.
            CircuitState::Open { .. } => None,
        }
    }

    /// Record a failed call. Returns the new state if it changed.
    pub async fn record_failure(&self) -> Option<CircuitState> {
        let mut state = self.state.lock().await;
        match state.state {
            CircuitState::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        failures = state.consecutive_failures,
                        cooldown_secs = self.config.cooldown.as_secs(),
                        "Circuit opened"
                    );
                    state.state = CircuitState::Open {
                        next_probe: Instant::now() + self.config.cooldown,
                    };
                    Some(state.state)
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                warn!("Probe failed, circuit reopened");
                state.state = CircuitState::Open {
                    next_probe: Instant::now() + self.config.cooldown,
                };
                state.consecutive_successes = 0;
                state.probe_started = None;
                Some(state.state)
            }
            CircuitState::Open { .. } => None,
        }
    }

    /// Close the circuit and clear counters.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.consecutive_successes = 0;
        state.probe_started = None;
    }
}
