//! Rolling network-quality estimate and load-shedding detection.
//!
//! The monitor only sees the connector's own traffic: every request outcome
//! is recorded as a sample, and the aggregate drives retry tuning and batch
//! sizes. A burst of rapid failures across different endpoints is treated
//! as a likely power outage (load shedding) rather than one bad endpoint.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use chrono::Utc;
use fluxori_core::{ConnectionQuality, NetworkQuality, NetworkStatus};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Loss fraction at which the network is considered offline.
const OFFLINE_LOSS: f64 = 0.8;

/// Each full step of this much loss degrades quality by one level.
const LOSS_STEP: f64 = 0.2;

/// Network monitor tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkMonitorConfig {
    /// Samples kept for the rolling estimate.
    pub window_size: usize,
    /// Rapid failures needed to suspect load shedding; also the success
    /// streak that clears the suspicion.
    pub failure_threshold: u32,
    /// Maximum gap between failures for them to count as one burst.
    pub rapid_failure_gap: Duration,
    /// Suspicion is dropped once the last failure is this old.
    pub load_shedding_decay: Duration,
    /// Samples older than this are considered stale and worth a probe.
    pub stale_after: Duration,
}

impl Default for NetworkMonitorConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            failure_threshold: 5,
            rapid_failure_gap: Duration::from_secs(10),
            load_shedding_decay: Duration::from_secs(600),
            stale_after: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
struct Sample {
    at: Instant,
    latency: Option<Duration>,
    success: bool,
}

#[derive(Debug, Clone)]
struct Failure {
    at: Instant,
    endpoint: String,
}

#[derive(Debug, Default)]
struct MonitorState {
    samples: VecDeque<Sample>,
    failures: VecDeque<Failure>,
    consecutive_failures: u32,
    consecutive_successes: u32,
    load_shedding: bool,
}

/// Aggregates request outcomes into a [`NetworkStatus`].
#[derive(Debug)]
pub struct NetworkMonitor {
    config: NetworkMonitorConfig,
    state: Mutex<MonitorState>,
}

impl NetworkMonitor {
    #[must_use]
    pub fn new(config: NetworkMonitorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Record a request that got a response.
    pub async fn record_success(&self, latency: Duration) {
        let mut state = self.state.lock().await;
        self.push_sample(
            &mut state,
            Sample {
                at: Instant::now(),
                latency: Some(latency),
                success: true,
            },
        );
        state.consecutive_failures = 0;
        state.consecutive_successes += 1;

        if state.load_shedding && state.consecutive_successes >= self.config.failure_threshold {
            info!(
                successes = state.consecutive_successes,
                "Network recovered, clearing load shedding suspicion"
            );
            state.load_shedding = false;
        }
    }

    /// Record a request that failed below HTTP.
    ///
    /// Returns `true` if the failure pattern now suggests load shedding.
    pub async fn record_failure(&self, endpoint: &str) -> bool {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        self.push_sample(
            &mut state,
            Sample {
                at: now,
                latency: None,
                success: false,
            },
        );
        state.consecutive_failures += 1;
        state.consecutive_successes = 0;

        state.failures.push_back(Failure {
            at: now,
            endpoint: endpoint.to_string(),
        });
        while state.failures.len() > self.config.window_size {
            state.failures.pop_front();
        }

        if self.is_rapid_diverse_burst(&state.failures) {
            if !state.load_shedding {
                warn!(
                    failures = state.failures.len(),
                    consecutive_failures = state.consecutive_failures,
                    "Possible load shedding detected"
                );
            }
            state.load_shedding = true;
        }
        state.load_shedding
    }

    /// Current aggregate estimate.
    pub async fn status(&self) -> NetworkStatus {
        let mut state = self.state.lock().await;
        self.decay(&mut state);

        let sample_count = state.samples.len();
        if sample_count == 0 {
            return NetworkStatus {
                possible_load_shedding: state.load_shedding,
                ..NetworkStatus::unknown()
            };
        }

        let failures = state.samples.iter().filter(|s| !s.success).count();
        #[allow(clippy::cast_precision_loss)]
        let packet_loss = failures as f64 / sample_count as f64;

        let mut latencies: Vec<Duration> =
            state.samples.iter().filter_map(|s| s.latency).collect();
        latencies.sort_unstable();
        let latency_ms = latencies
            .get(latencies.len() / 2)
            .map(|median| u64::try_from(median.as_millis()).unwrap_or(u64::MAX));

        NetworkStatus {
            quality: classify(packet_loss, latency_ms, state.load_shedding),
            latency_ms,
            packet_loss,
            possible_load_shedding: state.load_shedding,
            consecutive_failures: state.consecutive_failures,
            sample_count,
            last_checked: Utc::now(),
        }
    }

    /// Whether there is no sample newer than `stale_after`.
    pub async fn is_stale(&self) -> bool {
        let state = self.state.lock().await;
        state
            .samples
            .back()
            .is_none_or(|sample| sample.at.elapsed() > self.config.stale_after)
    }

    /// Forget all samples.
    pub async fn reset(&self) {
        *self.state.lock().await = MonitorState::default();
    }

    fn push_sample(&self, state: &mut MonitorState, sample: Sample) {
        state.samples.push_back(sample);
        while state.samples.len() > self.config.window_size {
            state.samples.pop_front();
        }
    }

    /// The last `failure_threshold` failures each followed the previous one
    /// within `rapid_failure_gap` and hit at least two endpoints.
    fn is_rapid_diverse_burst(&self, failures: &VecDeque<Failure>) -> bool {
        let threshold = self.config.failure_threshold as usize;
        if threshold == 0 || failures.len() < threshold {
            return false;
        }
        let recent: Vec<&Failure> = failures.iter().skip(failures.len() - threshold).collect();

        let rapid = recent
            .windows(2)
            .all(|pair| match pair {
                [earlier, later] => later.at.duration_since(earlier.at) < self.config.rapid_failure_gap,
                _ => true,
            });
        let endpoints: HashSet<&str> = recent.iter().map(|f| f.endpoint.as_str()).collect();

        rapid && endpoints.len() >= 2
    }

    fn decay(&self, state: &mut MonitorState) {
        if !state.load_shedding {
            return;
        }
        let expired = state
            .failures
            .back()
            .is_none_or(|last| last.at.elapsed() >= self.config.load_shedding_decay);
        if expired {
            info!("No recent failures, clearing load shedding suspicion");
            state.load_shedding = false;
        }
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkMonitorConfig::default())
    }
}

/// Quality from loss and median latency.
fn classify(packet_loss: f64, latency_ms: Option<u64>, load_shedding: bool) -> NetworkQuality {
    if packet_loss >= OFFLINE_LOSS {
        return NetworkQuality::Offline;
    }

    let mut quality = latency_ms.map_or(ConnectionQuality::Critical, ConnectionQuality::from_latency_ms);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (packet_loss / LOSS_STEP + f64::EPSILON).floor() as u32;
    for _ in 0..steps {
        quality = quality.degrade();
    }

    let quality = NetworkQuality::from(quality);
    if load_shedding {
        quality.max(NetworkQuality::Poor)
    } else {
        quality
    }
}

/// Advice derived from a [`NetworkStatus`].
pub trait NetworkAdvice {
    /// Batch size to use instead of `base` under current conditions.
    /// Never zero.
    fn recommended_batch_size(&self, base: usize) -> usize;

    /// Whether non-critical calls (refreshes, prefetches) should wait.
    fn should_defer_non_critical(&self) -> bool;
}

impl NetworkAdvice for NetworkStatus {
    fn recommended_batch_size(&self, base: usize) -> usize {
        let size = if self.possible_load_shedding {
            1
        } else {
            match self.quality {
                NetworkQuality::Excellent | NetworkQuality::Good => base,
                NetworkQuality::Fair => base / 2,
                NetworkQuality::Poor => base / 4,
                NetworkQuality::Critical | NetworkQuality::Offline => 1,
            }
        };
        size.max(1)
    }

    fn should_defer_non_critical(&self) -> bool {
        self.possible_load_shedding || self.quality >= NetworkQuality::Poor
    }
}
