//! Connection, network and lifecycle status types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Quality of a single connection probe.
///
/// Ordered from best to worst so comparisons read naturally
/// (`quality >= ConnectionQuality::Poor` means "poor or worse").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl ConnectionQuality {
    /// Classify a round-trip latency.
    #[must_use]
    pub const fn from_latency_ms(latency_ms: u64) -> Self {
        match latency_ms {
            0..300 => Self::Excellent,
            300..800 => Self::Good,
            800..2000 => Self::Fair,
            2000..5000 => Self::Poor,
            _ => Self::Critical,
        }
    }

    /// One step worse, saturating at `Critical`.
    #[must_use]
    pub const fn degrade(self) -> Self {
        match self {
            Self::Excellent => Self::Good,
            Self::Good => Self::Fair,
            Self::Fair => Self::Poor,
            Self::Poor | Self::Critical => Self::Critical,
        }
    }
}

impl std::fmt::Display for ConnectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Result of a connection test. Recomputed on every health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    pub quality: ConnectionQuality,
    pub message: String,
    /// Probe round-trip time, when a response was received.
    pub latency_ms: Option<u64>,
    pub last_checked: DateTime<Utc>,
}

impl ConnectionStatus {
    /// A successful probe.
    #[must_use]
    pub fn connected(latency_ms: u64) -> Self {
        let quality = ConnectionQuality::from_latency_ms(latency_ms);
        Self {
            connected: true,
            quality,
            message: format!("connected ({quality}, {latency_ms}ms)"),
            latency_ms: Some(latency_ms),
            last_checked: Utc::now(),
        }
    }

    /// A failed probe.
    #[must_use]
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            connected: false,
            quality: ConnectionQuality::Critical,
            message: message.into(),
            latency_ms: None,
            last_checked: Utc::now(),
        }
    }
}

/// Aggregated network quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
    Offline,
}

impl From<ConnectionQuality> for NetworkQuality {
    fn from(quality: ConnectionQuality) -> Self {
        match quality {
            ConnectionQuality::Excellent => Self::Excellent,
            ConnectionQuality::Good => Self::Good,
            ConnectionQuality::Fair => Self::Fair,
            ConnectionQuality::Poor => Self::Poor,
            ConnectionQuality::Critical => Self::Critical,
        }
    }
}

impl std::fmt::Display for NetworkQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
            Self::Critical => write!(f, "critical"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// Advisory network estimate used to tune retries and batch sizes.
///
/// Never authoritative: it is derived from the connector's own recent
/// request outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub quality: NetworkQuality,
    /// Median latency of recent successful requests.
    pub latency_ms: Option<u64>,
    /// Fraction of recent requests that failed at the transport level (0.0 to 1.0).
    pub packet_loss: f64,
    /// Failure pattern matches a power outage (load shedding).
    pub possible_load_shedding: bool,
    pub consecutive_failures: u32,
    pub sample_count: usize,
    pub last_checked: DateTime<Utc>,
}

impl NetworkStatus {
    /// Status before any request has been observed.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            quality: NetworkQuality::Good,
            latency_ms: None,
            packet_loss: 0.0,
            possible_load_shedding: false,
            consecutive_failures: 0,
            sample_count: 0,
            last_checked: Utc::now(),
        }
    }

    /// Whether conditions are bad enough to shrink batches and defer work.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.possible_load_shedding || self.quality >= NetworkQuality::Poor
    }
}

/// Connector lifecycle.
///
/// ```text
/// Uninitialized -> Initializing -> Ready <-> Degraded -> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    /// Circuit open after repeated failures.
    Degraded,
    Closed,
}

impl ConnectorState {
    /// Whether operations may be attempted in this state.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(self, Self::Ready | Self::Degraded)
    }
}

impl std::fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
            Self::Degraded => write!(f, "degraded"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
