//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `API_TOKEN` - Bearer token API clients must present (high entropy)
//!
//! ## Optional
//! - `API_HOST` - Bind address (default: 127.0.0.1)
//! - `API_PORT` - Listen port (default: 3002)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 0.1)
//!
//! ## Optional (connector tuning)
//! - `CONNECTOR_FAILURE_THRESHOLD` - Failures before the circuit opens, 1-1000 (default: 5)
//! - `CONNECTOR_COOLDOWN_SECS` - Open-circuit cooldown, 1-86400 (default: 60)
//! - `CONNECTOR_MAX_RETRIES` - Retries per request, 0-10 (default: 3)
//! - `CONNECTOR_TIMEOUT_SECS` - Request timeout, 1-600 (default: 30)
//! - `CONNECTOR_CACHE_TTL_SECS` - Product cache TTL, 0-86400, 0 disables (default: 300)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use fluxori_connectors::ConnectorSettings;
use secrecy::SecretString;
use thiserror::Error;

const MIN_API_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const FAILURE_THRESHOLD_RANGE: RangeInclusive<u32> = 1..=1_000;
const COOLDOWN_SECS_RANGE: RangeInclusive<u64> = 1..=86_400;
const MAX_RETRIES_RANGE: RangeInclusive<u32> = 0..=10;
const TIMEOUT_SECS_RANGE: RangeInclusive<u64> = 1..=600;
const CACHE_TTL_SECS_RANGE: RangeInclusive<u64> = 0..=86_400;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API service configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token required on connector routes
    pub api_token: SecretString,
    /// Resilience settings for every connector
    pub connector: ConnectorSettings,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_token", &"[REDACTED]")
            .field("connector", &self.connector)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .field("sentry_traces_sample_rate", &self.sentry_traces_sample_rate)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host: IpAddr = parse_env_or_default("API_HOST", "127.0.0.1")?;
        let port: u16 = parse_env_or_default("API_PORT", "3002")?;

        let api_token = get_required_env("API_TOKEN")?;
        validate_api_token(&api_token, "API_TOKEN")?;

        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);

        Ok(Self {
            host,
            port,
            api_token: SecretString::from(api_token),
            connector: connector_settings_from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Connector tuning from `CONNECTOR_*` variables.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for values that don't parse or
/// fall outside their allowed range.
pub fn connector_settings_from_env() -> Result<ConnectorSettings, ConfigError> {
    let defaults = ConnectorSettings::default();

    let failure_threshold = parse_env_or(
        "CONNECTOR_FAILURE_THRESHOLD",
        defaults.breaker.failure_threshold,
    )?;
    check_range("CONNECTOR_FAILURE_THRESHOLD", failure_threshold, &FAILURE_THRESHOLD_RANGE)?;
    let cooldown = parse_env_or("CONNECTOR_COOLDOWN_SECS", defaults.breaker.cooldown.as_secs())?;
    check_range("CONNECTOR_COOLDOWN_SECS", cooldown, &COOLDOWN_SECS_RANGE)?;
    let max_retries = parse_env_or("CONNECTOR_MAX_RETRIES", defaults.retry.max_retries)?;
    check_range("CONNECTOR_MAX_RETRIES", max_retries, &MAX_RETRIES_RANGE)?;
    let timeout = parse_env_or("CONNECTOR_TIMEOUT_SECS", defaults.request_timeout.as_secs())?;
    check_range("CONNECTOR_TIMEOUT_SECS", timeout, &TIMEOUT_SECS_RANGE)?;
    let cache_ttl = parse_env_or("CONNECTOR_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;
    check_range("CONNECTOR_CACHE_TTL_SECS", cache_ttl, &CACHE_TTL_SECS_RANGE)?;

    Ok(defaults
        .with_failure_threshold(failure_threshold)
        .with_cooldown(Duration::from_secs(cooldown))
        .with_max_retries(max_retries)
        .with_timeout(Duration::from_secs(timeout))
        .with_cache_ttl(Duration::from_secs(cache_ttl)))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an optional environment variable, falling back to a typed default.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Reject values outside `range`.
fn check_range<T>(key: &str, value: T, range: &RangeInclusive<T>) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!(
                "{value} is outside {}..={}",
                range.start(),
                range.end()
            ),
        ))
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that the API token is long, not a placeholder, and has
/// sufficient entropy.
fn validate_api_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    if token.len() < MIN_API_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_API_TOKEN_LENGTH} characters (got {})",
                token.len()
            ),
        ));
    }

    let lower = token.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(token);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}
