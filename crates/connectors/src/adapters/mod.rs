//! Marketplace adapters.
//!
//! Each adapter maps one marketplace's REST payloads onto the common schema.
//! Wire types are private to their adapter module.

pub mod takealot;
pub mod wantitall;
pub mod woocommerce;

pub use takealot::TakealotAdapter;
pub use wantitall::WantitallAdapter;
pub use woocommerce::WooCommerceAdapter;

use chrono::{DateTime, NaiveDateTime, Utc};
use fluxori_core::ErrorCode;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};

/// Timestamp formats seen across marketplace payloads, all assumed UTC
/// when no offset is given.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d %b %Y %H:%M:%S",
];

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a money string; blank means absent.
pub(crate) fn parse_amount(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        value.parse().ok()
    }
}

/// Secret value, or empty when absent.
pub(crate) fn expose(secret: Option<&SecretString>) -> &str {
    secret.map_or("", ExposeSecret::expose_secret)
}

/// Map a marketplace's per-item error code onto ours.
pub(crate) fn item_error_code(marketplace_code: &str) -> ErrorCode {
    let code = marketplace_code.to_ascii_lowercase();
    if code.contains("not_found") || code.contains("invalid_id") || code.contains("unknown_sku") {
        ErrorCode::NotFound
    } else if code.contains("invalid") || code.contains("validation") {
        ErrorCode::ValidationError
    } else if code.contains("rate") {
        ErrorCode::RateLimitExceeded
    } else {
        ErrorCode::UnknownError
    }
}
