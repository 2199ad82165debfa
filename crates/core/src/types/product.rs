//! Common product schema and product write requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::price::Price;

/// Listing status of a product on a marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Inactive,
    Draft,
    #[default]
    Unknown,
}

/// A product as listed on a marketplace, mapped to the common schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceProduct {
    /// Marketplace-assigned product/offer id.
    pub id: String,
    pub sku: String,
    pub title: String,
    pub description: Option<String>,
    pub price: Price,
    /// Recommended retail / "was" price.
    pub compare_at_price: Option<Price>,
    pub stock_level: i64,
    pub status: ProductStatus,
    pub barcode: Option<String>,
    pub marketplace_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A stock level to push for one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdate {
    pub sku: String,
    pub quantity: i64,
    /// Marketplace warehouse/location, when the marketplace tracks several.
    #[serde(default)]
    pub location_id: Option<String>,
}

impl StockUpdate {
    /// Create a stock update without a location.
    #[must_use]
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            location_id: None,
        }
    }

    /// Reason this update cannot be sent, if any.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.sku.trim().is_empty() {
            Some("sku must not be empty".to_string())
        } else if self.quantity < 0 {
            Some(format!("quantity must not be negative (got {})", self.quantity))
        } else {
            None
        }
    }
}

/// A price to push for one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub sku: String,
    pub price: Price,
    #[serde(default)]
    pub compare_at_price: Option<Price>,
}

impl PriceUpdate {
    /// Create a price update without a compare-at price.
    #[must_use]
    pub fn new(sku: impl Into<String>, price: Price) -> Self {
        Self {
            sku: sku.into(),
            price,
            compare_at_price: None,
        }
    }

    /// Reason this update cannot be sent, if any.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.sku.trim().is_empty() {
            Some("sku must not be empty".to_string())
        } else if !self.price.is_positive() {
            Some(format!("price must be positive (got {})", self.price.amount))
        } else {
            None
        }
    }
}
