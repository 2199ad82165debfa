//! Common order schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::OrderId;
use super::price::Price;

/// Order status normalized across marketplaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    #[default]
    Unknown,
}

impl OrderStatus {
    /// Map a marketplace status string onto the common set.
    ///
    /// Matching is case-insensitive and tolerant of the different words each
    /// marketplace uses for the same state.
    #[must_use]
    pub fn from_marketplace(status: &str) -> Self {
        let normalized = status.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" | "pending_payment" | "new" | "on_hold" | "accepted" => Self::Pending,
            "processing" | "preparing" | "ready_to_ship" | "inbound" => Self::Processing,
            "shipped" | "dispatched" | "shipped_to_customer" | "in_transit" => Self::Shipped,
            "delivered" | "completed" | "complete" => Self::Delivered,
            "cancelled" | "canceled" | "failed" | "cancelled_by_customer" => Self::Cancelled,
            "returned" | "refunded" | "returned_to_seller" => Self::Returned,
            _ => Self::Unknown,
        }
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub sku: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: Price,
}

/// An order placed on a marketplace, mapped to the common schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceOrder {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub customer_name: Option<String>,
    pub line_items: Vec<OrderLineItem>,
    pub total: Price,
}

/// Outcome of acknowledging an order with the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAcknowledgment {
    pub order_id: OrderId,
    pub acknowledged: bool,
    pub marketplace_reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(OrderStatus::from_marketplace("Shipped to Customer"), OrderStatus::Shipped);
        assert_eq!(OrderStatus::from_marketplace("on-hold"), OrderStatus::Pending);
        assert_eq!(OrderStatus::from_marketplace("completed"), OrderStatus::Delivered);
        assert_eq!(OrderStatus::from_marketplace("Canceled"), OrderStatus::Cancelled);
        assert_eq!(OrderStatus::from_marketplace("refunded"), OrderStatus::Returned);
        assert_eq!(OrderStatus::from_marketplace("teleported"), OrderStatus::Unknown);
    }
}
