//! Core types for Fluxori connectors.
//!
//! This module provides type-safe wrappers for the common marketplace schema.

pub mod credential;
pub mod error_code;
pub mod id;
pub mod marketplace;
pub mod order;
pub mod price;
pub mod product;
pub mod result;
pub mod status;

pub use credential::{AccessToken, ConnectorCredentials, CredentialField};
pub use error_code::ErrorCode;
pub use id::*;
pub use marketplace::{Marketplace, MarketplaceParseError};
pub use order::{MarketplaceOrder, OrderAcknowledgment, OrderLineItem, OrderStatus};
pub use price::{CurrencyCode, Price};
pub use product::{MarketplaceProduct, PriceUpdate, ProductStatus, StockUpdate};
pub use result::{BatchOutcome, ItemFailure, OperationResult, PaginatedResponse, PaginationOptions};
pub use status::*;
