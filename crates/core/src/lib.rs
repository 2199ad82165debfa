//! Fluxori Core - Shared domain types for marketplace connectors.
//!
//! This crate provides the common schema every marketplace adapter maps into:
//! - `connectors` - Resilient marketplace connector layer
//! - `api` - HTTP surface over the per-organization connector registry
//! - `cli` - Command-line probe for a single connector
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps it
//! lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Ids, credentials, products, orders, statuses, error codes and
//!   operation results

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
