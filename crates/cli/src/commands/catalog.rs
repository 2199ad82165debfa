//! Product, order and stock commands.

use chrono::{DateTime, Utc};
use fluxori_connectors::Connector;
use fluxori_core::{PaginationOptions, StockUpdate};

use super::{CliError, report};

pub async fn products(connector: &dyn Connector, page: u32, page_size: u32) -> Result<(), CliError> {
    let result = connector
        .get_products(PaginationOptions::new(page, page_size))
        .await;
    report(&result)
}

pub async fn orders(
    connector: &dyn Connector,
    since: Option<DateTime<Utc>>,
    page: u32,
) -> Result<(), CliError> {
    let options = PaginationOptions {
        since,
        ..PaginationOptions::new(page, PaginationOptions::MAX_PAGE_SIZE)
    };
    report(&connector.get_orders(options).await)
}

/// Push one stock level. A rejected item prints its reason and fails.
pub async fn stock(connector: &dyn Connector, sku: String, quantity: i64) -> Result<(), CliError> {
    let result = connector
        .update_stock(vec![StockUpdate::new(sku, quantity)])
        .await;
    report(&result)
}
