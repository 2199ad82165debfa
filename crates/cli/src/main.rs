//! Fluxori CLI - Probe a marketplace connector from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Test the connection and print latency/quality
//! fluxori status
//!
//! # Print the connector's network estimate
//! fluxori network
//!
//! # List products (page 2, 25 per page)
//! fluxori products --page 2 --page-size 25
//!
//! # Orders created since a timestamp
//! fluxori orders --since 2024-05-01T00:00:00Z
//!
//! # Push one stock level
//! fluxori stock SKU-123 40
//! ```
//!
//! # Environment Variables
//!
//! - `FLUXORI_MARKETPLACE` - `takealot`, `wantitall` or `woocommerce` (required)
//! - `FLUXORI_ORG_ID` - Organization the credentials belong to (default: `cli`)
//! - `FLUXORI_API_KEY`, `FLUXORI_API_SECRET`, `FLUXORI_ACCESS_TOKEN`,
//!   `FLUXORI_REFRESH_TOKEN`, `FLUXORI_SELLER_ID`, `FLUXORI_STORE_URL`,
//!   `FLUXORI_WAREHOUSE_ID` - Marketplace credentials
//! - `CONNECTOR_*` - Same connector tuning as the API

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fluxori")]
#[command(author, version, about = "Fluxori marketplace connector CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Test the connection to the marketplace
    Status,
    /// Show the connector's network quality estimate
    Network,
    /// List products
    Products {
        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Products per page
        #[arg(long, default_value_t = 50)]
        page_size: u32,
    },
    /// List orders
    Orders {
        /// Only orders created after this RFC 3339 timestamp
        #[arg(short, long)]
        since: Option<DateTime<Utc>>,

        /// Page number (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Push a stock level for one SKU
    Stock {
        /// Seller SKU
        sku: String,

        /// New stock quantity
        quantity: i64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fluxori_connectors=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let connector = commands::open_connector().await?;

    let outcome = match cli.command {
        Commands::Status => commands::probe::status(connector.as_ref()).await,
        Commands::Network => commands::probe::network(connector.as_ref()).await,
        Commands::Products { page, page_size } => {
            commands::catalog::products(connector.as_ref(), page, page_size).await
        }
        Commands::Orders { since, page } => {
            commands::catalog::orders(connector.as_ref(), since, page).await
        }
        Commands::Stock { sku, quantity } => {
            commands::catalog::stock(connector.as_ref(), sku, quantity).await
        }
    };

    connector.close().await;
    outcome
}
