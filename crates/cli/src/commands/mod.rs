//! CLI commands and the environment plumbing they share.

pub mod catalog;
pub mod probe;

use std::sync::Arc;

use fluxori_api::config::{ConfigError, connector_settings_from_env};
use fluxori_connectors::{Connector, ConnectorError, ConnectorFactory};
use fluxori_core::{
    ConnectorCredentials, ErrorCode, Marketplace, MarketplaceParseError, OperationResult,
    OrganizationId,
};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Marketplace(#[from] MarketplaceParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    /// The connector reported a failed operation.
    #[error("{code}: {message}")]
    Operation { code: ErrorCode, message: String },

    #[error("Not connected: {0}")]
    Disconnected(String),
}

/// Build credentials from `FLUXORI_*` values supplied by `lookup`.
fn credentials_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConnectorCredentials, CliError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let marketplace: Marketplace = get("FLUXORI_MARKETPLACE")
        .ok_or(CliError::MissingEnvVar("FLUXORI_MARKETPLACE"))?
        .parse()?;
    let organization = get("FLUXORI_ORG_ID").unwrap_or_else(|| "cli".to_string());

    let mut credentials = ConnectorCredentials::new(OrganizationId::new(organization), marketplace);
    if let Some(key) = get("FLUXORI_API_KEY") {
        credentials = credentials.with_api_key(key);
    }
    if let Some(secret) = get("FLUXORI_API_SECRET") {
        credentials = credentials.with_api_secret(secret);
    }
    if let Some(token) = get("FLUXORI_ACCESS_TOKEN") {
        credentials = credentials.with_access_token(token);
    }
    if let Some(token) = get("FLUXORI_REFRESH_TOKEN") {
        credentials = credentials.with_refresh_token(token);
    }
    if let Some(seller) = get("FLUXORI_SELLER_ID") {
        credentials = credentials.with_seller_id(seller);
    }
    if let Some(url) = get("FLUXORI_STORE_URL") {
        credentials = credentials.with_store_url(url);
    }
    if let Some(warehouse) = get("FLUXORI_WAREHOUSE_ID") {
        credentials = credentials.with_merchant_warehouse_id(warehouse);
    }
    Ok(credentials)
}

/// Create and initialize a connector from the environment.
pub async fn open_connector() -> Result<Arc<dyn Connector>, CliError> {
    dotenvy::dotenv().ok();

    let credentials = credentials_from(|key| std::env::var(key).ok())?;
    let settings = connector_settings_from_env()?;
    let connector = ConnectorFactory::with_reqwest(settings)?.create(credentials.marketplace)?;

    tracing::debug!(marketplace = %credentials.marketplace, "Initializing connector");
    connector.initialize(credentials).await?;
    Ok(connector)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}

/// Print an operation result and turn an error outcome into a failure exit.
///
/// Partial successes print both lists and exit cleanly.
pub fn report<T: Serialize>(result: &OperationResult<T>) -> Result<(), CliError> {
    print_json(result)?;
    match result {
        OperationResult::Error { code, message, .. } => Err(CliError::Operation {
            code: *code,
            message: message.clone(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_credentials_from_env() {
        let credentials = credentials_from(lookup(&[
            ("FLUXORI_MARKETPLACE", "woo"),
            ("FLUXORI_ORG_ID", "org-9"),
            ("FLUXORI_API_KEY", "ck_live"),
            ("FLUXORI_API_SECRET", "cs_live"),
            ("FLUXORI_STORE_URL", "https://shop.example.co.za"),
            ("FLUXORI_SELLER_ID", "  "),
        ]))
        .expect("credentials");

        assert_eq!(credentials.marketplace, Marketplace::WooCommerce);
        assert_eq!(credentials.organization_id.as_str(), "org-9");
        assert!(credentials.api_secret.is_some());
        assert!(credentials.seller_id.is_none());
    }

    #[test]
    fn test_credentials_require_marketplace() {
        let err = credentials_from(lookup(&[("FLUXORI_API_KEY", "k")])).unwrap_err();
        assert!(matches!(err, CliError::MissingEnvVar("FLUXORI_MARKETPLACE")));

        let err = credentials_from(lookup(&[("FLUXORI_MARKETPLACE", "ebay")])).unwrap_err();
        assert!(matches!(err, CliError::Marketplace(_)));
    }

    #[test]
    fn test_default_organization() {
        let credentials =
            credentials_from(lookup(&[("FLUXORI_MARKETPLACE", "takealot")])).expect("credentials");
        assert_eq!(credentials.organization_id.as_str(), "cli");
    }
}
