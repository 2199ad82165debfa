//! Per-organization connector registry.
//!
//! The API holds one [`ConnectorRegistry`] in its state. Each organization
//! has at most one connector per marketplace; connecting again replaces
//! (and closes) the previous connector.

use std::collections::HashMap;
use std::sync::Arc;

use fluxori_core::{ConnectorCredentials, ConnectorState, Marketplace, OrganizationId};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::adapters::{TakealotAdapter, WantitallAdapter, WooCommerceAdapter};
use crate::connector::{Connector, MarketplaceConnector};
use crate::error::ConnectorError;
use crate::settings::ConnectorSettings;
use crate::transport::{ReqwestTransport, Transport};

// =============================================================================
// Factory
// =============================================================================

/// Builds uninitialized connectors that share one transport and settings.
#[derive(Clone)]
pub struct ConnectorFactory {
    settings: ConnectorSettings,
    transport: Arc<dyn Transport>,
}

impl ConnectorFactory {
    #[must_use]
    pub fn new(settings: ConnectorSettings, transport: Arc<dyn Transport>) -> Self {
        Self {
            settings,
            transport,
        }
    }

    /// Factory backed by a real HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_reqwest(settings: ConnectorSettings) -> Result<Self, ConnectorError> {
        let transport = ReqwestTransport::new(settings.request_timeout)?;
        Ok(Self::new(settings, Arc::new(transport)))
    }

    #[must_use]
    pub const fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    /// Create a connector for `marketplace`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Validation` for marketplaces without an
    /// adapter.
    pub fn create(&self, marketplace: Marketplace) -> Result<Arc<dyn Connector>, ConnectorError> {
        let transport = Arc::clone(&self.transport);
        let settings = &self.settings;
        let connector: Arc<dyn Connector> = match marketplace {
            Marketplace::Takealot => Arc::new(MarketplaceConnector::new(
                TakealotAdapter::new(),
                transport,
                settings,
            )),
            Marketplace::Wantitall => Arc::new(MarketplaceConnector::new(
                WantitallAdapter::new(),
                transport,
                settings,
            )),
            Marketplace::WooCommerce => Arc::new(MarketplaceConnector::new(
                WooCommerceAdapter::new(),
                transport,
                settings,
            )),
            Marketplace::Shopify | Marketplace::Amazon => {
                return Err(ConnectorError::Validation(format!(
                    "unsupported marketplace: {}",
                    marketplace.display_name()
                )));
            }
        };
        Ok(connector)
    }
}

impl std::fmt::Debug for ConnectorFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorFactory")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Registry
// =============================================================================

type Key = (OrganizationId, Marketplace);

/// Lifecycle snapshot of one registered connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSummary {
    pub organization_id: OrganizationId,
    pub marketplace: Marketplace,
    pub state: ConnectorState,
}

/// Connectors keyed by organization and marketplace.
pub struct ConnectorRegistry {
    factory: ConnectorFactory,
    connectors: RwLock<HashMap<Key, Arc<dyn Connector>>>,
}

impl ConnectorRegistry {
    #[must_use]
    pub fn new(factory: ConnectorFactory) -> Self {
        Self {
            factory,
            connectors: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn factory(&self) -> &ConnectorFactory {
        &self.factory
    }

    /// Build, initialize and register a connector for the credentials'
    /// organization and marketplace.
    ///
    /// Nothing is registered when initialization fails; an existing
    /// connector for the same key stays in place.
    ///
    /// # Errors
    ///
    /// Returns the factory or initialization error.
    #[instrument(skip(self, credentials), fields(org = %credentials.organization_id, marketplace = %credentials.marketplace))]
    pub async fn connect(
        &self,
        credentials: ConnectorCredentials,
    ) -> Result<Arc<dyn Connector>, ConnectorError> {
        let key = (
            credentials.organization_id.clone(),
            credentials.marketplace,
        );
        let connector = self.factory.create(credentials.marketplace)?;
        connector.initialize(credentials).await?;

        let previous = self
            .connectors
            .write()
            .await
            .insert(key, Arc::clone(&connector));
        if let Some(previous) = previous {
            previous.close().await;
            info!("Replaced existing connector");
        } else {
            info!("Connector registered");
        }
        Ok(connector)
    }

    /// The connector for an organization and marketplace, if registered.
    pub async fn get(
        &self,
        organization_id: &OrganizationId,
        marketplace: Marketplace,
    ) -> Option<Arc<dyn Connector>> {
        self.connectors
            .read()
            .await
            .get(&(organization_id.clone(), marketplace))
            .cloned()
    }

    /// Close and remove a connector. Returns whether one was registered.
    #[instrument(skip(self))]
    pub async fn disconnect(
        &self,
        organization_id: &OrganizationId,
        marketplace: Marketplace,
    ) -> bool {
        let removed = self
            .connectors
            .write()
            .await
            .remove(&(organization_id.clone(), marketplace));
        match removed {
            Some(connector) => {
                connector.close().await;
                info!("Connector disconnected");
                true
            }
            None => false,
        }
    }

    /// Marketplaces connected for an organization, sorted.
    pub async fn list(&self, organization_id: &OrganizationId) -> Vec<Marketplace> {
        let mut marketplaces: Vec<Marketplace> = self
            .connectors
            .read()
            .await
            .keys()
            .filter(|(org, _)| org == organization_id)
            .map(|(_, marketplace)| *marketplace)
            .collect();
        marketplaces.sort();
        marketplaces
    }

    /// Lifecycle state of every registered connector.
    pub async fn statuses(&self) -> Vec<ConnectorSummary> {
        let entries: Vec<(Key, Arc<dyn Connector>)> = self
            .connectors
            .read()
            .await
            .iter()
            .map(|(key, connector)| (key.clone(), Arc::clone(connector)))
            .collect();

        let mut summaries = Vec::with_capacity(entries.len());
        for ((organization_id, marketplace), connector) in entries {
            summaries.push(ConnectorSummary {
                organization_id,
                marketplace,
                state: connector.state().await,
            });
        }
        summaries.sort_by(|a, b| {
            (&a.organization_id, a.marketplace).cmp(&(&b.organization_id, b.marketplace))
        });
        summaries
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    fn registry() -> ConnectorRegistry {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        ConnectorRegistry::new(ConnectorFactory::new(ConnectorSettings::default(), transport))
    }

    fn takealot(org: &str) -> ConnectorCredentials {
        ConnectorCredentials::new(OrganizationId::new(org), Marketplace::Takealot)
            .with_api_key("key")
    }

    #[test]
    fn test_factory_rejects_unsupported() {
        let registry = registry();
        let err = registry
            .factory()
            .create(Marketplace::Shopify)
            .err()
            .expect("shopify has no adapter");
        assert_eq!(err.to_string(), "validation error: unsupported marketplace: Shopify");
        assert!(registry.factory().create(Marketplace::WooCommerce).is_ok());
    }

    #[tokio::test]
    async fn test_connect_and_replace() {
        let registry = registry();
        let org = OrganizationId::new("org-1");

        let first = registry.connect(takealot("org-1")).await.expect("connect");
        let second = registry.connect(takealot("org-1")).await.expect("reconnect");

        assert_eq!(first.state().await, ConnectorState::Closed);
        assert_eq!(second.state().await, ConnectorState::Ready);
        assert_eq!(registry.list(&org).await, vec![Marketplace::Takealot]);
    }

    #[tokio::test]
    async fn test_failed_connect_keeps_existing() {
        let registry = registry();
        let org = OrganizationId::new("org-1");
        registry.connect(takealot("org-1")).await.expect("connect");

        let missing_key = ConnectorCredentials::new(org.clone(), Marketplace::Takealot);
        assert!(registry.connect(missing_key).await.is_err());

        let existing = registry.get(&org, Marketplace::Takealot).await.expect("still there");
        assert_eq!(existing.state().await, ConnectorState::Ready);
    }

    #[tokio::test]
    async fn test_disconnect_closes() {
        let registry = registry();
        let org = OrganizationId::new("org-1");
        let connector = registry.connect(takealot("org-1")).await.expect("connect");

        assert!(registry.disconnect(&org, Marketplace::Takealot).await);
        assert!(!registry.disconnect(&org, Marketplace::Takealot).await);
        assert_eq!(connector.state().await, ConnectorState::Closed);
        assert!(registry.get(&org, Marketplace::Takealot).await.is_none());
    }

    #[tokio::test]
    async fn test_statuses_sorted_per_org() {
        let registry = registry();
        registry.connect(takealot("org-b")).await.expect("connect");
        registry.connect(takealot("org-a")).await.expect("connect");

        let statuses = registry.statuses().await;
        let orgs: Vec<&str> = statuses.iter().map(|s| s.organization_id.as_str()).collect();
        assert_eq!(orgs, vec!["org-a", "org-b"]);
        assert!(statuses.iter().all(|s| s.state == ConnectorState::Ready));
        assert!(registry.list(&OrganizationId::new("org-c")).await.is_empty());
    }
}
