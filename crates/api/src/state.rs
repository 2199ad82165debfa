//! Application state shared across handlers.

use std::sync::Arc;

use fluxori_connectors::{ConnectorError, ConnectorFactory, ConnectorRegistry};
use secrecy::SecretString;

use crate::config::ApiConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and owns the connector
/// registry; there is no process-wide connector state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    api_token: SecretString,
    registry: ConnectorRegistry,
}

impl AppState {
    /// Create state from an API token and a registry.
    #[must_use]
    pub fn new(api_token: SecretString, registry: ConnectorRegistry) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                api_token,
                registry,
            }),
        }
    }

    /// Build state with a reqwest-backed connector factory.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConnectorError> {
        let factory = ConnectorFactory::with_reqwest(config.connector.clone())?;
        Ok(Self::new(
            config.api_token.clone(),
            ConnectorRegistry::new(factory),
        ))
    }

    /// Token API clients must present.
    #[must_use]
    pub fn api_token(&self) -> &SecretString {
        &self.inner.api_token
    }

    /// The per-organization connector registry.
    #[must_use]
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.inner.registry
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("api_token", &"[REDACTED]")
            .field("registry", &self.inner.registry)
            .finish()
    }
}
