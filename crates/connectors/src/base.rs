//! Lifecycle and the resilient request path shared by every connector.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fluxori_core::{
    ConnectionStatus, ConnectorCredentials, ConnectorState, CredentialField, Marketplace,
    NetworkStatus,
};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::adapter::{ApiClient, MarketplaceAdapter, RequestExecutor};
use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::error::ConnectorError;
use crate::network::NetworkMonitor;
use crate::rate_limit::OutboundLimiter;
use crate::retry::RetryPolicy;
use crate::settings::ConnectorSettings;
use crate::transport::{HttpRequest, HttpResponse, Transport};

#[derive(Debug, Default)]
struct Session {
    state: ConnectorState,
    credentials: Option<ConnectorCredentials>,
}

/// Connector core: credentials, lifecycle, retry, circuit breaker, network
/// monitor and throttle around one [`MarketplaceAdapter`].
pub struct BaseConnector<A: MarketplaceAdapter> {
    adapter: A,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    network: NetworkMonitor,
    limiter: Option<OutboundLimiter>,
    session: RwLock<Session>,
}

impl<A: MarketplaceAdapter> BaseConnector<A> {
    /// Create an uninitialized connector.
    #[must_use]
    pub fn new(adapter: A, transport: Arc<dyn Transport>, settings: &ConnectorSettings) -> Self {
        let limiter = settings
            .rate_limit
            .or_else(|| adapter.default_rate_limit())
            .map(OutboundLimiter::new);

        Self {
            adapter,
            transport,
            retry: settings.retry.clone(),
            breaker: CircuitBreaker::new(settings.breaker.clone()),
            network: NetworkMonitor::new(settings.network.clone()),
            limiter,
            session: RwLock::new(Session::default()),
        }
    }

    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn marketplace(&self) -> Marketplace {
        self.adapter.marketplace()
    }

    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub const fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub async fn state(&self) -> ConnectorState {
        self.session.read().await.state
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Validate and store credentials.
    ///
    /// No request is sent: missing fields are rejected up front.
    ///
    /// # Errors
    ///
    /// - `ConnectorError::Closed` if the connector was closed.
    /// - `ConnectorError::Validation` naming the missing credential fields,
    ///   a marketplace mismatch, or an adapter-specific rejection.
    #[instrument(
        skip(self, credentials),
        fields(marketplace = %self.marketplace(), organization_id = %credentials.organization_id)
    )]
    pub async fn initialize(&self, credentials: ConnectorCredentials) -> Result<(), ConnectorError> {
        let previous = {
            let mut session = self.session.write().await;
            if session.state == ConnectorState::Closed {
                return Err(ConnectorError::Closed);
            }
            std::mem::replace(&mut session.state, ConnectorState::Initializing)
        };

        if let Err(error) = self.validate(&credentials) {
            warn!(error = %error, "Rejected connector credentials");
            let mut session = self.session.write().await;
            session.state = if previous == ConnectorState::Initializing {
                ConnectorState::Uninitialized
            } else {
                previous
            };
            return Err(error);
        }

        {
            let mut session = self.session.write().await;
            session.credentials = Some(credentials);
            session.state = ConnectorState::Ready;
        }
        self.breaker.reset().await;
        info!("Connector initialized");
        Ok(())
    }

    fn validate(&self, credentials: &ConnectorCredentials) -> Result<(), ConnectorError> {
        let missing = credentials.missing_fields(self.adapter.required_fields());
        if !missing.is_empty() {
            let names = missing
                .iter()
                .map(CredentialField::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ConnectorError::Validation(format!(
                "missing required credential field(s): {names}"
            )));
        }

        if credentials.marketplace != self.marketplace() {
            return Err(ConnectorError::Validation(format!(
                "credentials are for {}, connector is {}",
                credentials.marketplace,
                self.marketplace()
            )));
        }

        self.adapter.prepare(credentials)
    }

    /// Close the connector and drop its credentials.
    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    pub async fn close(&self) {
        {
            let mut session = self.session.write().await;
            session.state = ConnectorState::Closed;
            session.credentials = None;
        }
        self.breaker.reset().await;
        self.network.reset().await;
        info!("Connector closed");
    }

    /// Credentials, if the connector may be used.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Closed` or `ConnectorError::NotInitialized`.
    pub async fn ensure_ready(&self) -> Result<ConnectorCredentials, ConnectorError> {
        let session = self.session.read().await;
        match (session.state, &session.credentials) {
            (ConnectorState::Closed, _) => Err(ConnectorError::Closed),
            (state, Some(credentials)) if state.is_operational() => Ok(credentials.clone()),
            _ => Err(ConnectorError::NotInitialized),
        }
    }

    /// Check lifecycle and circuit, then hand out an [`ApiClient`].
    ///
    /// The half-open probe slot is only claimed when a request is sent, so
    /// operations answered locally never hold it.
    ///
    /// # Errors
    ///
    /// Returns the lifecycle error or `ConnectorError::CircuitOpen`.
    pub async fn admit(&self) -> Result<ApiClient<'_>, ConnectorError> {
        let credentials = self.ensure_ready().await?;
        self.breaker.check().await?;
        Ok(ApiClient::new(self, credentials))
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Send under `policy`, recording the outcome once for the whole call.
    async fn execute_with(
        &self,
        request: HttpRequest,
        policy: &RetryPolicy,
    ) -> Result<HttpResponse, ConnectorError> {
        let credentials = self.ensure_ready().await?;
        self.breaker.try_acquire().await?;

        let request = self
            .adapter
            .authorize(&credentials, request)
            .timeout(policy.attempt_timeout);
        let outcome = policy.run(|_| self.attempt(request.clone())).await;

        let transition = match &outcome {
            Err(error) if error.is_retryable() => self.breaker.record_failure().await,
            // Non-retryable errors still carry a marketplace response.
            _ => self.breaker.record_success().await,
        };
        if let Some(state) = transition {
            self.on_circuit_change(state).await;
        }
        outcome
    }

    /// One attempt: throttle, send, record in the network monitor.
    async fn attempt(&self, request: HttpRequest) -> Result<HttpResponse, ConnectorError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let endpoint = request.endpoint().to_string();
        debug!(method = %request.method, endpoint = %endpoint, "Sending marketplace request");
        let started = Instant::now();

        match self.transport.send(request).await {
            Ok(response) => {
                self.network.record_success(started.elapsed()).await;
                response.error_for_status()
            }
            Err(error) if error.is_transport() => {
                if self.network.record_failure(&endpoint).await {
                    Err(ConnectorError::LoadShedding(error.to_string()))
                } else {
                    Err(error)
                }
            }
            Err(error) => Err(error),
        }
    }

    async fn on_circuit_change(&self, circuit: CircuitState) {
        let mut session = self.session.write().await;
        match (circuit, session.state) {
            (CircuitState::Open { .. }, ConnectorState::Ready) => {
                warn!(marketplace = %self.marketplace(), "Connector degraded");
                session.state = ConnectorState::Degraded;
            }
            (CircuitState::Closed, ConnectorState::Degraded) => {
                info!(marketplace = %self.marketplace(), "Connector recovered");
                session.state = ConnectorState::Ready;
            }
            _ => {}
        }
    }

    // =========================================================================
    // Connection checks
    // =========================================================================

    /// Probe the marketplace once. Never fails: problems are reported as a
    /// disconnected status.
    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    pub async fn test_connection(&self) -> ConnectionStatus {
        let credentials = match self.ensure_ready().await {
            Ok(credentials) => credentials,
            Err(error) => return ConnectionStatus::disconnected(error.to_string()),
        };

        let request = self.adapter.health_check(&credentials);
        let policy = RetryPolicy::no_retries(self.retry.attempt_timeout);
        let started = Instant::now();

        match self.execute_with(request, &policy).await {
            Ok(_) => ConnectionStatus::connected(millis(started.elapsed())),
            Err(error) => {
                debug!(error = %error, "Connection test failed");
                ConnectionStatus::disconnected(error.to_string())
            }
        }
    }

    /// Aggregated network estimate, probing first if it has gone stale.
    pub async fn check_network_status(&self) -> NetworkStatus {
        if self.network.is_stale().await && self.ensure_ready().await.is_ok() {
            let _ = self.test_connection().await;
        }
        self.network.status().await
    }

    /// Refresh the access token if possible, then re-test connectivity.
    ///
    /// A failed refresh is logged and does not stop the connectivity test.
    #[instrument(skip(self), fields(marketplace = %self.marketplace()))]
    pub async fn refresh_connection(&self) -> ConnectionStatus {
        if self.adapter.supports_token_refresh() {
            match self.admit().await {
                Ok(api) if api.credentials().has(CredentialField::RefreshToken) => {
                    match self.adapter.refresh_token(&api).await {
                        Ok(token) => {
                            let mut session = self.session.write().await;
                            if let Some(credentials) = session.credentials.as_mut() {
                                credentials.rotate_access_token(token);
                                info!("Access token refreshed");
                            }
                        }
                        Err(error) => {
                            warn!(error = %error, "Token refresh failed, keeping existing credentials");
                        }
                    }
                }
                Ok(_) => debug!("No refresh token stored, skipping token refresh"),
                Err(error) => warn!(error = %error, "Token refresh skipped"),
            }
        }

        self.test_connection().await
    }
}

#[async_trait]
impl<A: MarketplaceAdapter> RequestExecutor for BaseConnector<A> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ConnectorError> {
        let network = self.network.status().await;
        let policy = self.retry.adapted_to(&network);
        self.execute_with(request, &policy).await
    }
}

impl<A: MarketplaceAdapter> std::fmt::Debug for BaseConnector<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseConnector")
            .field("marketplace", &self.marketplace())
            .field("retry", &self.retry)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
