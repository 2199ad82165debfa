//! HTTP transport capability.
//!
//! Connectors never touch `reqwest` directly; they build an [`HttpRequest`]
//! and hand it to a [`Transport`]. Production uses [`ReqwestTransport`],
//! tests substitute a scripted transport.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ConnectorError;

/// User agent sent with every marketplace request.
const USER_AGENT: &str = concat!("fluxori-connectors/", env!("CARGO_PKG_VERSION"));

/// An outbound request, independent of the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Deadline for this attempt; the transport default applies when unset.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Create a request with no query, headers or body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    #[must_use]
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Set a header, replacing any earlier value with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Bound this request by `timeout`.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Parse` if the body cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ConnectorError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Value of a header set on the request.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Value of a query parameter set on the request.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    /// URL without query string; used to tell endpoints apart when
    /// tracking failures.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

/// A response with the body already read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are stored lowercase.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    /// Create a response with no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a JSON response.
    #[must_use]
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `Retry-After` in seconds, when given as a number.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        self.header("retry-after")
            .and_then(|value| value.trim().parse().ok())
    }

    /// Turn a non-success status into a classified error.
    ///
    /// # Errors
    ///
    /// Returns the [`ConnectorError`] matching the status code.
    pub fn error_for_status(self) -> Result<Self, ConnectorError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ConnectorError::from_status(
                self.status,
                &self.body,
                self.retry_after(),
            ))
        }
    }

    /// Deserialize the body.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Parse` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ConnectorError> {
        serde_json::from_str(&self.body).map_err(Into::into)
    }
}

/// Sends HTTP requests.
///
/// Implementations report transport failures as `ConnectorError::Network`
/// or `ConnectorError::Timeout` and return every received response as-is,
/// whatever its status.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ConnectorError>;
}

/// Upper bound on establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Transport`] backed by a shared `reqwest::Client`.
///
/// The client carries no overall timeout: each request is bounded by its
/// own [`HttpRequest::timeout`], so retry policies can stretch it.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport that bounds requests without their own timeout
    /// by `default_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Network` if the HTTP client cannot be built.
    pub fn new(default_timeout: Duration) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(default_timeout))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            default_timeout,
        })
    }

    /// Timeout applied to `request`.
    #[must_use]
    pub fn timeout_for(&self, request: &HttpRequest) -> Duration {
        request.timeout.unwrap_or(self.default_timeout)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ConnectorError> {
        let timeout = self.timeout_for(&request);
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
