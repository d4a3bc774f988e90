//! Catalog lookup transport.
//!
//! [`CatalogLookup`] is the seam between the reference cache and the network.
//! The cache issues at most one lookup per `resolve` call and treats any
//! `Err` as a failed fetch; it never inspects the error beyond logging it.
//!
//! [`HttpCatalogClient`] is the production implementation: a JSON `POST` of a
//! [`LookupRequest`] to the configured endpoint, decoded into a
//! [`LookupResponse`].

use crate::config::LookupConfig;
use crate::core::RefsError;
use crate::models::{LookupRequest, LookupResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A batched catalog lookup.
///
/// Implementations must be cheap to share across tasks; the cache holds one
/// behind an `Arc` for its whole lifetime.
pub trait CatalogLookup: Send + Sync {
    /// Resolve the identifiers in `request`.
    ///
    /// The response may mention fewer identifiers than requested, or none.
    fn lookup(
        &self,
        request: &LookupRequest,
    ) -> impl Future<Output = Result<LookupResponse, RefsError>> + Send;
}

/// HTTP implementation of [`CatalogLookup`] using `reqwest`.
///
/// The transport timeout covers the whole exchange (connect, send, read). A
/// timeout surfaces as [`RefsError::LookupTimeout`].
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpCatalogClient {
    /// Create a client for `endpoint` with the given transport timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RefsError::ConfigError`] if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, RefsError> {
        Self::with_headers(endpoint, timeout, &BTreeMap::new())
    }

    /// Create a client that sends `headers` with every lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RefsError::ConfigError`] if a header name or value is invalid
    /// or the HTTP client cannot be built.
    pub fn with_headers(
        endpoint: impl Into<String>,
        timeout: Duration,
        headers: &BTreeMap<String, String>,
    ) -> Result<Self, RefsError> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| RefsError::ConfigError {
                    message: format!("invalid header name '{name}': {e}"),
                })?;
            let mut header_value =
                HeaderValue::from_str(value).map_err(|_| RefsError::ConfigError {
                    message: format!("invalid value for header '{name}'"),
                })?;
            header_value.set_sensitive(true);
            default_headers.insert(header_name, header_value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sfrefs/", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()
            .map_err(|e| RefsError::ConfigError {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    /// Create a client from the `[lookup]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`RefsError::MissingEndpoint`] if no endpoint is configured, or
    /// any error from [`HttpCatalogClient::with_headers`].
    pub fn from_config(config: &LookupConfig) -> Result<Self, RefsError> {
        config.validate()?;
        let endpoint = config.endpoint.clone().ok_or(RefsError::MissingEndpoint)?;
        Self::with_headers(endpoint, config.timeout(), &config.headers)
    }

    /// The lookup endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The transport timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_error(&self, error: &reqwest::Error) -> RefsError {
        if error.is_timeout() {
            RefsError::LookupTimeout {
                endpoint: self.endpoint.clone(),
                timeout: self.timeout,
            }
        } else {
            RefsError::LookupTransport {
                endpoint: self.endpoint.clone(),
                reason: error.to_string(),
            }
        }
    }
}

impl CatalogLookup for HttpCatalogClient {
    async fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse, RefsError> {
        debug!(
            target: "resolver::http",
            "POST {} ({} products, {} variants)",
            self.endpoint,
            request.product_ids.len(),
            request.variant_ids.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefsError::LookupStatus {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(&e))?;

        serde_json::from_slice(&body).map_err(|e| RefsError::LookupDecode {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })
    }
}
