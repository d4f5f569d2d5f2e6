//! HTTP client with retry-polling
//!
//! Provides the single request shape the session needs: a GET whose raw
//! response is handed to a validator. Transport failures and validator
//! rejections are retried identically by the client's [`RetryPolicy`].

use super::retry::RetryPolicy;
use crate::error::{Error, Result};
use crate::types::JsonValue;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Timeout of a single attempt
    pub timeout: Duration,
    /// Retry policy applied to every fetch
    pub retry: RetryPolicy,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            default_headers: HashMap::new(),
            user_agent: format!("rfxcfg/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Request headers
    pub headers: HashMap<String, String>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// HTTP client issuing validated, retried GET requests
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET `url`, pass the response to `validate`, retry on any failure
    pub async fn fetch<T, V, Fut>(
        &self,
        url: &str,
        request: &RequestConfig,
        validate: V,
    ) -> Result<T>
    where
        V: Fn(Response) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.fetch_with_cancel(url, request, validate, None).await
    }

    /// [`HttpClient::fetch`] with a cancellation hook on the retry loop
    pub async fn fetch_with_cancel<T, V, Fut>(
        &self,
        url: &str,
        request: &RequestConfig,
        validate: V,
        cancel: Option<&CancellationToken>,
    ) -> Result<T>
    where
        V: Fn(Response) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let url = Url::parse(url)?;
        let operation = format!("GET {}", url.path());

        let this = self;
        let url = &url;
        let validate = &validate;

        let result = self
            .config
            .retry
            .run(&operation, cancel, move || async move {
                let response = this.build_request(url, request).send().await?;
                validate(response).await
            })
            .await;

        if result.is_ok() {
            debug!("Request succeeded: {}", operation);
        }
        result
    }

    fn build_request(&self, url: &Url, request: &RequestConfig) -> RequestBuilder {
        let mut req = self.client.get(url.clone());

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        req
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Validator accepting exactly `200 OK` and decoding the body as JSON
pub async fn json_if_ok<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = ok_bytes(response).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Validator accepting exactly `200 OK` with an opaque body.
///
/// A JSON body is decoded; anything else comes back as a JSON string.
pub async fn body_if_ok(response: Response) -> Result<JsonValue> {
    let bytes = ok_bytes(response).await?;
    if let Ok(value) = serde_json::from_slice(&bytes) {
        return Ok(value);
    }
    Ok(JsonValue::String(String::from_utf8_lossy(&bytes).into_owned()))
}

async fn ok_bytes(response: Response) -> Result<Vec<u8>> {
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::http_status(status.as_u16(), body));
    }
    Ok(response.bytes().await?.to_vec())
}
