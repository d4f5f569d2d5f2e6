//! Session configuration

use crate::http::{HttpClientConfig, RetryPolicy};
use crate::settings::{REFLEX_APIKEY, REFLEX_URL};
use crate::types::{JwtAlgorithm, OptionStringExt, SecretEncoding};
use std::fmt;

/// Everything needed to construct a [`Session`](super::Session)
#[derive(Clone, Default)]
pub struct SessionConfig {
    /// Provider base URL (`REFLEX_URL`)
    pub base_url: Option<String>,
    /// API key of the form `<id>.<secret>` (`REFLEX_APIKEY`)
    pub api_key: Option<String>,
    /// HTTP client settings, including the retry policy
    pub http: HttpClientConfig,
    /// Signing algorithm for both tokens
    pub algorithm: JwtAlgorithm,
    /// How the API-key secret and the session secret become key bytes
    pub secret_encoding: SecretEncoding,
}

impl SessionConfig {
    /// Create a config from a base URL and API key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Set the retry policy used for both the token exchange and config fetches
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.http.retry = retry;
        self
    }

    /// Replace the HTTP client settings
    #[must_use]
    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    /// Set the signing algorithm
    #[must_use]
    pub fn algorithm(mut self, algorithm: JwtAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the secret encoding
    #[must_use]
    pub fn secret_encoding(mut self, encoding: SecretEncoding) -> Self {
        self.secret_encoding = encoding;
        self
    }

    /// Let `REFLEX_URL` / `REFLEX_APIKEY` from the process environment win
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_env_overrides_from(|name| std::env::var(name).ok())
    }

    /// Let values from `lookup` win over the passed-in ones; empty values are ignored
    #[must_use]
    pub fn with_env_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(REFLEX_URL).none_if_empty() {
            self.base_url = Some(url);
        }
        if let Some(api_key) = lookup(REFLEX_APIKEY).none_if_empty() {
            self.api_key = Some(api_key);
        }
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("http", &self.http)
            .field("algorithm", &self.algorithm)
            .field("secret_encoding", &self.secret_encoding)
            .finish()
    }
}
