//! HTTP module
//!
//! Provides the retrying fetcher used by both the token exchange and the
//! config fetch.
//!
//! # Features
//!
//! - **Retry-Polling**: Fixed attempt budget and fixed delay, applied to
//!   transport failures and rejected responses alike
//! - **Validation**: The caller decides what an acceptable response is
//! - **Cancellation**: Optional token and deadline on the retry loop

mod client;
mod retry;

pub use client::{body_if_ok, json_if_ok, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
