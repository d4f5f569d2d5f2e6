//! Error types for rfxcfg
//!
//! This module defines the error hierarchy for the whole client.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Only three kinds are terminal for a caller: [`Error::Configuration`],
//! [`Error::Authentication`] and [`Error::Fetch`]. Transport and status
//! failures never surface on their own; they are retried and, once the
//! attempt budget is spent, become the `source` of one of those kinds.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for rfxcfg
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Terminal Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unable to log in to {url}")]
    Authentication {
        url: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Unable to fetch config `{name}`")]
    Fetch {
        name: String,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // Retry Loop Exits
    // ============================================================================
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Retry deadline of {timeout_ms}ms exceeded")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Underlying Causes
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Token signing failed: {message}")]
    Signing { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an authentication error wrapping the last retry failure
    pub fn authentication(url: impl Into<String>, source: Error) -> Self {
        Self::Authentication {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Create a fetch error wrapping the last retry failure
    pub fn fetch(name: impl Into<String>, source: Error) -> Self {
        Self::Fetch {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create an IO error for `path`
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a signing error
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Check whether this is a network or status failure.
    ///
    /// The retry loop does not consult this by default; every failure is
    /// retried the same way. It exists for callers that supply their own
    /// retry predicate.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::HttpStatus { .. })
    }

    /// Check whether the retry loop was stopped from outside
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Timeout { .. })
    }

    /// Walk `Authentication`/`Fetch` wrappers down to the original failure
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Authentication { source, .. } | Error::Fetch { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Result type alias for rfxcfg
pub type Result<T> = std::result::Result<T, Error>;
