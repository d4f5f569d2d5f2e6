//! Common types used throughout rfxcfg
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use crate::error::{Error, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// JWT Algorithm
// ============================================================================

/// JWT signing algorithm
///
/// Only the HMAC family is offered: both the API key and the session
/// secret are shared secrets, never key pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    /// HMAC using SHA-256
    #[default]
    HS256,
    /// HMAC using SHA-384
    HS384,
    /// HMAC using SHA-512
    HS512,
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }
}

// ============================================================================
// Secret Encoding
// ============================================================================

/// How a textual secret is turned into HMAC key bytes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SecretEncoding {
    /// Use the UTF-8 bytes of the secret as-is
    #[default]
    Raw,
    /// Decode the secret as standard base64
    Base64,
}

impl SecretEncoding {
    /// Convert a secret string into key bytes
    pub fn key_bytes(self, secret: &str) -> Result<Vec<u8>> {
        match self {
            SecretEncoding::Raw => Ok(secret.as_bytes().to_vec()),
            SecretEncoding::Base64 => base64::engine::general_purpose::STANDARD
                .decode(secret)
                .map_err(|e| Error::signing(format!("secret is not valid base64: {e}"))),
        }
    }
}

// ============================================================================
// Utilities
// ============================================================================

/// Extension trait for Option<String> to handle empty strings
pub trait OptionStringExt {
    /// Returns None if the string is empty
    fn none_if_empty(self) -> Option<String>;
}

impl OptionStringExt for Option<String> {
    fn none_if_empty(self) -> Option<String> {
        self.filter(|s| !s.is_empty())
    }
}

impl OptionStringExt for String {
    fn none_if_empty(self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}
