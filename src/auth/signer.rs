//! Token signing
//!
//! Both tokens are compact JWTs signed with a shared secret. The signer is
//! a trait object so a session can be built against a provider that signs
//! differently.

use crate::error::{Error, Result};
use crate::types::{JsonValue, JwtAlgorithm};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

/// Signs a claim set with a shared secret
pub trait TokenSigner: Send + Sync + std::fmt::Debug {
    /// Produce a signed token for `claims` using `key`
    fn sign(&self, claims: &JsonValue, key: &[u8]) -> Result<String>;
}

/// HMAC JWT signer
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner {
    algorithm: JwtAlgorithm,
}

impl HmacSigner {
    /// Create a signer for the given HMAC algorithm
    pub fn new(algorithm: JwtAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The configured algorithm
    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }
}

impl TokenSigner for HmacSigner {
    fn sign(&self, claims: &JsonValue, key: &[u8]) -> Result<String> {
        let header = Header::new(self.algorithm.into());
        encode(&header, claims, &EncodingKey::from_secret(key))
            .map_err(|e| Error::signing(format!("Failed to encode JWT: {e}")))
    }
}

/// Serialize typed claims and sign them
pub fn sign_claims<C: Serialize>(signer: &dyn TokenSigner, claims: &C, key: &[u8]) -> Result<String> {
    let claims = serde_json::to_value(claims)?;
    signer.sign(&claims, key)
}
