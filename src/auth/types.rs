//! Auth data types
//!
//! Credentials split from the API key, the two claim sets that get signed,
//! the token exchange response, and the mutable per-session state.

use crate::error::{Error, Result};
use base64::Engine as _;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifetime of the refresh token sent to `/token`
pub const REFRESH_TOKEN_LIFETIME_SECS: i64 = 300;

/// Random bytes behind the refresh token seed; the provider wants at least
/// 256 characters of seed
pub const REFRESH_SEED_BYTES: usize = 256;

// ============================================================================
// Credentials
// ============================================================================

/// API key split into its id and secret halves
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key_id: String,
    api_key_secret: String,
}

impl Credentials {
    /// Split an API key of the form `<id>.<secret>` on its first `.`
    pub fn parse(api_key: &str) -> Result<Self> {
        let api_key = api_key.trim();
        let Some((id, secret)) = api_key.split_once('.') else {
            return Err(Error::config(
                "REFLEX_APIKEY must have the form <id>.<secret>",
            ));
        };

        if id.is_empty() {
            return Err(Error::config("REFLEX_APIKEY has an empty id"));
        }
        if secret.is_empty() {
            return Err(Error::config("REFLEX_APIKEY has an empty secret"));
        }

        Ok(Self {
            api_key_id: id.to_string(),
            api_key_secret: secret.to_string(),
        })
    }

    /// The key id, sent as `jti` of the refresh token
    pub fn id(&self) -> &str {
        &self.api_key_id
    }

    /// The key secret, used to sign the refresh token
    pub fn secret(&self) -> &str {
        &self.api_key_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key_id", &self.api_key_id)
            .field("api_key_secret", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims of the refresh token exchanged for a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Base64 of [`REFRESH_SEED_BYTES`] random bytes, fresh for every login
    pub seed: String,
    /// API key id
    pub jti: String,
    /// Expiry, epoch seconds
    pub exp: i64,
}

impl RefreshClaims {
    /// Build claims for `api_key_id`, expiring five minutes after `now`
    pub fn new(api_key_id: &str, now: i64) -> Self {
        Self {
            seed: random_seed(),
            jti: api_key_id.to_string(),
            exp: now + REFRESH_TOKEN_LIFETIME_SECS,
        }
    }
}

fn random_seed() -> String {
    let mut bytes = [0u8; REFRESH_SEED_BYTES];
    rand::rng().fill(&mut bytes[..]);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Claims of the access token sent with every config request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Session id
    pub sid: String,
    /// Token id issued by the provider
    pub jti: String,
    /// Session expiry, epoch seconds
    pub exp: i64,
}

// ============================================================================
// Token Exchange Response
// ============================================================================

/// Body of a successful `GET /token`
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    /// Session id
    pub session: String,
    /// Token id
    pub jti: String,
    /// Session expiry, epoch seconds
    #[serde(deserialize_with = "epoch_seconds")]
    pub expires_at: i64,
    /// Per-session signing secret
    pub secret: String,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("session", &self.session)
            .field("jti", &self.jti)
            .field("expires_at", &self.expires_at)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Accept integer or fractional epoch seconds; the fraction is dropped
fn epoch_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let secs = f64::deserialize(deserializer)?;
    Ok(secs.trunc() as i64)
}

// ============================================================================
// Session State
// ============================================================================

/// Mutable state of the current session
///
/// Starts empty with `expires_at = 0`, which reads as expired.
#[derive(Clone, Default)]
pub struct SessionState {
    session_id: String,
    token_id: String,
    expires_at: i64,
    session_secret: String,
    access_token: Option<String>,
    access_token_expires_at_ms: i64,
}

impl SessionState {
    /// Create an empty (expired) state
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the state of a freshly exchanged session, without an access token
    pub fn from_login(response: LoginResponse) -> Self {
        Self {
            session_id: response.session,
            token_id: response.jti,
            expires_at: response.expires_at,
            session_secret: response.secret,
            access_token: None,
            access_token_expires_at_ms: response.expires_at.saturating_mul(1000),
        }
    }

    /// Session id (empty before the first login)
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Token id issued by the provider
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Session expiry, epoch seconds
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Access token expiry, epoch milliseconds
    pub fn access_token_expires_at_ms(&self) -> i64 {
        self.access_token_expires_at_ms
    }

    /// Per-session signing secret
    pub fn session_secret(&self) -> &str {
        &self.session_secret
    }

    /// Whether a token exchange has ever succeeded
    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }

    /// The session is expired unless its expiry lies in the future
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at.saturating_mul(1000) <= now_ms
    }

    /// The access token, but only while it has not expired
    pub fn valid_access_token(&self, now_ms: i64) -> Option<&str> {
        self.access_token
            .as_deref()
            .filter(|_| now_ms < self.access_token_expires_at_ms)
    }

    /// Store a freshly derived access token
    pub fn set_access_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    /// Claims signed into the access token
    pub fn access_claims(&self) -> AccessClaims {
        AccessClaims {
            sid: self.session_id.clone(),
            jti: self.token_id.clone(),
            exp: self.expires_at,
        }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("session_id", &self.session_id)
            .field("token_id", &self.token_id)
            .field("expires_at", &self.expires_at)
            .field("has_access_token", &self.access_token.is_some())
            .field("access_token_expires_at_ms", &self.access_token_expires_at_ms)
            .finish_non_exhaustive()
    }
}
