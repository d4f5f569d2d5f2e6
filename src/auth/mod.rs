//! Authentication module
//!
//! Splits the API key into credentials, builds and signs the refresh and
//! access tokens, and holds the per-session state those tokens come from.

mod signer;
mod types;

pub use signer::{sign_claims, HmacSigner, TokenSigner};
pub use types::{
    AccessClaims, Credentials, LoginResponse, RefreshClaims, SessionState,
    REFRESH_SEED_BYTES, REFRESH_TOKEN_LIFETIME_SECS,
};
