//! Session module
//!
//! The session lifecycle against the config provider:
//!
//! ```text
//! get_config(name)
//!   └─ login(force = false)      no-op while the session is unexpired
//!        └─ GET /token           X-Apikey: <refresh token signed with API-key secret>
//!   └─ access token              signed with the session secret, re-derived on expiry
//!   └─ GET /config/<name>        X-ApiToken: <access token>, Cookie: sid=<session>
//! ```
//!
//! Both requests go through the retrying fetcher.

mod client;
mod config;

pub use client::{Session, SessionInfo, HEADER_APIKEY, HEADER_API_TOKEN};
pub use config::SessionConfig;
