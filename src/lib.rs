// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]

//! # rfxcfg
//!
//! Client for a Reflex configuration provider. Exchanges a long-lived API
//! key for a short-lived session, signs access tokens with the session
//! secret, and fetches named configuration objects, polling through a
//! provider that is not reachable yet.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rfxcfg::{Result, Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::new("https://cfg.example", "abc.def").with_env_overrides();
//!     let session = Session::new(config)?;
//!
//!     // Logs in on first use, then reuses the session until it expires
//!     let app = session.get_config("app1").await?;
//!     println!("{app}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │   settings (secret files / env)  →  cache (memoized config)  │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ get_config(name)
//! ┌──────────────────────────────┴───────────────────────────────┐
//! │                           Session                            │
//! │   login(force)  ·  access token  ·  state behind a mutex     │
//! └───────────┬──────────────────────────────────┬───────────────┘
//!             │                                  │
//! ┌───────────┴───────────┐          ┌───────────┴───────────────┐
//! │  auth                 │          │  http                     │
//! │  credentials, claims, │          │  GET + validate, fixed    │
//! │  HMAC JWT signer      │          │  delay retry, cancel      │
//! └───────────────────────┘          └───────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
#[allow(missing_docs)]
pub mod error;

/// Common types and type aliases
pub mod types;

/// Credentials, claims and token signing
pub mod auth;

/// Retrying HTTP fetcher
pub mod http;

/// Session lifecycle
pub mod session;

/// Bootstrap settings from secret files and environment
pub mod settings;

/// Memoized config objects
pub mod cache;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::{load_from, ConfigCache, ConfigSource};
pub use error::{Error, Result};
pub use http::RetryPolicy;
pub use session::{Session, SessionConfig, SessionInfo};
pub use settings::{Settings, SettingsSource};
pub use types::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
