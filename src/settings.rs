//! Bootstrap settings
//!
//! Resolves the handful of values needed to reach the config provider.
//! Each value is read from a mounted secret file (`/run/secrets/<NAME>`)
//! when one exists, otherwise from the environment variable of the same
//! name. File values win.

use crate::error::{Error, Result};
use crate::session::SessionConfig;
use crate::types::OptionStringExt;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Provider base URL
pub const REFLEX_URL: &str = "REFLEX_URL";

/// API key, `<id>.<secret>`
pub const REFLEX_APIKEY: &str = "REFLEX_APIKEY";

/// Name of the calling service
pub const REFLEX_SERVICE: &str = "REFLEX_SERVICE";

/// Name of the config object to fetch
pub const REFLEX_CONFIG: &str = "REFLEX_CONFIG";

/// Default directory for mounted secrets
pub const DEFAULT_SECRETS_DIR: &str = "/run/secrets";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where settings are read from
#[derive(Clone)]
pub struct SettingsSource {
    secrets_dir: PathBuf,
    env: EnvLookup,
}

impl Default for SettingsSource {
    fn default() -> Self {
        Self {
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
            env: Arc::new(|name| std::env::var(name).ok()),
        }
    }
}

impl SettingsSource {
    /// Secrets from `/run/secrets`, environment from the process
    pub fn new() -> Self {
        Self::default()
    }

    /// Read secret files from another directory
    #[must_use]
    pub fn secrets_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.secrets_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Replace the environment lookup
    #[must_use]
    pub fn env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Resolve one setting: secret file first, then environment
    pub fn lookup(&self, name: &str) -> Result<Option<String>> {
        let file = self.secrets_dir.join(name);
        if file.is_file() {
            let contents =
                std::fs::read_to_string(&file).map_err(|e| Error::io(&file, e))?;
            debug!("{} read from {}", name, file.display());
            return Ok(contents.trim().to_string().none_if_empty());
        }

        Ok((self.env)(name).map(|v| v.trim().to_string()).none_if_empty())
    }

    /// Resolve all settings
    pub fn resolve(&self) -> Result<Settings> {
        Ok(Settings {
            url: self.lookup(REFLEX_URL)?,
            api_key: self.lookup(REFLEX_APIKEY)?,
            service: self.lookup(REFLEX_SERVICE)?,
            config_name: self.lookup(REFLEX_CONFIG)?,
        })
    }
}

impl fmt::Debug for SettingsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsSource")
            .field("secrets_dir", &self.secrets_dir)
            .finish_non_exhaustive()
    }
}

/// Resolved bootstrap settings
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// `REFLEX_URL`
    pub url: Option<String>,
    /// `REFLEX_APIKEY`
    pub api_key: Option<String>,
    /// `REFLEX_SERVICE`
    pub service: Option<String>,
    /// `REFLEX_CONFIG`
    pub config_name: Option<String>,
}

impl Settings {
    /// The config name, which is mandatory for a load
    pub fn require_config_name(&self) -> Result<&str> {
        self.config_name
            .as_deref()
            .ok_or_else(|| Error::config(format!("Missing {REFLEX_CONFIG}")))
    }

    /// Session config from the resolved URL and API key
    pub fn session_config(&self) -> Result<SessionConfig> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| Error::config(format!("Missing {REFLEX_APIKEY}")))?;
        let url = self
            .url
            .clone()
            .ok_or_else(|| Error::config(format!("Missing {REFLEX_URL}")))?;
        Ok(SessionConfig::new(url, api_key))
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("service", &self.service)
            .field("config_name", &self.config_name)
            .finish()
    }
}
