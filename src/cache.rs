//! Explicit config cache
//!
//! The fetched config is memoized by a [`ConfigCache`] that the caller
//! builds once at startup and shares (usually behind an `Arc`). The first
//! [`ConfigCache::get`] fetches; later calls return the stored value. A
//! failed fetch is not stored, so the next call tries again.

use crate::error::Result;
use crate::session::Session;
use crate::settings::SettingsSource;
use crate::types::JsonValue;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::info;

/// Anything that can produce a named config object
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the config object called `name`
    async fn fetch_config(&self, name: &str) -> Result<JsonValue>;
}

/// Memoized config object backed by a [`ConfigSource`]
#[derive(Debug)]
pub struct ConfigCache<S> {
    source: S,
    name: String,
    value: OnceCell<JsonValue>,
}

impl<S: ConfigSource> ConfigCache<S> {
    /// Cache the config `name` from `source`
    pub fn new(source: S, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            value: OnceCell::new(),
        }
    }

    /// Name of the cached config
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backing source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Return the config, fetching it on first use.
    ///
    /// Concurrent first calls share one fetch.
    pub async fn get(&self) -> Result<&JsonValue> {
        self.value
            .get_or_try_init(|| async {
                info!("Loading config `{}`", self.name);
                self.source.fetch_config(&self.name).await
            })
            .await
    }

    /// The cached value, without fetching
    pub fn peek(&self) -> Option<&JsonValue> {
        self.value.get()
    }

    /// Whether a value has been cached
    pub fn is_loaded(&self) -> bool {
        self.value.initialized()
    }
}

/// Resolve settings from `source` and build a cache for `REFLEX_CONFIG`.
///
/// Nothing is fetched until the first [`ConfigCache::get`].
pub fn load_from(source: &SettingsSource) -> Result<ConfigCache<Session>> {
    let settings = source.resolve()?;
    let name = settings.require_config_name()?.to_string();
    let session = Session::new(settings.session_config()?)?;
    Ok(ConfigCache::new(session, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Source that fails a fixed number of times, then succeeds
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicU32,
        failures: u32,
    }

    #[async_trait]
    impl ConfigSource for CountingSource {
        async fn fetch_config(&self, name: &str) -> Result<JsonValue> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(Error::fetch(name, Error::http_status(503, "")));
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            Ok(json!({"name": name, "call": n}))
        }
    }

    #[tokio::test]
    async fn test_get_fetches_once() {
        let cache = ConfigCache::new(CountingSource::default(), "app1");
        assert!(!cache.is_loaded());
        assert!(cache.peek().is_none());

        let first = cache.get().await.unwrap().clone();
        let second = cache.get().await.unwrap().clone();

        assert_eq!(first, json!({"name": "app1", "call": 1}));
        assert_eq!(first, second);
        assert!(cache.is_loaded());
        assert_eq!(cache.peek(), Some(&first));
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.name(), "app1");
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache = ConfigCache::new(
            CountingSource {
                failures: 1,
                ..CountingSource::default()
            },
            "app1",
        );

        let err = cache.get().await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        assert!(!cache.is_loaded());

        let value = cache.get().await.unwrap();
        assert_eq!(value["call"], 2);
    }

    #[tokio::test]
    async fn test_shared_cache_single_fetch() {
        let cache = Arc::new(ConfigCache::new(CountingSource::default(), "app1"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get().await.map(Clone::clone) })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap()["call"], 1);
        }
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_from_requires_config_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = SettingsSource::new()
            .secrets_dir(dir.path())
            .env_lookup(|name| match name {
                "REFLEX_URL" => Some("https://cfg.example".to_string()),
                "REFLEX_APIKEY" => Some("abc.def".to_string()),
                _ => None,
            });

        let err = load_from(&source).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Missing REFLEX_CONFIG");
    }

    #[test]
    fn test_load_from_builds_lazy_cache() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("REFLEX_CONFIG"), "app1\n").unwrap();
        let source = SettingsSource::new()
            .secrets_dir(dir.path())
            .env_lookup(|name| match name {
                "REFLEX_URL" => Some("https://cfg.example".to_string()),
                "REFLEX_APIKEY" => Some("abc.def".to_string()),
                _ => None,
            });

        let cache = load_from(&source).unwrap();
        assert_eq!(cache.name(), "app1");
        assert_eq!(cache.source().credentials().id(), "abc");
        assert!(!cache.is_loaded());
    }
}
