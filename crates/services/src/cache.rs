//! Read-through caching for expensive upstream fetches.
//!
//! A hit is deserialized back into the caller's type, so a cached call and a
//! live call return the same value. Concurrent misses on one key may each
//! reach the upstream; upstream reads are idempotent.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use storage::cache::{CacheError, CacheStore};
use tracing::debug;

use crate::config::CacheConfig;

/// Key of a cached fetch: `scope:endpoint[:filter]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: String,
    pub endpoint: String,
    pub filter: Option<String>,
}

impl CacheKey {
    #[must_use]
    pub fn new(scope: &str, endpoint: &str) -> Self {
        Self {
            scope: scope.to_string(),
            endpoint: endpoint.to_string(),
            filter: None,
        }
    }

    /// Adds a filter fingerprint so differently filtered requests get their
    /// own entries. Empty fingerprints are ignored.
    #[must_use]
    pub fn with_filter(mut self, fingerprint: impl Into<String>) -> Self {
        let fingerprint = fingerprint.into();
        self.filter = (!fingerprint.is_empty()).then_some(fingerprint);
        self
    }

    #[must_use]
    pub fn to_storage_key(&self) -> String {
        match &self.filter {
            Some(filter) => format!("{}:{}:{}", self.scope, self.endpoint, filter),
            None => format!("{}:{}", self.scope, self.endpoint),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_key())
    }
}

/// Serves values from a `CacheStore` within the TTL, fetching and storing on miss.
#[derive(Clone)]
pub struct ReadThroughCache {
    config: CacheConfig,
    store: Option<Arc<dyn CacheStore>>,
}

impl ReadThroughCache {
    /// A cache that always fetches and never touches a store.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            config: CacheConfig::default(),
            store: None,
        }
    }

    #[must_use]
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            config,
            store: Some(store),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.active_store().is_some()
    }

    fn active_store(&self) -> Option<&Arc<dyn CacheStore>> {
        self.store.as_ref().filter(|_| self.config.enabled)
    }

    /// Return the value cached under `key`, or run `fetch` and cache its result.
    ///
    /// When caching is disabled `fetch` runs on every call and the store is
    /// never read or written.
    ///
    /// # Errors
    ///
    /// Store failures and `fetch` failures are returned unchanged; nothing is
    /// retried and a failed fetch is never cached.
    pub async fn cache_or_fetch<T, E, F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(store) = self.active_store() else {
            return fetch().await;
        };

        let key = key.to_storage_key();
        if let Some(cached) = store.get(&key).await? {
            debug!(%key, "cache hit");
            let value = serde_json::from_str(&cached)
                .map_err(|e| CacheError::Serialization(e.to_string()))?;
            return Ok(value);
        }

        debug!(%key, "cache miss");
        let value = fetch().await?;
        let serialized =
            serde_json::to_string(&value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        store.set(&key, serialized, self.config.ttl()).await?;
        Ok(value)
    }
}
