use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use learnpath_core::Clock;

use super::{CacheError, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Process-local cache store with lazy expiry.
///
/// Expired entries are dropped when read. The clock can be swapped so tests
/// can step past a TTL without sleeping.
#[derive(Clone, Default)]
pub struct InMemoryCacheStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    clock: Arc<Mutex<Clock>>,
}

impl InMemoryCacheStore {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            entries: Arc::default(),
            clock: Arc::new(Mutex::new(clock)),
        }
    }

    /// Replace the clock used for expiry checks.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the lock is poisoned.
    pub fn set_clock(&self, clock: Clock) -> Result<(), CacheError> {
        let mut guard = self
            .clock
            .lock()
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        *guard = clock;
        Ok(())
    }

    fn now(&self) -> Result<DateTime<Utc>, CacheError> {
        let guard = self
            .clock
            .lock()
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(guard.now())
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.now()?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        match guard.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                guard.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = self.now()?;
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut guard = self
            .entries
            .lock()
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }
}
