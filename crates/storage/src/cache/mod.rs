//! Key/value stores backing the read-through content cache.
//!
//! Stores hold already serialized values and own expiry: an entry written
//! with a TTL must stop being returned once the TTL has elapsed.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod memory_store;
mod redis_store;

pub use memory_store::InMemoryCacheStore;
pub use redis_store::RedisCacheStore;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("cache serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Value stored under `key`, or `None` when missing or expired.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backend rejects the write.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}
