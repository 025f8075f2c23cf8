#![forbid(unsafe_code)]

pub mod cache;
pub mod repository;
pub mod sqlite;

pub use cache::{CacheError, CacheStore, InMemoryCacheStore, RedisCacheStore};
pub use repository::{
    InMemoryRepository, NewProgressRecord, ProgressCountFilter, ProgressRepository, ProgressScope,
    Storage, StorageError,
};
