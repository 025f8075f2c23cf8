use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learnpath_core::model::{
    ContentId, ElementType, IdType, ItemStatus, ProgressRecord, SaveStatusProgress, UserId,
};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Which owning grouping a bulk ledger query is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProgressScope {
    Topic(ContentId),
    Theme(ContentId),
}

impl ProgressScope {
    #[must_use]
    pub fn new(id_type: IdType, id: ContentId) -> Self {
        match id_type {
            IdType::TopicId => Self::Topic(id),
            IdType::ThemeId => Self::Theme(id),
        }
    }

    #[must_use]
    pub fn id(&self) -> &ContentId {
        match self {
            ProgressScope::Topic(id) | ProgressScope::Theme(id) => id,
        }
    }

    /// True when `record` belongs to this scope.
    #[must_use]
    pub fn matches(&self, record: &ProgressRecord) -> bool {
        match self {
            ProgressScope::Topic(id) => record.topic_id == *id,
            ProgressScope::Theme(id) => record.theme_id == *id,
        }
    }
}

/// Filter for counting ledger records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressCountFilter {
    pub user_id: UserId,
    pub scope: ProgressScope,
    pub item_status: ItemStatus,
}

impl ProgressCountFilter {
    /// Completed records of `user_id` within `scope`.
    #[must_use]
    pub fn completed(user_id: UserId, scope: ProgressScope) -> Self {
        Self {
            user_id,
            scope,
            item_status: ItemStatus::Completed,
        }
    }
}

/// Full record used when an upsert has to create the row.
///
/// On conflict only `item_status` and `modified_at` are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProgressRecord {
    pub item_id: ContentId,
    pub user_id: UserId,
    pub element_type: ElementType,
    pub topic_id: ContentId,
    pub theme_id: ContentId,
    pub item_status: ItemStatus,
    pub modified_at: DateTime<Utc>,
}

impl NewProgressRecord {
    #[must_use]
    pub fn from_request(request: SaveStatusProgress, modified_at: DateTime<Utc>) -> Self {
        Self {
            item_id: request.item_id,
            user_id: request.user_id,
            element_type: request.element_type,
            topic_id: request.topic_id,
            theme_id: request.theme_id,
            item_status: request.item_status,
            modified_at,
        }
    }
}

/// Repository contract for the per-user progress ledger.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Count records matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn count(&self, filter: &ProgressCountFilter) -> Result<u64, StorageError>;

    /// Fetch the record for one unit, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn find_first(
        &self,
        user_id: UserId,
        item_id: &ContentId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// All records of a user within a scope, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be queried.
    async fn find_many(
        &self,
        user_id: UserId,
        scope: &ProgressScope,
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// Insert or update the record keyed by `(item_id, user_id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert(&self, record: NewProgressRecord) -> Result<ProgressRecord, StorageError>;
}

#[derive(Default)]
struct Ledger {
    next_id: i64,
    rows: Vec<ProgressRecord>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    ledger: Arc<Mutex<Ledger>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all users.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn len(&self) -> Result<usize, StorageError> {
        let guard = self
            .ledger
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.rows.len())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn count(&self, filter: &ProgressCountFilter) -> Result<u64, StorageError> {
        let guard = self
            .ledger
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let n = guard
            .rows
            .iter()
            .filter(|r| {
                r.user_id == filter.user_id
                    && r.item_status == filter.item_status
                    && filter.scope.matches(r)
            })
            .count();
        Ok(n as u64)
    }

    async fn find_first(
        &self,
        user_id: UserId,
        item_id: &ContentId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self
            .ledger
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .rows
            .iter()
            .find(|r| r.user_id == user_id && r.item_id == *item_id)
            .cloned())
    }

    async fn find_many(
        &self,
        user_id: UserId,
        scope: &ProgressScope,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self
            .ledger
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .rows
            .iter()
            .filter(|r| r.user_id == user_id && scope.matches(r))
            .cloned()
            .collect())
    }

    async fn upsert(&self, record: NewProgressRecord) -> Result<ProgressRecord, StorageError> {
        let mut guard = self
            .ledger
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if let Some(existing) = guard
            .rows
            .iter_mut()
            .find(|r| r.user_id == record.user_id && r.item_id == record.item_id)
        {
            existing.item_status = record.item_status;
            existing.modified_at = record.modified_at;
            return Ok(existing.clone());
        }

        guard.next_id += 1;
        let created = ProgressRecord {
            id: guard.next_id,
            item_id: record.item_id,
            user_id: record.user_id,
            element_type: record.element_type,
            topic_id: record.topic_id,
            theme_id: record.theme_id,
            item_status: record.item_status,
            modified_at: record.modified_at,
        };
        guard.rows.push(created.clone());
        Ok(created)
    }
}

/// Ledger handle behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}
