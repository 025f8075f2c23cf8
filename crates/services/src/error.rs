//! Shared error types for the services crate.

use thiserror::Error;

use storage::cache::CacheError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
///
/// Missing themes, topics or ledger records are not errors; they produce
/// zero or empty results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("Error fetching user progress from database")]
    Fetch(#[source] StorageError),
    #[error("Error saving progress status")]
    Save(#[source] StorageError),
}

/// Errors emitted by content sources.
///
/// File-backed sources never produce these; they fall back to empty data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentFetchError {
    #[error("Stackby API error ({status}): {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Errors emitted by `ProgressReportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressReportError {
    #[error(transparent)]
    Content(#[from] ContentFetchError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

/// Errors emitted while reading configuration from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("STACKBY_BASE_URL is required when CONTENT_SOURCE=stackby")]
    MissingBaseUrl,
    #[error("invalid STACKBY_BASE_URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid CACHE_TTL: {0}")]
    InvalidTtl(String),
    #[error("unknown CONTENT_SOURCE: {0} (expected files or stackby)")]
    UnknownContentSource(String),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}
