//! Content sources: where themes, topics and exercises come from.

mod cached;
mod file;
mod stackby;

pub use cached::{CachedContentSource, STACKBY_CACHE_SCOPE};
pub use file::FileContentSource;
pub use stackby::StackbyContentSource;

use async_trait::async_trait;
use learnpath_core::filter::ContentFilter;
use learnpath_core::model::{ContentKind, ContentResponse};

use crate::error::ContentFetchError;

/// A readable collection of content records, one per `ContentKind`.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch all records of `kind`, narrowed by `filter` where supported.
    ///
    /// # Errors
    ///
    /// Remote sources fail with `ContentFetchError`. File sources never fail.
    async fn fetch(
        &self,
        kind: ContentKind,
        filter: Option<&ContentFilter>,
    ) -> Result<ContentResponse, ContentFetchError>;
}
