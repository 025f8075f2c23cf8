use async_trait::async_trait;
use learnpath_core::filter::ContentFilter;
use learnpath_core::model::{ContentKind, ContentResponse};

use super::ContentSource;
use crate::cache::{CacheKey, ReadThroughCache};
use crate::error::ContentFetchError;

pub const STACKBY_CACHE_SCOPE: &str = "stackby";

/// Routes every fetch of `S` through a `ReadThroughCache`.
///
/// Keys are `stackby:{Kind}` plus the filter fingerprint when filtered.
pub struct CachedContentSource<S> {
    inner: S,
    cache: ReadThroughCache,
}

impl<S: ContentSource> CachedContentSource<S> {
    #[must_use]
    pub fn new(inner: S, cache: ReadThroughCache) -> Self {
        Self { inner, cache }
    }

    #[must_use]
    pub fn cache_key(kind: ContentKind, filter: Option<&ContentFilter>) -> CacheKey {
        let key = CacheKey::new(STACKBY_CACHE_SCOPE, kind.as_str());
        match filter {
            Some(filter) => key.with_filter(filter.fingerprint()),
            None => key,
        }
    }
}

#[async_trait]
impl<S: ContentSource> ContentSource for CachedContentSource<S> {
    async fn fetch(
        &self,
        kind: ContentKind,
        filter: Option<&ContentFilter>,
    ) -> Result<ContentResponse, ContentFetchError> {
        let key = Self::cache_key(kind, filter);
        self.cache
            .cache_or_fetch(&key, || self.inner.fetch(kind, filter))
            .await
    }
}
