use std::sync::Arc;

use storage::cache::{CacheStore, InMemoryCacheStore, RedisCacheStore};
use storage::repository::Storage;
use tracing::{info, warn};

use crate::Clock;
use crate::cache::ReadThroughCache;
use crate::config::{AppConfig, CacheConfig, ContentSourceConfig};
use crate::content::{CachedContentSource, ContentSource, FileContentSource, StackbyContentSource};
use crate::content_service::ContentService;
use crate::error::AppServicesError;
use crate::progress_report::ProgressReportService;
use crate::progress_service::ProgressService;

/// Assembles the app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    content: Arc<ContentService>,
    progress: Arc<ProgressService>,
    reports: Arc<ProgressReportService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the configured content
    /// source.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or the cache
    /// store connection fails.
    pub async fn from_config(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        let cache = build_cache(config.cache, config.redis_url.as_deref(), clock).await?;
        let source = build_source(&config.content, cache, clock);
        Ok(Self::new(clock, &storage, source))
    }

    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, source: Arc<dyn ContentSource>) -> Self {
        let progress = ProgressService::new(clock, Arc::clone(&storage.progress));
        let reports = ProgressReportService::new(Arc::clone(&source), progress.clone());
        Self {
            content: Arc::new(ContentService::new(source)),
            progress: Arc::new(progress),
            reports: Arc::new(reports),
        }
    }

    #[must_use]
    pub fn content(&self) -> Arc<ContentService> {
        Arc::clone(&self.content)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ProgressReportService> {
        Arc::clone(&self.reports)
    }
}

/// Cache for upstream content; Redis when a URL is configured.
///
/// # Errors
///
/// Returns `AppServicesError::Cache` if Redis cannot be reached.
pub async fn build_cache(
    config: CacheConfig,
    redis_url: Option<&str>,
    clock: Clock,
) -> Result<ReadThroughCache, AppServicesError> {
    if !config.enabled {
        return Ok(ReadThroughCache::disabled());
    }

    let store: Arc<dyn CacheStore> = match redis_url {
        Some(url) => Arc::new(RedisCacheStore::connect(url).await?),
        None => {
            warn!("CACHE_ENABLED without REDIS_URL; using in-process cache store");
            Arc::new(InMemoryCacheStore::new(clock))
        }
    };
    info!(ttl_secs = config.ttl_secs, "content cache enabled");
    Ok(ReadThroughCache::new(config, store))
}

#[must_use]
pub fn build_source(
    content: &ContentSourceConfig,
    cache: ReadThroughCache,
    clock: Clock,
) -> Arc<dyn ContentSource> {
    match content {
        ContentSourceConfig::Files { root } => {
            info!(root = %root.display(), "reading content from files");
            Arc::new(FileContentSource::new(root.clone()))
        }
        ContentSourceConfig::Stackby(stackby) => {
            info!(base_url = %stackby.base_url, "reading content from stackby");
            let upstream = StackbyContentSource::new(stackby.clone()).with_clock(clock);
            Arc::new(CachedContentSource::new(upstream, cache))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::time::fixed_clock;

    #[tokio::test]
    async fn disabled_cache_needs_no_store() {
        let cache = build_cache(CacheConfig::default(), Some("redis://unreachable:1"), fixed_clock())
            .await
            .unwrap();
        assert!(!cache.is_enabled());
    }

    #[tokio::test]
    async fn enabled_cache_without_redis_uses_memory_store() {
        let cache = build_cache(CacheConfig::enabled(60), None, fixed_clock())
            .await
            .unwrap();
        assert!(cache.is_enabled());
    }

    #[tokio::test]
    async fn services_share_one_ledger() {
        let storage = Storage::in_memory();
        let source = build_source(
            &ContentSourceConfig::Files {
                root: std::env::temp_dir().join("learnpath-no-content"),
            },
            ReadThroughCache::disabled(),
            fixed_clock(),
        );
        let services = AppServices::new(fixed_clock(), &storage, source);

        assert!(services.content().themes().await.unwrap().is_empty());
        let statuses = services
            .reports()
            .topic_statuses(learnpath_core::model::UserId::new(1), "t1".into())
            .await
            .unwrap();
        assert!(statuses.is_empty());
    }
}
