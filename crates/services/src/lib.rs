#![forbid(unsafe_code)]

pub mod app_services;
pub mod cache;
pub mod config;
pub mod content;
pub mod content_service;
pub mod error;
pub mod progress_report;
pub mod progress_service;

pub use learnpath_core::Clock;

pub use app_services::AppServices;
pub use cache::{CacheKey, ReadThroughCache};
pub use config::{AppConfig, CacheConfig, ContentSourceConfig, StackbyConfig};
pub use content::{CachedContentSource, ContentSource, FileContentSource, StackbyContentSource};
pub use content_service::{
    ContentService, ContentStats, ExerciseFilter, FullContent, OverallStats, StatsScope,
    ThemeStats, TopicStats,
};
pub use error::{
    AppServicesError, ConfigError, ContentFetchError, ProgressReportError, ProgressServiceError,
};
pub use progress_report::ProgressReportService;
pub use progress_service::ProgressService;
