use std::env;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Default cache lifetime: eight hours.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60 * 8;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:learnpath.sqlite3";
pub const DEFAULT_CONTENT_DIR: &str = "../content";

/// Read-through cache settings, passed to the cache at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn enabled(ttl_secs: u64) -> Self {
        Self {
            enabled: true,
            ttl_secs,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackbyConfig {
    pub base_url: String,
    pub api_key: String,
}

/// Where content records are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentSourceConfig {
    Files { root: PathBuf },
    Stackby(StackbyConfig),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub cache: CacheConfig,
    /// Redis cache store; the in-memory store is used when unset.
    pub redis_url: Option<String>,
    pub content: ContentSourceConfig,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for malformed values or a Stackby source
    /// without a usable base URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = non_empty(lookup("LEARNPATH_DB_URL"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let cache = CacheConfig {
            enabled: lookup("CACHE_ENABLED").is_some_and(|v| v == "TRUE"),
            ttl_secs: match non_empty(lookup("CACHE_TTL")) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidTtl(raw.clone()))?,
                None => DEFAULT_CACHE_TTL_SECS,
            },
        };

        let redis_url = non_empty(lookup("REDIS_URL"));

        let source = non_empty(lookup("CONTENT_SOURCE")).unwrap_or_else(|| "files".into());
        let content = match source.as_str() {
            "files" => ContentSourceConfig::Files {
                root: non_empty(lookup("CONTENT_DIR"))
                    .unwrap_or_else(|| DEFAULT_CONTENT_DIR.into())
                    .into(),
            },
            "stackby" => {
                let base_url =
                    non_empty(lookup("STACKBY_BASE_URL")).ok_or(ConfigError::MissingBaseUrl)?;
                if Url::parse(&base_url).is_err() {
                    return Err(ConfigError::InvalidBaseUrl(base_url));
                }
                ContentSourceConfig::Stackby(StackbyConfig {
                    base_url,
                    api_key: lookup("STACKBY_SECRET_KEY").unwrap_or_default(),
                })
            }
            other => return Err(ConfigError::UnknownContentSource(other.to_string())),
        };

        Ok(Self {
            database_url,
            cache,
            redis_url,
            content,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
