//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::selectors::PageSelectors;
use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Source site settings
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP client and retry settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Outbound request rate settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Post fetching behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Local post cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Page markup selectors
    #[serde(default)]
    pub selectors: PageSelectors,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let base = self.site.base_url()?;
        if base.host_str().is_none() {
            return Err(AppError::validation("site.base_url has no host"));
        }
        if self.site.per_page == 0 {
            return Err(AppError::validation("site.per_page must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.retry_max_delay_ms < self.http.retry_base_delay_ms {
            return Err(AppError::validation(
                "http.retry_max_delay_ms must be >= http.retry_base_delay_ms",
            ));
        }
        if self.rate_limit.requests_per_second == 0 {
            return Err(AppError::validation(
                "rate_limit.requests_per_second must be > 0",
            ));
        }
        if self.rate_limit.burst == 0 {
            return Err(AppError::validation("rate_limit.burst must be > 0"));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(AppError::validation("fetch.max_concurrent must be > 0"));
        }
        if self.fetch.max_pages == 0 {
            return Err(AppError::validation("fetch.max_pages must be > 0"));
        }
        Ok(())
    }
}

/// Source site settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the Glowfic instance
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Replies requested per post page
    #[serde(default = "defaults::per_page")]
    pub per_page: u32,
}

impl SiteConfig {
    /// Parsed root URL.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            AppError::validation(format!("site.base_url '{}' is invalid: {e}", self.base_url))
        })
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            per_page: defaults::per_page(),
        }
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubled on every further attempt
    #[serde(default = "defaults::retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Upper bound for a single retry delay
    #[serde(default = "defaults::retry_max_delay")]
    pub retry_max_delay_ms: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_base_delay_ms: defaults::retry_base_delay(),
            retry_max_delay_ms: defaults::retry_max_delay(),
        }
    }
}

/// Outbound request rate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sustained request rate
    #[serde(default = "defaults::requests_per_second")]
    pub requests_per_second: u32,

    /// Requests allowed back to back before the rate applies
    #[serde(default = "defaults::burst")]
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: defaults::requests_per_second(),
            burst: defaults::burst(),
        }
    }
}

/// Post fetching behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum posts fetched at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Pages after which a post is considered runaway
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,

    /// Ignore cached posts and fetch everything again
    #[serde(default)]
    pub refresh: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::max_concurrent(),
            max_pages: defaults::max_pages(),
            refresh: false,
        }
    }
}

/// Local post cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding cached posts
    #[serde(default = "defaults::cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: defaults::cache_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Site defaults
    pub fn base_url() -> String {
        "https://glowfic.com".into()
    }
    pub fn per_page() -> u32 {
        25
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        concat!("glowfic-dl/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_base_delay() -> u64 {
        500
    }
    pub fn retry_max_delay() -> u64 {
        8_000
    }

    // Rate limit defaults
    pub fn requests_per_second() -> u32 {
        1
    }
    pub fn burst() -> u32 {
        1
    }

    // Fetch defaults
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn max_pages() -> u32 {
        1_000
    }

    // Cache defaults
    pub fn cache_dir() -> PathBuf {
        PathBuf::from("cache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.fetch.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.site.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [fetch]
            max_concurrent = 8

            [rate_limit]
            requests_per_second = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.fetch.max_concurrent, 8);
        assert_eq!(config.fetch.max_pages, 1_000);
        assert_eq!(config.rate_limit.requests_per_second, 2);
        assert_eq!(config.rate_limit.burst, 1);
        assert_eq!(config.site.base_url, "https://glowfic.com");
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.http.max_retries, 3);
    }
}
