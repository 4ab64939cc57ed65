//! Application configuration structures.

use std::fs;
use std::path::Path;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ListingSource, SourceType};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Events API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// HTML listing page settings
    #[serde(default)]
    pub listings: ListingsConfig,

    /// Record storage settings
    #[serde(default)]
    pub storage: StorageConfig,
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
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.api.max_pages == 0 {
            return Err(AppError::validation("api.max_pages must be > 0"));
        }
        for (name, days) in [
            ("api.lookback_days", self.api.lookback_days),
            ("api.lookahead_days", self.api.lookahead_days),
        ] {
            if !(0..=ApiConfig::MAX_WINDOW_DAYS).contains(&days) {
                return Err(AppError::validation(format!(
                    "{name} must be within 0..={}, got {days}",
                    ApiConfig::MAX_WINDOW_DAYS
                )));
            }
        }
        url::Url::parse(&self.api.base_url)
            .map_err(|e| AppError::validation(format!("api.base_url is invalid: {e}")))?;
        url::Url::parse(&self.api.portal_url)
            .map_err(|e| AppError::validation(format!("api.portal_url is invalid: {e}")))?;

        if self.listings.link_selectors.is_empty() {
            return Err(AppError::validation("listings.link_selectors is empty"));
        }
        for selector in &self.listings.link_selectors {
            Selector::parse(selector)
                .map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        for source in &self.listings.sources {
            url::Url::parse(&source.url).map_err(|e| {
                AppError::validation(format!("listing source '{}' is invalid: {e}", source.url))
            })?;
        }

        if self.storage.documents_file.trim().is_empty() {
            return Err(AppError::validation("storage.documents_file is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay after each document fetch in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent document fetches per listing page
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Retries for transient failures
    #[serde(default = "defaults::retry_times")]
    pub retry_times: u32,

    /// Base delay for exponential retry backoff in milliseconds
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
            retry_times: defaults::retry_times(),
            retry_backoff_ms: defaults::retry_backoff(),
        }
    }
}

/// Events API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Events endpoint
    #[serde(default = "defaults::api_base_url")]
    pub base_url: String,

    /// Public portal used for document links and CORS headers
    #[serde(default = "defaults::portal_url")]
    pub portal_url: String,

    /// Page ceiling per run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Days before today included in the query window
    #[serde(default = "defaults::lookback_days")]
    pub lookback_days: i64,

    /// Days after today included in the query window
    #[serde(default = "defaults::lookahead_days")]
    pub lookahead_days: i64,
}

impl ApiConfig {
    /// Upper bound for `lookback_days` and `lookahead_days`.
    pub const MAX_WINDOW_DAYS: i64 = 3650;
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::api_base_url(),
            portal_url: defaults::portal_url(),
            max_pages: defaults::max_pages(),
            lookback_days: defaults::lookback_days(),
            lookahead_days: defaults::lookahead_days(),
        }
    }
}

/// HTML listing page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsConfig {
    /// Listing pages to harvest
    #[serde(default = "defaults::listing_sources")]
    pub sources: Vec<ListingSource>,

    /// Link selectors tried in order until one matches
    #[serde(default = "defaults::link_selectors")]
    pub link_selectors: Vec<String>,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            sources: defaults::listing_sources(),
            link_selectors: defaults::link_selectors(),
        }
    }
}

/// Record storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// File name of the document store, relative to the storage directory
    #[serde(default = "defaults::documents_file")]
    pub documents_file: String,

    /// Abort the run when the sink rejects a record
    #[serde(default)]
    pub fail_on_sink_error: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_file: defaults::documents_file(),
            fail_on_sink_error: false,
        }
    }
}

mod defaults {
    use super::{ListingSource, SourceType};

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn max_concurrent() -> usize {
        2
    }
    pub fn retry_times() -> u32 {
        5
    }
    pub fn retry_backoff() -> u64 {
        500
    }

    // API defaults
    pub fn api_base_url() -> String {
        "https://lincolncowi.api.civicclerk.com/v1/Events".into()
    }
    pub fn portal_url() -> String {
        "https://lincolncowi.portal.civicclerk.com".into()
    }
    pub fn max_pages() -> usize {
        2
    }
    pub fn lookback_days() -> i64 {
        15
    }
    pub fn lookahead_days() -> i64 {
        45
    }

    // Listing defaults
    pub fn listing_sources() -> Vec<ListingSource> {
        vec![
            ListingSource {
                url: "https://www.codot.gov/programs/aeronautics/colorado-aeronautical-board/cab-meeting-minutes-1".into(),
                source_type: SourceType::Minutes,
            },
            ListingSource {
                url: "https://www.codot.gov/programs/aeronautics/colorado-aeronautical-board/cab-packets".into(),
                source_type: SourceType::AgendaPacket,
            },
        ]
    }
    pub fn link_selectors() -> Vec<String> {
        vec![
            r#"article div[class*="content"] p a, article div.item-list ul li a, article .field--name-body a"#.into(),
            "article a".into(),
            "a".into(),
        ]
    }

    // Storage defaults
    pub fn documents_file() -> String {
        "documents.json".into()
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
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.crawler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bounds_window_days() {
        let mut config = Config::default();
        config.api.lookback_days = 1_000_000_000_000;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));

        let mut config = Config::default();
        config.api.lookahead_days = -1;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));

        let mut config = Config::default();
        config.api.lookback_days = 0;
        config.api.lookahead_days = ApiConfig::MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.listings.link_selectors = vec!["[[invalid".to_string()];
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            max_pages = 5

            [[listings.sources]]
            url = "https://example.gov/minutes"
            source_type = "minutes"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.max_pages, 5);
        assert_eq!(config.api.lookback_days, 15);
        assert_eq!(config.listings.sources.len(), 1);
        assert_eq!(config.listings.sources[0].source_type, SourceType::Minutes);
        assert_eq!(config.listings.link_selectors.len(), 3);
        assert_eq!(config.crawler.retry_times, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_or_default_falls_back_on_missing_file() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.api.max_pages, 2);
    }
}
