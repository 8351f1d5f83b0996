//! Configuration module for redreader.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{ReaderError, Result};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/redreader.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/redreader.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// Delay between the end of one cycle and the start of the next, in seconds.
    #[serde(default = "default_ingest_interval")]
    pub interval_secs: u64,
    /// Run a cycle immediately when the scheduler starts.
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_ingest_interval() -> u64 {
    900 // 15 minutes
}

impl IngestConfig {
    /// The polling interval as a `Duration`.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_ingest_interval(),
            run_on_start: false,
        }
    }
}

/// HTTP fetch configuration shared by both source adapters.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Allow feeds on loopback/private addresses (testing and intranet deployments).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_user_agent() -> String {
    "redreader/0.1 (feed ingestion)".to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_read_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            allow_private_hosts: false,
        }
    }
}

/// Aggregator (ranked story API) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Whether the aggregator source runs each cycle.
    #[serde(default = "default_aggregator_enabled")]
    pub enabled: bool,
    /// API base URL, without trailing slash.
    #[serde(default = "default_aggregator_base_url")]
    pub base_url: String,
    /// Display title of the feed record aggregator articles are attached to.
    #[serde(default = "default_aggregator_feed_title")]
    pub feed_title: String,
    /// Upper bound on stories fetched per cycle (unbounded when absent).
    #[serde(default)]
    pub max_stories: Option<usize>,
}

fn default_aggregator_enabled() -> bool {
    true
}

fn default_aggregator_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_aggregator_feed_title() -> String {
    "Hacker News".to_string()
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            enabled: default_aggregator_enabled(),
            base_url: default_aggregator_base_url(),
            feed_title: default_aggregator_feed_title(),
            max_stories: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Scheduler configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// HTTP fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Aggregator source configuration.
    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ReaderError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ReaderError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `REDREADER_DATABASE_PATH`: Override the database file path
    /// - `REDREADER_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("REDREADER_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(level) = std::env::var("REDREADER_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The ingest interval is zero
    /// - Any HTTP timeout is zero
    /// - The aggregator is enabled without a base URL or feed title
    pub fn validate(&self) -> Result<()> {
        if self.ingest.interval_secs == 0 {
            return Err(ReaderError::Config(
                "ingest.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.fetch.connect_timeout_secs == 0
            || self.fetch.read_timeout_secs == 0
            || self.fetch.total_timeout_secs == 0
        {
            return Err(ReaderError::Config(
                "fetch timeouts must be greater than zero".to_string(),
            ));
        }
        if self.aggregator.enabled {
            if url::Url::parse(&self.aggregator.base_url).is_err() {
                return Err(ReaderError::Config(format!(
                    "aggregator.base_url is not a valid URL: {}",
                    self.aggregator.base_url
                )));
            }
            if self.aggregator.feed_title.trim().is_empty() {
                return Err(ReaderError::Config(
                    "aggregator.feed_title must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
