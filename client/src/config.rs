//! Configuration management for the client.

use roster_engine::EngineConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Web app endpoint of the record service
    pub api_url: String,
    /// Shared key sent with every request
    pub api_key: Option<String>,
    /// Directory of the persistent cache
    pub cache_dir: PathBuf,
    /// Per-request timeout
    pub timeout: Duration,
    /// Pause between remote writes of a batch
    pub batch_item_delay: Duration,
    /// Delay before the first automatic sync
    pub startup_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("ROSTER_API_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingApiUrl)?;

        let api_key = lookup("ROSTER_API_KEY").filter(|key| !key.is_empty());

        let cache_dir = lookup("ROSTER_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".roster-cache"));

        let timeout = Duration::from_secs(number(&lookup, "ROSTER_TIMEOUT_SECS", 30)?);
        let batch_item_delay =
            Duration::from_millis(number(&lookup, "ROSTER_BATCH_DELAY_MS", 100)?);
        let startup_delay =
            Duration::from_millis(number(&lookup, "ROSTER_STARTUP_DELAY_MS", 1000)?);

        Ok(Self {
            api_url,
            api_key,
            cache_dir,
            timeout,
            batch_item_delay,
            startup_delay,
        })
    }

    /// Engine tunables derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_batch_item_delay(self.batch_item_delay)
            .with_startup_delay(self.startup_delay)
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ROSTER_API_URL environment variable is required")]
    MissingApiUrl,

    #[error("Invalid {var} value: {value}")]
    InvalidNumber { var: &'static str, value: String },
}
