//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use punch_bus::RetryPolicy;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the ledger database file.
    pub database_path: PathBuf,
    /// How long the CLI waits for in-flight publications before exit.
    pub flush_timeout_ms: u64,
    /// Message bus settings.
    pub broker: BrokerConfig,
}

/// Message bus connection and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker REST proxy endpoint.
    pub endpoint: String,
    /// Topic that punch events publish to.
    pub topic: String,
    pub max_attempts: u32,
    pub attempt_timeout_ms: u64,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub total_deadline_ms: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("flush_timeout_ms", &self.flush_timeout_ms)
            .field("broker", &self.broker)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("punch.db"),
            flush_timeout_ms: 10_000,
            broker: BrokerConfig::default(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            endpoint: "http://localhost:8082".to_string(),
            topic: "punch-clock".to_string(),
            max_attempts: defaults.max_attempts,
            attempt_timeout_ms: ms(defaults.attempt_timeout),
            initial_backoff_ms: ms(defaults.initial_backoff),
            max_backoff_ms: ms(defaults.max_backoff),
            total_deadline_ms: ms(defaults.total_deadline),
        }
    }
}

impl BrokerConfig {
    /// Builds the publisher retry policy from the configured values.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_millis(self.attempt_timeout_ms),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            total_deadline: Duration::from_millis(self.total_deadline_ms),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (PUNCH_*, nesting via __)
        figment = figment.merge(Env::prefixed("PUNCH_").split("__"));

        figment.extract()
    }

    /// Flush wait as a duration.
    #[must_use]
    pub const fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }
}

/// Returns the platform-specific config directory for punch.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("punch"))
}

/// Returns the platform-specific data directory for punch.
///
/// On Linux: `~/.local/share/punch`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("punch"))
}
