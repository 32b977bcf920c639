//! Runtime settings.
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. built-in defaults
//! 2. `config/stockroom.toml`, if present
//! 3. `STOCKROOM_*` environment variables, with `__` as the nesting separator
//!    (`STOCKROOM_DATABASE__URL`)

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Period of the full cache reload.
    pub cache_refresh_secs: u64,
    /// Deadline applied to every client call; `0` disables it.
    pub request_timeout_ms: u64,
    /// Capacity of each actor's request channel.
    pub channel_buffer: usize,
    /// Capacity of the order event broadcast channel.
    pub event_capacity: usize,
    #[serde(default)]
    pub database: Option<DatabaseSettings>,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_refresh_secs: 12 * 60 * 60,
            request_timeout_ms: 2_000,
            channel_buffer: 32,
            event_capacity: 64,
            database: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config/stockroom")
    }

    /// Loads from `path` (any extension the `config` crate knows) and the environment.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let defaults = Settings::default();
        Config::builder()
            .set_default("cache_refresh_secs", defaults.cache_refresh_secs)?
            .set_default("request_timeout_ms", defaults.request_timeout_ms)?
            .set_default("channel_buffer", defaults.channel_buffer as u64)?
            .set_default("event_capacity", defaults.event_capacity as u64)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("STOCKROOM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn cache_refresh(&self) -> Duration {
        Duration::from_secs(self.cache_refresh_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}
