//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Hot ranking configuration.
    #[serde(default)]
    pub ranking: RankingConfig,
    /// Scheduler intervals.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (`postgres://...` in production).
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Hot ranking configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Number of entries kept in a published snapshot.
    #[serde(default = "default_top_n")]
    pub top_n: u64,
    /// Lifetime of a published snapshot in seconds.
    #[serde(default = "default_snapshot_ttl")]
    pub snapshot_ttl_secs: u64,
    /// Maximum number of counter entries drained per pop.
    #[serde(default = "default_drain_batch")]
    pub drain_batch: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            snapshot_ttl_secs: default_snapshot_ttl(),
            drain_batch: default_drain_batch(),
        }
    }
}

/// Intervals of the periodic jobs, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Hot group recompute interval.
    #[serde(default = "default_recompute_interval")]
    pub hot_group_interval_secs: u64,
    /// Hot content recompute interval.
    #[serde(default = "default_recompute_interval")]
    pub hot_content_interval_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            hot_group_interval_secs: default_recompute_interval(),
            hot_content_interval_secs: default_recompute_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human readable output.
    #[serde(default)]
    pub json: bool,
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_redis_prefix() -> String {
    "huddle".to_string()
}

const fn default_top_n() -> u64 {
    10
}

/// Snapshots live for 4 hours after a recompute.
const fn default_snapshot_ttl() -> u64 {
    14_400
}

const fn default_drain_batch() -> usize {
    500
}

const fn default_recompute_interval() -> u64 {
    3_600
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `HUDDLE_ENV`)
    /// 3. Environment variables with `HUDDLE__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("HUDDLE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HUDDLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("HUDDLE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
