use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::{Config, LockBackend};

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port: {0}. Must be non-zero")]
    InvalidPort(u16),

    #[error("Invalid convergence ttl: {0}s. Must be at least 1 second")]
    InvalidConvergenceTtl(u64),

    #[error("Invalid pool_size: {0}. Must be between 1 and 256")]
    InvalidPoolSize(usize),

    #[error("Invalid queue_depth: {0}. Must be at least 1")]
    InvalidQueueDepth(usize),

    #[error("Invalid timeout for {field}: must be at least 1 second")]
    InvalidTimeout { field: &'static str },

    #[error("Invalid chunk_size: {0}. Must be at least 1")]
    InvalidChunkSize(usize),

    #[error("Invalid channel_capacity: {0}. Must be at least 1")]
    InvalidChannelCapacity(usize),

    #[error("Invalid max_tool_rounds: {0}. Cannot be 0")]
    InvalidMaxToolRounds(u32),

    #[error("Invalid temperature: {0}. Must be between 0.0 and 2.0")]
    InvalidTemperature(f32),

    #[error("Redis lock store selected but lock_store.redis_url is not set")]
    MissingRedisUrl,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. triage.yaml in the working directory
    /// 3. triage.local.yaml (local overrides, optional)
    /// 4. Environment variables (TRIAGE_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("triage.yaml"))
            .merge(Yaml::file("triage.local.yaml"))
            .merge(Env::prefixed("TRIAGE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment overrides still apply.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("TRIAGE_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise from the default locations.
    pub fn resolve(path: Option<&std::path::Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort(config.server.port));
        }

        if config.convergence.ttl_secs == 0 {
            return Err(ConfigError::InvalidConvergenceTtl(config.convergence.ttl_secs));
        }

        if config.pipeline.call_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "pipeline.call_timeout_secs",
            });
        }
        if config.pipeline.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "pipeline.tool_timeout_secs",
            });
        }

        let pool_size = config.dispatcher.pool_size;
        if pool_size == 0 || pool_size > 256 {
            return Err(ConfigError::InvalidPoolSize(pool_size));
        }
        if config.dispatcher.queue_depth == 0 {
            return Err(ConfigError::InvalidQueueDepth(config.dispatcher.queue_depth));
        }
        if config.dispatcher.shutdown_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "dispatcher.shutdown_timeout_secs",
            });
        }

        if config.stream.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(config.stream.chunk_size));
        }
        if config.stream.channel_capacity == 0 {
            return Err(ConfigError::InvalidChannelCapacity(
                config.stream.channel_capacity,
            ));
        }
        if config.stream.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                field: "stream.heartbeat_interval_secs",
            });
        }

        if config.reasoning.max_tool_rounds == 0 {
            return Err(ConfigError::InvalidMaxToolRounds(
                config.reasoning.max_tool_rounds,
            ));
        }
        let temperature = config.reasoning.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidTemperature(temperature));
        }
        if config.reasoning.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "reasoning.base_url cannot be empty".to_string(),
            ));
        }

        if config.lock_store.backend == LockBackend::Redis
            && config
                .lock_store
                .redis_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::MissingRedisUrl);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}
