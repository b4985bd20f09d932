//! CLI command implementations.

pub mod config;
pub mod diagnose;
pub mod serve;

use std::path::Path;

use anyhow::Result;

use crate::domain::models::config::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};

/// Load configuration and install the global subscriber. Keep the returned
/// logger alive until the command finishes.
fn bootstrap(config_path: Option<&Path>) -> Result<(Config, LoggerImpl)> {
    let config = ConfigLoader::resolve(config_path)?;
    let logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;
    Ok((config, logger))
}
