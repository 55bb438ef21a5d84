#![allow(clippy::result_large_err)]

use super::{ConfigValidator, FlowbridgeConfig, CONFIG_FILE_NAME};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Config file to read: the explicit path, else ./flowbridge.toml, else the user
    /// config directory. Returns the first candidate that exists.
    pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        dirs_next::config_dir()
            .map(|dir| dir.join("flowbridge").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    /// Load, apply environment overrides and validate.
    /// A missing file means defaults; an explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<FlowbridgeConfig, AppError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(AppError::new(
                    ErrorCategory::ConfigurationError,
                    format!("Config file {} does not exist", path.display()),
                )
                .with_code("FLOW-CONFIG-002"));
            }
        }

        let mut config = match Self::resolve_path(explicit) {
            Some(path) => Self::load_from_file(&path)?.unwrap_or_default(),
            None => FlowbridgeConfig::default(),
        };

        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<FlowbridgeConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: FlowbridgeConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("FLOW-CONFIG-001")
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(config: &mut FlowbridgeConfig) {
        if let Ok(endpoint) = env::var("FLOWBRIDGE_FALLBACK_ENDPOINT") {
            config.fallback.endpoint = Some(endpoint);
        }

        if let Ok(model) = env::var("FLOWBRIDGE_FALLBACK_MODEL") {
            config.fallback.model = model;
        }

        if let Ok(timeout) = env::var("FLOWBRIDGE_FALLBACK_TIMEOUT") {
            config.fallback.timeout = timeout;
        }

        if let Ok(concurrency_str) = env::var("FLOWBRIDGE_BATCH_CONCURRENCY") {
            if let Ok(concurrency) = concurrency_str.parse::<usize>() {
                config.batch.concurrency = concurrency;
            }
        }
    }
}
