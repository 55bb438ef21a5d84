#![allow(clippy::result_large_err)]

use super::FlowbridgeConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::time::Duration;

const MIN_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRIES: u32 = 3;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &FlowbridgeConfig) -> Result<(), AppError> {
        let fallback = &config.fallback;
        if let Some(endpoint) = fallback.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            let parsed = url::Url::parse(endpoint)
                .map_err(|err| invalid(format!("fallback.endpoint is not a valid URL: {}", err)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid("fallback.endpoint must use http or https"));
            }
        }

        let timeout = fallback
            .timeout_duration()
            .map_err(|err| invalid(format!("fallback.timeout '{}' is invalid: {}", fallback.timeout, err)))?;
        if !(MIN_TIMEOUT..=MAX_TIMEOUT).contains(&timeout) {
            return Err(invalid("fallback.timeout must be between 1s and 120s"));
        }

        if fallback.max_retries > MAX_RETRIES {
            return Err(invalid(format!("fallback.max_retries cannot exceed {}", MAX_RETRIES)));
        }

        if fallback.api_key_env.trim().is_empty() {
            return Err(invalid("fallback.api_key_env cannot be empty"));
        }

        if config.batch.concurrency == 0 {
            return Err(invalid("batch.concurrency must be at least 1"));
        }

        let scoring = &config.scoring;
        let weights = [scoring.blocker, scoring.warning, scoring.info, scoring.near_limit];
        if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
            return Err(invalid("scoring weights must be non-negative numbers"));
        }
        if !(scoring.near_limit_ratio > 0.0 && scoring.near_limit_ratio <= 1.0) {
            return Err(invalid("scoring.near_limit_ratio must be in (0, 1]"));
        }

        if config.optimizer.pacing_interval == 0 {
            return Err(invalid("optimizer.pacing_interval must be at least 1"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message)
        .with_code("FLOW-CONFIG-001")
        .with_suggestion("fix the value in flowbridge.toml or the matching FLOWBRIDGE_* variable")
}
