use crate::core::feasibility::ScoringWeights;
use crate::core::optimizer::OptimizerSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

pub const CONFIG_FILE_NAME: &str = "flowbridge.toml";
pub const DEFAULT_API_KEY_ENV: &str = "FLOWBRIDGE_FALLBACK_API_KEY";

/// Main configuration loaded from flowbridge.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FlowbridgeConfig {
    /// Generative fallback service
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Batch translation
    #[serde(default)]
    pub batch: BatchConfig,

    /// Knowledge table overrides
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    #[serde(default)]
    pub optimizer: OptimizerSettings,

    /// Feasibility score weights
    #[serde(default)]
    pub scoring: ScoringWeights,
}

/// Generative fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Completion endpoint; the fallback is disabled when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-attempt timeout in humantime form (`20s`, `1m`)
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Retries on transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Workflows translated at the same time
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Paths replacing the bundled knowledge tables
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KnowledgeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<PathBuf>,
}

fn default_model() -> String {
    "workflow-translator".to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout() -> String {
    "20s".to_string()
}

fn default_max_retries() -> u32 {
    1
}

fn default_concurrency() -> usize {
    4
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            endpoint: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            concurrency: default_concurrency(),
        }
    }
}

impl FallbackConfig {
    /// Parsed per-attempt timeout.
    pub fn timeout_duration(&self) -> Result<std::time::Duration, humantime::DurationError> {
        humantime::parse_duration(self.timeout.trim())
    }

    /// Bearer token read from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint
            .as_deref()
            .is_some_and(|endpoint| !endpoint.trim().is_empty())
    }
}
