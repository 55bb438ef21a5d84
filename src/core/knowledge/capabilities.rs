use crate::core::platform::Platform;
use serde::{Deserialize, Serialize};

/// How finely a platform lets a workflow react to failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandlingGranularity {
    Node,
    Module,
    Workflow,
}

impl ErrorHandlingGranularity {
    fn rank(&self) -> u8 {
        match self {
            ErrorHandlingGranularity::Node | ErrorHandlingGranularity::Module => 2,
            ErrorHandlingGranularity::Workflow => 1,
        }
    }

    /// True when moving from `self` to `other` loses per-unit error handling.
    pub fn is_coarser(&self, other: ErrorHandlingGranularity) -> bool {
        other.rank() < self.rank()
    }
}

/// Feature flags and limits for a single platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySet {
    pub custom_code: bool,
    pub loops: bool,
    pub conditional_logic: bool,
    pub parallel_execution: bool,
    pub sub_workflows: bool,
    pub error_handling: bool,
    #[serde(default)]
    pub webhooks: bool,
    #[serde(default)]
    pub self_hosted: bool,
    pub max_nodes: usize,
    pub error_handling_granularity: ErrorHandlingGranularity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformCapabilities {
    pub n8n: CapabilitySet,
    pub make: CapabilitySet,
    pub zapier: CapabilitySet,
}

impl PlatformCapabilities {
    pub fn get(&self, platform: Platform) -> &CapabilitySet {
        match platform {
            Platform::N8n => &self.n8n,
            Platform::Make => &self.make,
            Platform::Zapier => &self.zapier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Trivial,
    Easy,
    Medium,
    Hard,
}

/// Static expectations for translating between two platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationPath {
    pub source: Platform,
    pub target: Platform,
    pub difficulty: Difficulty,
    pub success_rate: f64,
    #[serde(default)]
    pub common_issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDocument {
    pub platforms: PlatformCapabilities,
    #[serde(default)]
    pub translation_paths: Vec<TranslationPath>,
}
