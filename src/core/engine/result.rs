use crate::core::platform::Platform;
use crate::core::platforms::PlatformWorkflow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_optimize() -> bool {
    true
}

/// Caller switches for a single translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOptions {
    #[serde(default = "default_optimize")]
    pub optimize: bool,
    #[serde(default)]
    pub preserve_names: bool,
    /// Report parameters a mapping rule does not cover instead of dropping them quietly.
    #[serde(default)]
    pub strict_mode: bool,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            optimize: default_optimize(),
            preserve_names: false,
            strict_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub workflow: Value,
    pub source: Platform,
    pub target: Platform,
    pub options: TranslationOptions,
}

impl TranslationRequest {
    pub fn new(workflow: Value, source: Platform, target: Platform) -> Self {
        Self {
            workflow,
            source,
            target,
            options: TranslationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TranslationOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMetadata {
    pub translated_nodes: usize,
    pub skipped_nodes: usize,
    /// Nodes produced by the generative fallback rather than a mapping rule.
    pub fallback_nodes: usize,
    pub optimizations_applied: Vec<String>,
    pub accuracy_score: f64,
    pub feasibility_score: f64,
    pub translation_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResult {
    pub success: bool,
    pub workflow: Option<PlatformWorkflow>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub metadata: TranslationMetadata,
}

impl TranslationResult {
    /// A structural failure: no workflow, one error.
    pub fn failure(error: impl Into<String>, translation_time_ms: u64) -> Self {
        Self {
            success: false,
            workflow: None,
            warnings: Vec::new(),
            errors: vec![error.into()],
            metadata: TranslationMetadata {
                translation_time_ms,
                ..Default::default()
            },
        }
    }
}

/// Heuristic quality of a translation, clamped to 0..=100.
pub fn accuracy_score(skipped: usize, total: usize, warnings: usize) -> f64 {
    let skipped_share = if total == 0 {
        0.0
    } else {
        skipped as f64 / total as f64
    };
    (100.0 - 10.0 * skipped_share - 5.0 * warnings as f64).clamp(0.0, 100.0)
}
