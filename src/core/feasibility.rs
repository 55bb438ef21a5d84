#![allow(clippy::result_large_err)]

//! Pre-translation go/no-go scoring.
//!
//! The checker only looks at structure. It never calls the generative fallback, so the
//! same input always yields the same report.

use crate::core::error::AppError;
use crate::core::graph::WorkflowGraph;
use crate::core::knowledge::{CapabilitySet, PlatformKnowledge};
use crate::core::platform::{translation_path, Platform, Topology};
use crate::core::platforms::{adapter_for, FeatureUsage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Blocker,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityIssue {
    pub severity: IssueSeverity,
    pub feature: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workaround: Option<String>,
}

impl FeasibilityIssue {
    fn new(severity: IssueSeverity, feature: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            feature: feature.to_string(),
            message: message.into(),
            workaround: None,
        }
    }

    fn workaround(mut self, workaround: impl Into<String>) -> Self {
        self.workaround = Some(workaround.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeasibilityCheck {
    pub feasible: bool,
    pub score: f64,
    pub issues: Vec<FeasibilityIssue>,
    pub suggestions: Vec<String>,
    pub translation_path: String,
    pub node_count: usize,
}

impl FeasibilityCheck {
    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|issue| issue.severity == severity).count()
    }
}

/// Penalties subtracted from 100 per issue. Tunable; only the shape of the score is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub blocker: f64,
    pub warning: f64,
    pub info: f64,
    /// Extra penalty once the node count passes `near_limit_ratio` of the target limit.
    pub near_limit: f64,
    pub near_limit_ratio: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            blocker: 30.0,
            warning: 10.0,
            info: 5.0,
            near_limit: 15.0,
            near_limit_ratio: 0.8,
        }
    }
}

impl ScoringWeights {
    pub fn score(&self, blockers: usize, warnings: usize, infos: usize, near_limit: bool) -> f64 {
        let mut score = 100.0
            - self.blocker * blockers as f64
            - self.warning * warnings as f64
            - self.info * infos as f64;
        if near_limit {
            score -= self.near_limit;
        }
        score.clamp(0.0, 100.0)
    }
}

pub struct FeasibilityChecker {
    knowledge: Arc<PlatformKnowledge>,
    weights: ScoringWeights,
}

impl FeasibilityChecker {
    pub fn new(knowledge: Arc<PlatformKnowledge>, weights: ScoringWeights) -> Self {
        Self { knowledge, weights }
    }

    /// Decode a vendor document and check it. Only malformed input is an error.
    pub fn check(&self, workflow: &Value, source: Platform, target: Platform) -> Result<FeasibilityCheck, AppError> {
        let graph = adapter_for(source).decode(workflow)?;
        Ok(self.check_graph(&graph, source, target))
    }

    pub fn check_graph(&self, graph: &WorkflowGraph, source: Platform, target: Platform) -> FeasibilityCheck {
        let usage = adapter_for(source).detect_features(graph);
        let source_caps = self.knowledge.capabilities(source);
        let target_caps = self.knowledge.capabilities(target);

        let mut issues = feature_issues(&usage, source_caps, target_caps, target);

        let limit = target_caps.max_nodes;
        if usage.node_count > limit {
            issues.push(
                FeasibilityIssue::new(
                    IssueSeverity::Blocker,
                    "maxNodes",
                    format!(
                        "workflow has {} {}s but {} allows at most {}",
                        usage.node_count,
                        source.unit_noun(),
                        target.display_name(),
                        limit
                    ),
                )
                .workaround("split the workflow into smaller workflows"),
            );
        }
        let near_limit = usage.node_count as f64 > self.weights.near_limit_ratio * limit as f64;

        let blockers = issues.iter().filter(|i| i.severity == IssueSeverity::Blocker).count();
        let warnings = issues.iter().filter(|i| i.severity == IssueSeverity::Warning).count();
        let infos = issues.iter().filter(|i| i.severity == IssueSeverity::Info).count();
        let score = self.weights.score(blockers, warnings, infos, near_limit);
        let suggestions = suggestions(&usage, &issues, source, target, near_limit);

        tracing::debug!(
            source = %source,
            target = %target,
            blockers,
            warnings,
            infos,
            score,
            "feasibility checked"
        );

        FeasibilityCheck {
            feasible: blockers == 0,
            score,
            issues,
            suggestions,
            translation_path: translation_path(source, target),
            node_count: usage.node_count,
        }
    }
}

fn names(list: &[String]) -> String {
    list.join(", ")
}

fn feature_issues(
    usage: &FeatureUsage,
    source_caps: &CapabilitySet,
    target_caps: &CapabilitySet,
    target: Platform,
) -> Vec<FeasibilityIssue> {
    let linear = target.topology() == Topology::LinearChain;
    let target_name = target.display_name();
    let mut issues = Vec::new();

    if usage.has_loops() && !target_caps.loops {
        let severity = if linear {
            IssueSeverity::Blocker
        } else {
            IssueSeverity::Warning
        };
        issues.push(
            FeasibilityIssue::new(
                severity,
                "loops",
                format!("{} does not support loops (used by {})", target_name, names(&usage.loops)),
            )
            .workaround("process items one per run, or keep the loop on n8n or Make"),
        );
    }

    if usage.has_custom_code() && !target_caps.custom_code {
        issues.push(
            FeasibilityIssue::new(
                IssueSeverity::Warning,
                "customCode",
                format!(
                    "{} has limited custom code support (used by {})",
                    target_name,
                    names(&usage.custom_code)
                ),
            )
            .workaround("rebuild the logic with built-in formatter steps"),
        );
    }

    if usage.has_conditional_logic() && !target_caps.conditional_logic {
        issues.push(
            FeasibilityIssue::new(
                IssueSeverity::Warning,
                "conditionalLogic",
                format!(
                    "{} cannot branch on conditions (used by {})",
                    target_name,
                    names(&usage.conditionals)
                ),
            )
            .workaround("conditions become filter steps that stop the run"),
        );
    }

    if usage.parallel_branches && !target_caps.parallel_execution {
        issues.push(
            FeasibilityIssue::new(
                IssueSeverity::Warning,
                "parallelExecution",
                format!(
                    "{} cannot run parallel branches (widest fan-out is {})",
                    target_name, usage.max_fan_out
                ),
            )
            .workaround("branches are flattened into one chain; split them into separate workflows if order matters"),
        );
    }

    if usage.has_sub_workflows() && !target_caps.sub_workflows {
        issues.push(
            FeasibilityIssue::new(
                IssueSeverity::Warning,
                "subWorkflows",
                format!(
                    "{} cannot call other workflows (used by {})",
                    target_name,
                    names(&usage.sub_workflows)
                ),
            )
            .workaround("inline the called workflow or trigger it through a webhook"),
        );
    }

    if usage.has_error_handling() {
        if !target_caps.error_handling {
            issues.push(FeasibilityIssue::new(
                IssueSeverity::Warning,
                "errorHandling",
                format!("{} has no error handling for {}", target_name, names(&usage.error_handlers)),
            ));
        } else if source_caps
            .error_handling_granularity
            .is_coarser(target_caps.error_handling_granularity)
        {
            issues.push(FeasibilityIssue::new(
                IssueSeverity::Info,
                "errorHandling",
                format!(
                    "{} handles errors per workflow, not per {}",
                    target_name,
                    match source_caps.error_handling_granularity {
                        crate::core::knowledge::ErrorHandlingGranularity::Module => "module",
                        _ => "node",
                    }
                ),
            ));
        }
    }

    issues
}

fn suggestions(
    usage: &FeatureUsage,
    issues: &[FeasibilityIssue],
    source: Platform,
    target: Platform,
    near_limit: bool,
) -> Vec<String> {
    let mut suggestions = Vec::new();
    if issues.is_empty() {
        suggestions.push(format!(
            "all features used by this workflow are supported by {}",
            target.display_name()
        ));
    }
    if issues.iter().any(|issue| issue.severity == IssueSeverity::Blocker) {
        suggestions.push("resolve the blocker issues before translating".to_string());
    }
    let complex = usage.has_loops() || usage.has_custom_code() || usage.parallel_branches || usage.has_conditional_logic();
    if target.topology() == Topology::LinearChain && complex {
        let intermediate = if source == Platform::Make { Platform::N8n } else { Platform::Make };
        suggestions.push(format!(
            "consider {} instead of {} for workflows with complex logic",
            intermediate.display_name(),
            target.display_name()
        ));
    }
    if near_limit {
        suggestions.push(format!(
            "the workflow is close to the {} size limit; consider splitting it",
            target.display_name()
        ));
    }
    if !usage.http_calls.is_empty() && target == Platform::N8n {
        suggestions.push("translate with optimize enabled to replace generic HTTP calls with native nodes".to_string());
    }
    suggestions
}
