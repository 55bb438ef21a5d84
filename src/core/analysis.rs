#![allow(clippy::result_large_err)]

//! Advisory operations that never translate anything: path complexity, platform
//! recommendation and single-workflow complexity analysis.

use crate::core::error::AppError;
use crate::core::expression::count_expressions;
use crate::core::graph::NodeRole;
use crate::core::knowledge::{CapabilitySet, Difficulty, PlatformKnowledge};
use crate::core::platform::{translation_path, Platform};
use crate::core::platforms::{adapter_for, FeatureUsage, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationComplexity {
    pub translation_path: String,
    pub difficulty: Difficulty,
    pub success_rate: f64,
    pub common_issues: Vec<String>,
}

pub fn translation_complexity(knowledge: &PlatformKnowledge, source: Platform, target: Platform) -> TranslationComplexity {
    let label = translation_path(source, target);
    if source == target {
        return TranslationComplexity {
            translation_path: label,
            difficulty: Difficulty::Trivial,
            success_rate: 1.0,
            common_issues: Vec::new(),
        };
    }
    match knowledge.translation_path(source, target) {
        Some(path) => TranslationComplexity {
            translation_path: label,
            difficulty: path.difficulty,
            success_rate: path.success_rate,
            common_issues: path.common_issues.clone(),
        },
        None => TranslationComplexity {
            translation_path: label,
            difficulty: Difficulty::Medium,
            success_rate: 0.75,
            common_issues: vec!["no recorded history for this translation path".to_string()],
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TechnicalLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformRequirements {
    pub needs_custom_code: bool,
    pub needs_loops: bool,
    pub needs_complex_logic: bool,
    pub team_technical_level: TechnicalLevel,
    pub self_hosting_preferred: bool,
    pub budget_level: BudgetLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformScore {
    pub platform: Platform,
    pub score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRecommendation {
    pub recommended_platform: Platform,
    pub scores: Vec<PlatformScore>,
    pub reasoning: String,
}

const BASE_SCORE: f64 = 50.0;

struct Tally {
    score: f64,
    reasons: Vec<String>,
    strengths: Vec<String>,
}

impl Tally {
    fn add(&mut self, delta: f64, reason: impl Into<String>) {
        let reason = reason.into();
        self.score += delta;
        if delta > 0.0 {
            self.strengths.push(reason.clone());
        }
        self.reasons.push(format!("{:+} {}", delta, reason));
    }
}

fn level_bonus(platform: Platform, level: TechnicalLevel) -> (f64, &'static str) {
    match (level, platform) {
        (TechnicalLevel::Beginner, Platform::Zapier) => (15.0, "simplest editor for non-technical teams"),
        (TechnicalLevel::Beginner, Platform::Make) => (5.0, "visual editor is approachable"),
        (TechnicalLevel::Beginner, Platform::N8n) => (-5.0, "expects some technical background"),
        (TechnicalLevel::Intermediate, Platform::Make) => (10.0, "balances power and ease of use"),
        (TechnicalLevel::Intermediate, _) => (5.0, "usable by intermediate teams"),
        (TechnicalLevel::Advanced, Platform::N8n) => (15.0, "full control for technical teams"),
        (TechnicalLevel::Advanced, Platform::Make) => (5.0, "advanced mapping and functions"),
        (TechnicalLevel::Advanced, Platform::Zapier) => (-5.0, "limited room for advanced users"),
    }
}

fn budget_bonus(platform: Platform, budget: BudgetLevel) -> (f64, &'static str) {
    match (budget, platform) {
        (BudgetLevel::Low, Platform::N8n) => (10.0, "free when self-hosted"),
        (BudgetLevel::Low, Platform::Make) => (5.0, "low cost per operation"),
        (BudgetLevel::Low, Platform::Zapier) => (-10.0, "most expensive per task"),
        (BudgetLevel::Medium, Platform::Zapier) => (0.0, "pricing fits a medium budget"),
        (BudgetLevel::Medium, _) => (5.0, "pricing fits a medium budget"),
        (BudgetLevel::High, Platform::Zapier) => (10.0, "budget allows the largest app catalog"),
        (BudgetLevel::High, Platform::Make) => (5.0, "budget allows higher operation tiers"),
        (BudgetLevel::High, Platform::N8n) => (0.0, "budget allows managed hosting"),
    }
}

fn score_platform(platform: Platform, caps: &CapabilitySet, requirements: &PlatformRequirements) -> PlatformScore {
    let mut tally = Tally {
        score: BASE_SCORE,
        reasons: Vec::new(),
        strengths: Vec::new(),
    };
    if requirements.needs_custom_code {
        if caps.custom_code {
            tally.add(10.0, "supports custom code");
        } else {
            tally.add(-10.0, "limited custom code");
        }
    }
    if requirements.needs_loops {
        if caps.loops {
            tally.add(10.0, "supports loops");
        } else {
            tally.add(-15.0, "no loops");
        }
    }
    if requirements.needs_complex_logic {
        match (caps.conditional_logic, caps.parallel_execution) {
            (true, true) => tally.add(10.0, "branching and parallel paths"),
            (true, false) => tally.add(5.0, "conditional logic without parallel paths"),
            _ => tally.add(-10.0, "linear workflows only"),
        }
    }
    if requirements.self_hosting_preferred {
        if caps.self_hosted {
            tally.add(15.0, "can be self-hosted");
        } else {
            tally.add(-10.0, "cloud only");
        }
    }
    let (delta, reason) = level_bonus(platform, requirements.team_technical_level);
    tally.add(delta, reason);
    let (delta, reason) = budget_bonus(platform, requirements.budget_level);
    tally.add(delta, reason);

    PlatformScore {
        platform,
        score: tally.score.clamp(0.0, 100.0),
        reasons: if tally.strengths.is_empty() {
            tally.reasons
        } else {
            tally.strengths
        },
    }
}

/// Additive score per platform; ties go to the earlier platform in n8n, Make, Zapier order.
pub fn suggest_best_platform(knowledge: &PlatformKnowledge, requirements: &PlatformRequirements) -> PlatformRecommendation {
    let mut scores: Vec<PlatformScore> = Platform::ALL
        .iter()
        .map(|&platform| score_platform(platform, knowledge.capabilities(platform), requirements))
        .collect();
    // Stable sort keeps n8n > make > zapier for equal scores.
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));

    let best = &scores[0];
    let reasoning = format!(
        "{} scores highest ({}/100): {}",
        best.platform.display_name(),
        best.score,
        best.reasons.join("; ")
    );
    PlatformRecommendation {
        recommended_platform: best.platform,
        reasoning,
        scores,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityMetrics {
    pub node_count: usize,
    pub connection_count: usize,
    pub max_fan_out: usize,
    pub depth: usize,
    pub expression_count: usize,
    pub components: usize,
    pub features: FeatureUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityAnalysis {
    pub complexity_score: f64,
    pub level: ComplexityLevel,
    pub metrics: ComplexityMetrics,
    pub suggestions: Vec<String>,
    pub potential_issues: Vec<String>,
}

/// Score how hard a workflow is to maintain and translate. Only malformed documents are errors.
pub fn analyze_workflow_complexity(
    knowledge: &PlatformKnowledge,
    workflow: &Value,
    platform: Platform,
) -> Result<ComplexityAnalysis, AppError> {
    let adapter = adapter_for(platform);
    let graph = adapter.decode(workflow)?;
    let usage = adapter.detect_features(&graph);
    let caps = knowledge.capabilities(platform);

    let expression_count: usize = graph
        .nodes
        .iter()
        .map(|node| count_expressions(&Value::Object(node.parameters.clone())))
        .sum();
    let metrics = ComplexityMetrics {
        node_count: usage.node_count,
        connection_count: graph.edges.len(),
        max_fan_out: usage.max_fan_out,
        depth: graph.depth(),
        expression_count,
        components: graph.component_count(),
        features: usage.clone(),
    };

    let mut score = (metrics.node_count as f64 * 3.0).min(30.0)
        + (metrics.max_fan_out.saturating_sub(1) as f64 * 5.0).min(15.0)
        + (metrics.depth as f64 * 2.0).min(15.0)
        + (metrics.expression_count as f64).min(10.0);
    if usage.has_custom_code() {
        score += 10.0;
    }
    if usage.has_loops() {
        score += 10.0;
    }
    if usage.has_conditional_logic() {
        score += 5.0;
    }
    if usage.has_sub_workflows() {
        score += 5.0;
    }
    let score = score.clamp(0.0, 100.0);
    let level = if score < 30.0 {
        ComplexityLevel::Low
    } else if score < 60.0 {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::High
    };

    let mut issues = Vec::new();
    if metrics.node_count == 0 {
        issues.push("workflow has no nodes".to_string());
    } else {
        let has_trigger = graph.nodes.iter().any(|node| {
            node.role == NodeRole::Trigger || adapter.classify(&node.type_id) == NodeKind::Trigger
        });
        if !has_trigger {
            issues.push(format!("no trigger {} found", platform.unit_noun()));
        }
    }
    let executable = graph
        .nodes
        .iter()
        .filter(|node| adapter.classify(&node.type_id) != NodeKind::Note)
        .count();
    let notes = graph.len() - executable;
    if metrics.components > notes + 1 && executable > 1 {
        issues.push(format!("workflow has {} disconnected parts", metrics.components - notes));
    }
    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|node| !seen.insert(node.name.as_str()))
        .map(|node| node.name.as_str())
        .collect();
    if !duplicates.is_empty() {
        issues.push(format!("duplicate {} names: {}", platform.unit_noun(), duplicates.join(", ")));
    }
    if metrics.node_count as f64 > 0.8 * caps.max_nodes as f64 {
        issues.push(format!(
            "{} of {} allowed {}s used",
            metrics.node_count,
            caps.max_nodes,
            platform.unit_noun()
        ));
    }

    let mut suggestions = Vec::new();
    if metrics.node_count > 20 {
        suggestions.push("split the workflow into smaller workflows".to_string());
    }
    if metrics.max_fan_out > 3 {
        suggestions.push("reduce wide fan-out points; they are hard to translate to linear platforms".to_string());
    }
    if usage.has_custom_code() {
        suggestions.push(format!(
            "document the custom code in {}; it rarely translates cleanly",
            usage.custom_code.join(", ")
        ));
    }
    if metrics.expression_count > 10 {
        suggestions.push("move repeated expressions into a single data-preparation step".to_string());
    }
    if !usage.has_error_handling() && metrics.node_count > 5 {
        suggestions.push("add error handling to side-effecting steps".to_string());
    }
    if suggestions.is_empty() && issues.is_empty() {
        suggestions.push("workflow is straightforward; no changes needed".to_string());
    }

    Ok(ComplexityAnalysis {
        complexity_score: score,
        level,
        metrics,
        suggestions,
        potential_issues: issues,
    })
}
