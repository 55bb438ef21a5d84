//! Translation of a single workflow between platforms.
//!
//! The engine decodes the source document into a [`WorkflowGraph`], maps every node
//! through the rule table (or the generative fallback), rewrites expressions, rebuilds
//! the target connection structure and optionally runs the optimizer. Lossy decisions
//! become warnings; only structural problems become errors.

use crate::core::expression::{self, ExpressionContext, PendingExpression};
use crate::core::feasibility::{FeasibilityChecker, ScoringWeights};
use crate::core::fallback::{FallbackContext, GenerativeFallback};
use crate::core::graph::{GraphNode, WorkflowGraph};
use crate::core::knowledge::PlatformKnowledge;
use crate::core::optimizer::{OptimizerSettings, PlatformOptimizer};
use crate::core::platforms::{adapter_for, local_type_name, BuildOptions, NodeKind};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub mod batch;
pub mod result;

pub use batch::BatchResult;
pub use result::{accuracy_score, TranslationMetadata, TranslationOptions, TranslationRequest, TranslationResult};

/// Tunables injected into the engine at construction.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub optimizer: OptimizerSettings,
    pub scoring: ScoringWeights,
}

pub struct TranslationEngine {
    knowledge: Arc<PlatformKnowledge>,
    fallback: Arc<dyn GenerativeFallback>,
    checker: FeasibilityChecker,
    optimizer: PlatformOptimizer,
}

/// Per-call bookkeeping while nodes are mapped.
#[derive(Default)]
struct Mapping {
    warnings: Vec<String>,
    dropped: HashSet<usize>,
    skipped: usize,
    translated: usize,
    synthesized: HashSet<usize>,
}

impl TranslationEngine {
    pub fn new(
        knowledge: Arc<PlatformKnowledge>,
        fallback: Arc<dyn GenerativeFallback>,
        settings: EngineSettings,
    ) -> Self {
        let checker = FeasibilityChecker::new(knowledge.clone(), settings.scoring);
        let optimizer = PlatformOptimizer::new(knowledge.clone(), settings.optimizer);
        Self {
            knowledge,
            fallback,
            checker,
            optimizer,
        }
    }

    pub fn knowledge(&self) -> &Arc<PlatformKnowledge> {
        &self.knowledge
    }

    pub fn fallback(&self) -> &Arc<dyn GenerativeFallback> {
        &self.fallback
    }

    pub fn checker(&self) -> &FeasibilityChecker {
        &self.checker
    }

    pub fn optimizer(&self) -> &PlatformOptimizer {
        &self.optimizer
    }

    /// Translate one workflow. Never fails: structural problems come back as a result
    /// with `success == false`.
    pub async fn translate(&self, request: TranslationRequest, cancel: &CancellationToken) -> TranslationResult {
        let span = tracing::info_span!(
            "translate",
            source = %request.source,
            target = %request.target
        );
        let started = Instant::now();
        let mut result = self.translate_inner(&request, cancel).instrument(span).await;
        result.metadata.translation_time_ms = started.elapsed().as_millis() as u64;
        result
    }

    async fn translate_inner(&self, request: &TranslationRequest, cancel: &CancellationToken) -> TranslationResult {
        let (source, target) = (request.source, request.target);
        let source_adapter = adapter_for(source);
        let graph = match source_adapter.decode(&request.workflow) {
            Ok(graph) => graph,
            Err(err) => return TranslationResult::failure(err.message, 0),
        };

        let notes: HashSet<usize> = (0..graph.len())
            .filter(|&index| source_adapter.classify(&graph.nodes[index].type_id) == NodeKind::Note)
            .collect();
        let total = graph.len() - notes.len();
        if total == 0 {
            return TranslationResult::failure(
                format!("workflow has no {}s to translate", source.unit_noun()),
                0,
            );
        }

        let feasibility = self.checker.check_graph(&graph, source, target);
        let same_platform = source == target;

        let mut mapping = Mapping::default();
        if !same_platform {
            mapping.dropped = notes.clone();
            for &index in &notes {
                mapping
                    .warnings
                    .push(format!("documentation note '{}' was not translated", graph.nodes[index].name));
            }
        }

        let mut working = graph.clone();
        if same_platform {
            mapping.warnings.push(format!(
                "source and target are both {}; {}s copied unchanged",
                target.display_name(),
                source.unit_noun()
            ));
            mapping.translated = total;
        } else {
            for index in graph.traversal_order() {
                if notes.contains(&index) {
                    continue;
                }
                self.map_node(&graph, index, &mut working, request, &mut mapping, cancel)
                    .await;
            }
        }

        let mut pruned = working.without_nodes(&mapping.dropped);
        let synthesized_keys: HashSet<String> = mapping
            .synthesized
            .iter()
            .map(|&index| graph.nodes[index].key.clone())
            .collect();

        let preserve_names = request.options.preserve_names || same_platform;
        if !preserve_names {
            for node in &mut pruned.nodes {
                node.name = name_from_type(&node.type_id);
            }
        }

        let target_adapter = adapter_for(target);
        let build_options = BuildOptions {
            preserve_names,
            keep_source_keys: same_platform,
        };
        if !same_platform {
            let target_keys = target_adapter.node_keys(&pruned, build_options);
            self.rewrite_expressions(&mut pruned, &target_keys, &synthesized_keys, request, &mut mapping, cancel)
                .await;
        }

        let build = target_adapter.build(&pruned, build_options);
        let mut warnings = mapping.warnings;
        warnings.extend(build.warnings);

        let mut workflow = build.workflow;
        let mut optimizations_applied = Vec::new();
        if request.options.optimize {
            let report = self.optimizer.optimize(workflow);
            workflow = report.workflow;
            optimizations_applied = report.applied;
        }

        for warning in &warnings {
            tracing::warn!(warning = %warning, "translation warning");
        }
        tracing::info!(
            translated = mapping.translated,
            skipped = mapping.skipped,
            warnings = warnings.len(),
            "workflow translated"
        );

        TranslationResult {
            success: true,
            workflow: Some(workflow),
            metadata: TranslationMetadata {
                translated_nodes: mapping.translated,
                skipped_nodes: mapping.skipped,
                fallback_nodes: mapping.synthesized.len(),
                optimizations_applied,
                accuracy_score: accuracy_score(mapping.skipped, total, warnings.len()),
                feasibility_score: feasibility.score,
                translation_time_ms: 0,
            },
            warnings,
            errors: Vec::new(),
        }
    }

    async fn map_node(
        &self,
        graph: &WorkflowGraph,
        index: usize,
        working: &mut WorkflowGraph,
        request: &TranslationRequest,
        mapping: &mut Mapping,
        cancel: &CancellationToken,
    ) {
        let (source, target) = (request.source, request.target);
        let node = &graph.nodes[index];
        let rule = self.knowledge.lookup_rule(source, target, &node.type_id);

        if let Some(rule) = rule.filter(|rule| !rule.requires_generative_fallback) {
            let mapped = rule.map_parameters(&node.parameters);
            if request.options.strict_mode && !mapped.dropped.is_empty() {
                mapping.warnings.push(format!(
                    "{} '{}': parameters not carried over: {}",
                    source.unit_noun(),
                    node.name,
                    mapped.dropped.join(", ")
                ));
            }
            let out = &mut working.nodes[index];
            out.type_id = rule.target_type.clone();
            out.parameters = mapped.parameters;
            out.settings.clear();
            if let Some(role) = rule.role {
                out.role = role;
            }
            mapping.translated += 1;
            tracing::debug!(node = %node.name, target_type = %rule.target_type, "mapped by rule");
            return;
        }

        let context = FallbackContext {
            source_platform: source,
            target_platform: target,
            workflow_name: graph.name.clone(),
            upstream_types: graph
                .predecessors(index)
                .into_iter()
                .map(|i| graph.nodes[i].type_id.clone())
                .collect(),
            downstream_types: graph
                .successors(index)
                .into_iter()
                .map(|i| graph.nodes[i].type_id.clone())
                .collect(),
        };
        let reason = if rule.is_some() {
            "its mapping needs the generative fallback"
        } else {
            "no mapping rule exists"
        };

        match self.fallback.synthesize(node, &context, cancel).await {
            Ok(synthesized) => {
                let out = &mut working.nodes[index];
                out.type_id = synthesized.type_id.clone();
                out.parameters = synthesized.parameters;
                out.settings.clear();
                if let Some(name) = synthesized.name.filter(|name| !name.trim().is_empty()) {
                    if !request.options.preserve_names {
                        out.name = name;
                    }
                }
                mapping.translated += 1;
                mapping.synthesized.insert(index);
                mapping.warnings.push(format!(
                    "{} '{}' ({}) was synthesized by the generative fallback because {}; review it",
                    source.unit_noun(),
                    node.name,
                    node.type_id,
                    reason
                ));
                tracing::debug!(node = %node.name, target_type = %synthesized.type_id, "synthesized by fallback");
            }
            Err(err) => {
                mapping.dropped.insert(index);
                mapping.skipped += 1;
                mapping.warnings.push(format!(
                    "{} '{}' ({}) skipped: {} for {} and the generative fallback failed: {}",
                    source.unit_noun(),
                    node.name,
                    node.type_id,
                    reason,
                    crate::core::platform::translation_path(source, target),
                    err
                ));
            }
        }
    }

    async fn rewrite_expressions(
        &self,
        pruned: &mut WorkflowGraph,
        target_keys: &[String],
        synthesized_keys: &HashSet<String>,
        request: &TranslationRequest,
        mapping: &mut Mapping,
        cancel: &CancellationToken,
    ) {
        let (source, target) = (request.source, request.target);
        let mut context = ExpressionContext {
            nodes: pruned
                .nodes
                .iter()
                .zip(target_keys)
                .map(|(node, key)| (node.key.clone(), key.clone()))
                .collect(),
            ..Default::default()
        };

        for index in 0..pruned.len() {
            if synthesized_keys.contains(&pruned.nodes[index].key) {
                continue;
            }
            context.upstream = pruned
                .predecessors(index)
                .first()
                .and_then(|&p| target_keys.get(p))
                .cloned();

            let mut parameters = Value::Object(std::mem::take(&mut pruned.nodes[index].parameters));
            let summary = expression::rewrite_value(&mut parameters, source, target, &context);
            for pending in summary.pending {
                self.resolve_pending(&mut parameters, &pending, &pruned.nodes[index], request, &context, mapping, cancel)
                    .await;
            }
            if let Value::Object(map) = parameters {
                pruned.nodes[index].parameters = map;
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve_pending(
        &self,
        parameters: &mut Value,
        pending: &PendingExpression,
        node: &GraphNode,
        request: &TranslationRequest,
        context: &ExpressionContext,
        mapping: &mut Mapping,
        cancel: &CancellationToken,
    ) {
        let (source, target) = (request.source, request.target);
        match self
            .fallback
            .translate_expression(&pending.original, source, target, context, cancel)
            .await
        {
            Ok(translated) => {
                replace_string(parameters, &pending.partial, &translated);
                tracing::debug!(node = %node.name, "expression translated by fallback");
            }
            Err(err) => mapping.warnings.push(format!(
                "expression '{}' in '{}' kept as '{}': {} ({})",
                pending.original, node.name, pending.partial, pending.reason, err
            )),
        }
    }
}

fn replace_string(value: &mut Value, from: &str, to: &str) {
    match value {
        Value::String(text) if text == from => *text = to.to_string(),
        Value::Array(items) => items.iter_mut().for_each(|item| replace_string(item, from, to)),
        Value::Object(map) => map.values_mut().for_each(|item| replace_string(item, from, to)),
        _ => {}
    }
}

/// Human readable node name derived from a type identifier
/// (`n8n-nodes-base.httpRequest` becomes `Http Request`).
pub fn name_from_type(type_id: &str) -> String {
    let local = local_type_name(type_id);
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in local.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    let name = words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        type_id.to_string()
    } else {
        name
    }
}
