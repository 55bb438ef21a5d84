//! Zapier zaps: a strictly linear step array.

use crate::core::error::AppError;
use crate::core::graph::{GraphNode, NodeRole, WorkflowGraph};
use crate::core::platform::Platform;
use crate::core::platforms::{
    malformed, split_app_event, BuildOptions, BuildOutput, NodeKind, PlatformAdapter, PlatformWorkflow,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

pub mod optimize;

/// Step parameter carrying a branch condition until the optimizer turns it into a filter.
pub const CONDITION_PARAM: &str = "__flowbridgeCondition";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZapierZap {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<ZapierStep>,
    #[serde(default = "draft_status")]
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZapierStepType {
    Trigger,
    Action,
    Search,
    Path,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZapierStep {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: ZapierStepType,
    pub app: String,
    #[serde(default)]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ZapierStep {
    pub fn type_id(&self) -> String {
        if self.event.is_empty() {
            self.app.clone()
        } else {
            format!("{}:{}", self.app, self.event)
        }
    }
}

pub fn draft_status() -> String {
    "draft".to_string()
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "step id must be a string or number, got {}",
            other
        ))),
    }
}

impl ZapierZap {
    pub fn to_graph(&self) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new(self.title.clone());
        let mut previous = None;
        for step in &self.steps {
            let role = match step.step_type {
                ZapierStepType::Trigger => NodeRole::Trigger,
                _ => NodeRole::Action,
            };
            let name = step.title.clone().unwrap_or_else(|| step.type_id());
            let node = GraphNode::new(step.id.clone(), name, step.type_id(), step.parameters.clone(), role);
            let index = graph.add_node(node);
            if let Some(previous) = previous {
                graph.add_edge(previous, index, 0, None);
            }
            previous = Some(index);
        }
        graph
    }
}

pub struct ZapierAdapter;

fn keys_are_unique(graph: &WorkflowGraph) -> bool {
    let mut seen = HashSet::new();
    graph
        .nodes
        .iter()
        .all(|node| !node.key.is_empty() && seen.insert(node.key.as_str()))
}

impl ZapierAdapter {
    /// Step ids by node index: the source keys when they can be kept, else
    /// positions in the depth-first linearization.
    fn step_ids(graph: &WorkflowGraph, options: BuildOptions) -> Vec<String> {
        if options.keep_source_keys && keys_are_unique(graph) {
            return graph.nodes.iter().map(|node| node.key.clone()).collect();
        }
        let mut ids = vec![String::new(); graph.len()];
        for (position, index) in graph.traversal_order().into_iter().enumerate() {
            ids[index] = (position + 1).to_string();
        }
        ids
    }
}

impl PlatformAdapter for ZapierAdapter {
    fn platform(&self) -> Platform {
        Platform::Zapier
    }

    fn decode(&self, document: &Value) -> Result<WorkflowGraph, AppError> {
        let zap: ZapierZap =
            serde_json::from_value(document.clone()).map_err(|err| malformed(Platform::Zapier, err))?;
        Ok(zap.to_graph())
    }

    fn classify(&self, type_id: &str) -> NodeKind {
        let (app, event) = split_app_event(type_id);
        match app {
            "code" => NodeKind::Code,
            "filter" | "paths" => NodeKind::Conditional,
            "looping" => NodeKind::Loop,
            "sub-zap" => NodeKind::SubWorkflow,
            "webhook" if event == "catch_hook" || event == "catch_raw_hook" => NodeKind::Trigger,
            "webhook" => NodeKind::Http,
            "schedule" => NodeKind::Trigger,
            _ if event.starts_with("new_") => NodeKind::Trigger,
            _ => NodeKind::Other,
        }
    }

    fn node_keys(&self, graph: &WorkflowGraph, options: BuildOptions) -> Vec<String> {
        Self::step_ids(graph, options)
    }

    fn build(&self, graph: &WorkflowGraph, options: BuildOptions) -> BuildOutput {
        let mut warnings = Vec::new();
        for (index, node) in graph.nodes.iter().enumerate() {
            let fan_out = graph.out_degree(index);
            if fan_out > 1 {
                warnings.push(format!(
                    "'{}' branches into {} paths; Zapier steps are linear, so the branches were chained depth-first",
                    node.name, fan_out
                ));
            }
        }

        if options.keep_source_keys && !keys_are_unique(graph) {
            warnings.push("step ids in the source are blank or repeated; steps were renumbered".to_string());
        }
        let ids = Self::step_ids(graph, options);
        let order = graph.traversal_order();
        let mut steps = Vec::with_capacity(order.len());
        for (position, index) in order.into_iter().enumerate() {
            let node = &graph.nodes[index];
            let step_type = if position == 0 && node.role == NodeRole::Trigger {
                ZapierStepType::Trigger
            } else {
                if node.role == NodeRole::Trigger {
                    warnings.push(format!(
                        "'{}' is a trigger but is not the first step; it was converted to an action",
                        node.name
                    ));
                }
                ZapierStepType::Action
            };
            if position == 0 && step_type != ZapierStepType::Trigger {
                warnings.push(format!(
                    "the zap starts with '{}', which is not a trigger; Zapier requires a trigger first",
                    node.name
                ));
            }

            let mut parameters = node.parameters.clone();
            if let Some(condition) = graph.incoming(index).iter().find_map(|edge| edge.condition.clone()) {
                parameters.insert(CONDITION_PARAM.to_string(), condition);
            }
            let (app, event) = split_app_event(&node.type_id);
            steps.push(ZapierStep {
                id: ids[index].clone(),
                step_type,
                app: app.to_string(),
                event: event.to_string(),
                title: options.preserve_names.then(|| node.name.clone()),
                parameters,
            });
        }

        BuildOutput {
            workflow: PlatformWorkflow::Zapier(ZapierZap {
                title: graph.name.clone(),
                steps,
                status: draft_status(),
            }),
            warnings,
        }
    }
}
