//! n8n workflows: a node array plus a name-keyed adjacency map.

use crate::core::error::AppError;
use crate::core::graph::{GraphNode, NodeRole, WorkflowGraph};
use crate::core::platform::Platform;
use crate::core::platforms::{
    local_type_name, malformed, BuildOptions, BuildOutput, NodeKind, PlatformAdapter, PlatformWorkflow,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

pub mod optimize;

pub const START_X: f64 = 250.0;
pub const START_Y: f64 = 300.0;
pub const NODE_SPACING: f64 = 200.0;
pub const STICKY_NOTE_TYPE: &str = "n8n-nodes-base.stickyNote";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nWorkflow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<N8nNode>,
    #[serde(default)]
    pub connections: IndexMap<String, IndexMap<String, Vec<Vec<N8nConnection>>>>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nNode {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "default_type_version")]
    pub type_version: Value,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Credentials, error flags, notes and anything else n8n attaches.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct N8nConnection {
    pub node: String,
    #[serde(rename = "type", default = "main_connection")]
    pub kind: String,
    #[serde(default)]
    pub index: usize,
}

fn default_type_version() -> Value {
    json!(1)
}

fn main_connection() -> String {
    "main".to_string()
}

pub fn is_sticky_note(node_type: &str) -> bool {
    node_type == STICKY_NOTE_TYPE
}

pub fn is_trigger_type(node_type: &str) -> bool {
    let local = local_type_name(node_type);
    local.ends_with("Trigger") || matches!(local, "webhook" | "cron" | "interval" | "start")
}

impl N8nWorkflow {
    pub fn to_graph(&self) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new(self.name.clone());
        for node in &self.nodes {
            let role = if is_trigger_type(&node.node_type) {
                NodeRole::Trigger
            } else {
                NodeRole::Action
            };
            let mut graph_node = GraphNode::new(
                node.name.clone(),
                node.name.clone(),
                node.node_type.clone(),
                node.parameters.clone(),
                role,
            );
            graph_node.position = Some(node.position);
            graph_node.settings = node.extra.clone();
            graph_node
                .settings
                .insert("typeVersion".to_string(), node.type_version.clone());
            graph.add_node(graph_node);
        }

        for (source, outputs) in &self.connections {
            let Some(from) = graph.index_of_key(source) else {
                tracing::warn!(node = %source, "connection from unknown n8n node ignored");
                continue;
            };
            let Some(main) = outputs.get("main") else {
                continue;
            };
            for (slot, targets) in main.iter().enumerate() {
                for target in targets {
                    match graph.index_of_key(&target.node) {
                        Some(to) => graph.add_edge(from, to, slot, None),
                        None => {
                            tracing::warn!(node = %target.node, "connection to unknown n8n node ignored")
                        }
                    }
                }
            }
        }
        graph
    }
}

/// Node names made unique the way the n8n editor does it (`Slack`, `Slack1`, ...).
pub(crate) fn unique_names(graph: &WorkflowGraph) -> Vec<String> {
    let mut used = HashSet::new();
    graph
        .nodes
        .iter()
        .map(|node| {
            let base = match node.name.trim() {
                "" => "Node".to_string(),
                trimmed => trimmed.to_string(),
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while used.contains(&candidate) {
                candidate = format!("{}{}", base, suffix);
                suffix += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

pub struct N8nAdapter;

impl PlatformAdapter for N8nAdapter {
    fn platform(&self) -> Platform {
        Platform::N8n
    }

    fn decode(&self, document: &Value) -> Result<WorkflowGraph, AppError> {
        let workflow: N8nWorkflow =
            serde_json::from_value(document.clone()).map_err(|err| malformed(Platform::N8n, err))?;
        Ok(workflow.to_graph())
    }

    fn classify(&self, type_id: &str) -> NodeKind {
        let local = local_type_name(type_id);
        match local {
            "stickyNote" => NodeKind::Note,
            "errorTrigger" | "stopAndError" => NodeKind::ErrorHandler,
            "code" | "function" | "functionItem" | "executeCommand" => NodeKind::Code,
            "if" | "switch" | "filter" => NodeKind::Conditional,
            "executeWorkflow" => NodeKind::SubWorkflow,
            "httpRequest" => NodeKind::Http,
            _ if is_trigger_type(type_id) => NodeKind::Trigger,
            _ => {
                let lowered = local.to_lowercase();
                if lowered.contains("loop") || lowered.contains("splitinbatches") || lowered.contains("iterator") {
                    NodeKind::Loop
                } else {
                    NodeKind::Other
                }
            }
        }
    }

    fn handles_errors(&self, settings: &Map<String, Value>) -> bool {
        settings.get("continueOnFail") == Some(&Value::Bool(true))
            || settings
                .get("onError")
                .and_then(Value::as_str)
                .is_some_and(|mode| mode != "stopWorkflow")
    }

    fn node_keys(&self, graph: &WorkflowGraph, _options: BuildOptions) -> Vec<String> {
        unique_names(graph)
    }

    fn build(&self, graph: &WorkflowGraph, _options: BuildOptions) -> BuildOutput {
        let names = unique_names(graph);
        let mut warnings = Vec::new();

        let mut rank = vec![0usize; graph.len()];
        for (position, index) in graph.traversal_order().into_iter().enumerate() {
            rank[index] = position;
        }

        let nodes = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| {
                let mut extra = node.settings.clone();
                let type_version = extra.remove("typeVersion").unwrap_or_else(default_type_version);
                N8nNode {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: names[index].clone(),
                    node_type: node.type_id.clone(),
                    type_version,
                    position: node
                        .position
                        .unwrap_or([START_X + NODE_SPACING * rank[index] as f64, START_Y]),
                    parameters: node.parameters.clone(),
                    extra,
                }
            })
            .collect();

        let mut connections = IndexMap::new();
        for index in graph.traversal_order() {
            let outgoing = graph.outgoing(index);
            if outgoing.is_empty() {
                continue;
            }
            let slots = outgoing.iter().map(|edge| edge.output_index).max().unwrap_or(0) + 1;
            let mut main: Vec<Vec<N8nConnection>> = vec![Vec::new(); slots];
            for edge in outgoing {
                if edge.condition.is_some() {
                    warnings.push(format!(
                        "condition on the connection from '{}' to '{}' has no n8n equivalent; add an IF node to restore it",
                        names[edge.from], names[edge.to]
                    ));
                }
                main[edge.output_index].push(N8nConnection {
                    node: names[edge.to].clone(),
                    kind: main_connection(),
                    index: 0,
                });
            }
            let mut outputs = IndexMap::new();
            outputs.insert(main_connection(), main);
            connections.insert(names[index].clone(), outputs);
        }

        let mut settings = Map::new();
        settings.insert("executionOrder".to_string(), json!("v1"));

        BuildOutput {
            workflow: PlatformWorkflow::N8n(N8nWorkflow {
                name: graph.name.clone(),
                nodes,
                connections,
                active: false,
                settings,
                tags: Vec::new(),
            }),
            warnings,
        }
    }
}
