#![allow(clippy::result_large_err)] // Adapters return AppError for structured diagnostics.

//! Vendor document models and the adapters that move them in and out of
//! [`WorkflowGraph`].

use crate::core::error::AppError;
use crate::core::graph::WorkflowGraph;
use crate::core::platform::Platform;
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod make;
pub mod n8n;
pub mod zapier;

pub use make::{MakeAdapter, MakeModule, MakeRoute, MakeScenario};
pub use n8n::{N8nAdapter, N8nConnection, N8nNode, N8nWorkflow};
pub use zapier::{ZapierAdapter, ZapierStep, ZapierStepType, ZapierZap};

/// Structural category of a node type, used for feature detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Trigger,
    Code,
    Loop,
    Conditional,
    SubWorkflow,
    ErrorHandler,
    Http,
    Note,
    Other,
}

/// Features a workflow relies on, with the names of the nodes that use them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureUsage {
    pub node_count: usize,
    pub custom_code: Vec<String>,
    pub loops: Vec<String>,
    pub conditionals: Vec<String>,
    pub sub_workflows: Vec<String>,
    pub error_handlers: Vec<String>,
    pub http_calls: Vec<String>,
    pub parallel_branches: bool,
    pub max_fan_out: usize,
}

impl FeatureUsage {
    pub fn has_custom_code(&self) -> bool {
        !self.custom_code.is_empty()
    }

    pub fn has_loops(&self) -> bool {
        !self.loops.is_empty()
    }

    pub fn has_conditional_logic(&self) -> bool {
        !self.conditionals.is_empty()
    }

    pub fn has_sub_workflows(&self) -> bool {
        !self.sub_workflows.is_empty()
    }

    pub fn has_error_handling(&self) -> bool {
        !self.error_handlers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub preserve_names: bool,
    /// Reuse each node's source key as its id. Set for same-platform copies so
    /// references inside expressions keep pointing at the same node.
    pub keep_source_keys: bool,
}

/// A freshly built target document plus the lossy decisions made while building it.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub workflow: PlatformWorkflow,
    pub warnings: Vec<String>,
}

/// Per-platform knowledge of document shape and topology.
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Parse a vendor document into the neutral graph.
    fn decode(&self, document: &Value) -> Result<WorkflowGraph, AppError>;

    fn classify(&self, type_id: &str) -> NodeKind;

    /// Key each node will be referenced by once built on this platform.
    fn node_keys(&self, graph: &WorkflowGraph, options: BuildOptions) -> Vec<String>;

    /// Rebuild the platform's connection structure from the graph.
    fn build(&self, graph: &WorkflowGraph, options: BuildOptions) -> BuildOutput;

    /// True when the node opts into per-node error handling.
    fn handles_errors(&self, _settings: &serde_json::Map<String, Value>) -> bool {
        false
    }

    fn detect_features(&self, graph: &WorkflowGraph) -> FeatureUsage {
        let mut usage = FeatureUsage {
            max_fan_out: graph.max_out_degree(),
            parallel_branches: graph.has_fan_out(),
            ..Default::default()
        };
        for (index, node) in graph.nodes.iter().enumerate() {
            let name = node.name.clone();
            match self.classify(&node.type_id) {
                NodeKind::Note => continue,
                NodeKind::Code => usage.custom_code.push(name.clone()),
                NodeKind::Loop => usage.loops.push(name.clone()),
                NodeKind::Conditional => usage.conditionals.push(name.clone()),
                NodeKind::SubWorkflow => usage.sub_workflows.push(name.clone()),
                NodeKind::ErrorHandler => usage.error_handlers.push(name.clone()),
                NodeKind::Http => usage.http_calls.push(name.clone()),
                NodeKind::Trigger | NodeKind::Other => {}
            }
            usage.node_count += 1;
            if self.handles_errors(&node.settings) && !usage.error_handlers.contains(&name) {
                usage.error_handlers.push(name.clone());
            }
            let guarded = graph.outgoing(index).iter().any(|edge| edge.condition.is_some());
            if guarded && !usage.conditionals.contains(&name) {
                usage.conditionals.push(name);
            }
        }
        usage
    }
}

static N8N: N8nAdapter = N8nAdapter;
static MAKE: MakeAdapter = MakeAdapter;
static ZAPIER: ZapierAdapter = ZapierAdapter;

pub fn adapter_for(platform: Platform) -> &'static dyn PlatformAdapter {
    match platform {
        Platform::N8n => &N8N,
        Platform::Make => &MAKE,
        Platform::Zapier => &ZAPIER,
    }
}

/// A workflow document in one of the supported vendor schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlatformWorkflow {
    N8n(N8nWorkflow),
    Make(MakeScenario),
    Zapier(ZapierZap),
}

impl PlatformWorkflow {
    pub fn from_value(platform: Platform, value: &Value) -> Result<Self, AppError> {
        let parsed = match platform {
            Platform::N8n => serde_json::from_value(value.clone()).map(PlatformWorkflow::N8n),
            Platform::Make => serde_json::from_value(value.clone()).map(PlatformWorkflow::Make),
            Platform::Zapier => serde_json::from_value(value.clone()).map(PlatformWorkflow::Zapier),
        };
        parsed.map_err(|err| malformed(platform, err))
    }

    pub fn platform(&self) -> Platform {
        match self {
            PlatformWorkflow::N8n(_) => Platform::N8n,
            PlatformWorkflow::Make(_) => Platform::Make,
            PlatformWorkflow::Zapier(_) => Platform::Zapier,
        }
    }

    /// Executable units, not counting routers or documentation notes.
    pub fn node_count(&self) -> usize {
        match self {
            PlatformWorkflow::N8n(workflow) => workflow
                .nodes
                .iter()
                .filter(|node| !n8n::is_sticky_note(&node.node_type))
                .count(),
            PlatformWorkflow::Make(scenario) => make::count_modules(&scenario.flow),
            PlatformWorkflow::Zapier(zap) => zap.steps.len(),
        }
    }

    pub fn to_value(&self) -> Result<Value, AppError> {
        serde_json::to_value(self).map_err(AppError::from)
    }
}

pub(crate) fn malformed(platform: Platform, err: serde_json::Error) -> AppError {
    AppError::with_source(
        ErrorCategory::ValidationError,
        format!("workflow is not a valid {} document: {}", platform.display_name(), err),
        Box::new(err),
    )
    .with_code("FLOW-INPUT-002")
    .with_suggestion(format!(
        "export the workflow from {} as JSON and pass it unchanged",
        platform.display_name()
    ))
}

/// Split a `app:event` identifier.
pub(crate) fn split_app_event(type_id: &str) -> (&str, &str) {
    type_id.split_once(':').unwrap_or((type_id, ""))
}

/// Last segment of a dotted or colon separated type identifier.
pub(crate) fn local_type_name(type_id: &str) -> &str {
    type_id
        .rsplit(|c| c == '.' || c == ':')
        .next()
        .unwrap_or(type_id)
}
