use super::{is_sticky_note, N8nNode, N8nWorkflow, NODE_SPACING, START_X, START_Y, STICKY_NOTE_TYPE};
use crate::core::optimizer::{OptimizationPass, PassContext};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const HTTP_REQUEST_TYPE: &str = "n8n-nodes-base.httpRequest";
pub const DOCUMENTATION_NOTE: &str = "Workflow Notes";

pub fn passes() -> Vec<Box<dyn OptimizationPass<N8nWorkflow>>> {
    vec![
        Box::new(NativeNodeSubstitution),
        Box::new(LeftToRightLayout),
        Box::new(ExpressionRootPrefix),
        Box::new(DocumentationNote),
    ]
}

/// Replace generic HTTP calls to known services with the service's native node.
pub struct NativeNodeSubstitution;

impl OptimizationPass<N8nWorkflow> for NativeNodeSubstitution {
    fn name(&self) -> &'static str {
        "native_node_substitution"
    }

    fn apply(&self, mut workflow: N8nWorkflow, context: &PassContext<'_>) -> N8nWorkflow {
        for node in workflow.nodes.iter_mut().filter(|n| n.node_type == HTTP_REQUEST_TYPE) {
            let Some(url) = node.parameters.get("url").and_then(Value::as_str).map(str::to_string) else {
                continue;
            };
            let Some(service) = context.knowledge.mappings().service_for_url(&url) else {
                continue;
            };
            tracing::debug!(node = %node.name, service = %service.name, "substituting native node");
            node.node_type = service.n8n_type.clone();
            node.type_version = json!(1);
            node.parameters.remove("url");
            node.parameters.remove("method");
            node.extra
                .insert("notes".to_string(), json!(format!("Replaced HTTP request to {}", url)));
        }
        workflow
    }
}

/// Lay executable nodes out left to right in traversal order.
pub struct LeftToRightLayout;

impl OptimizationPass<N8nWorkflow> for LeftToRightLayout {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn apply(&self, mut workflow: N8nWorkflow, _context: &PassContext<'_>) -> N8nWorkflow {
        let order = workflow.to_graph().traversal_order();
        let mut column = 0usize;
        for index in order {
            let node = &mut workflow.nodes[index];
            if is_sticky_note(&node.node_type) {
                continue;
            }
            node.position = [START_X + NODE_SPACING * column as f64, START_Y];
            column += 1;
        }
        workflow
    }
}

fn bare_reference() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}")
            .unwrap_or_else(|err| panic!("invalid bare reference pattern: {err}"))
    })
}

/// Prefix bare `{{ field }}` references with `$json` and mark the value as an expression.
pub struct ExpressionRootPrefix;

impl ExpressionRootPrefix {
    fn normalize(value: &mut Value) {
        match value {
            Value::String(text) if text.contains("{{") => {
                let rewritten = bare_reference().replace_all(text, "{{ $$json.$1 }}");
                let mut normalized = rewritten.into_owned();
                if !normalized.starts_with('=') {
                    normalized.insert(0, '=');
                }
                *text = normalized;
            }
            Value::Array(items) => items.iter_mut().for_each(Self::normalize),
            Value::Object(map) => map.values_mut().for_each(Self::normalize),
            _ => {}
        }
    }
}

impl OptimizationPass<N8nWorkflow> for ExpressionRootPrefix {
    fn name(&self) -> &'static str {
        "expression_root_prefix"
    }

    fn apply(&self, mut workflow: N8nWorkflow, _context: &PassContext<'_>) -> N8nWorkflow {
        for node in workflow.nodes.iter_mut().filter(|n| !is_sticky_note(&n.node_type)) {
            node.parameters.values_mut().for_each(Self::normalize);
        }
        workflow
    }
}

/// Add a sticky note describing large workflows.
pub struct DocumentationNote;

impl OptimizationPass<N8nWorkflow> for DocumentationNote {
    fn name(&self) -> &'static str {
        "documentation_note"
    }

    fn apply(&self, mut workflow: N8nWorkflow, context: &PassContext<'_>) -> N8nWorkflow {
        let executable = workflow
            .nodes
            .iter()
            .filter(|n| !is_sticky_note(&n.node_type))
            .count();
        let documented = workflow
            .nodes
            .iter()
            .any(|n| is_sticky_note(&n.node_type) && n.name == DOCUMENTATION_NOTE);
        if executable <= context.settings.documentation_threshold || documented {
            return workflow;
        }

        let mut parameters = Map::new();
        parameters.insert(
            "content".to_string(),
            json!(format!(
                "## {}\n\n{} nodes translated by flowbridge. Review credentials and expressions before activating.",
                workflow.name, executable
            )),
        );
        workflow.nodes.push(N8nNode {
            id: uuid::Uuid::new_v4().to_string(),
            name: DOCUMENTATION_NOTE.to_string(),
            node_type: STICKY_NOTE_TYPE.to_string(),
            type_version: json!(1),
            position: [START_X, START_Y - 220.0],
            parameters,
            extra: Map::new(),
        });
        workflow
    }
}
