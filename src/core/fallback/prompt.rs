//! Prompts sent to the completion service and parsing of its answers.

use super::{FallbackContext, FallbackError, SynthesizedNode};
use crate::core::graph::GraphNode;
use crate::core::platform::Platform;
use serde_json::Value;

pub const NODE_SYSTEM_PROMPT: &str = "You translate single workflow nodes between automation platforms. \
Answer with one JSON object {\"type\": string, \"parameters\": object, \"name\": string} and nothing else.";

pub const EXPRESSION_SYSTEM_PROMPT: &str = "You translate templated expressions between automation platforms. \
Answer with the translated expression only, without explanation or quotes.";

pub fn node_prompt(node: &GraphNode, context: &FallbackContext) -> String {
    let parameters = serde_json::to_string_pretty(&node.parameters).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Translate this {source} {unit} to an equivalent {target} {target_unit}.\n\
         Workflow: {workflow}\n\
         Node name: {name}\n\
         Node type: {type_id}\n\
         Upstream types: {upstream}\n\
         Downstream types: {downstream}\n\
         Parameters:\n{parameters}",
        source = context.source_platform.display_name(),
        unit = context.source_platform.unit_noun(),
        target = context.target_platform.display_name(),
        target_unit = context.target_platform.unit_noun(),
        workflow = context.workflow_name,
        name = node.name,
        type_id = node.type_id,
        upstream = list_or_none(&context.upstream_types),
        downstream = list_or_none(&context.downstream_types),
        parameters = parameters,
    )
}

pub fn expression_prompt(expression: &str, source: Platform, target: Platform) -> String {
    format!(
        "Translate this {} expression to {} syntax:\n{}",
        source.display_name(),
        target.display_name(),
        expression
    )
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_node(completion: &str) -> Result<SynthesizedNode, FallbackError> {
    let body = strip_fences(completion);
    let value: Value = serde_json::from_str(body)
        .map_err(|err| FallbackError::InvalidResponse(format!("node is not JSON: {}", err)))?;
    let node: SynthesizedNode = serde_json::from_value(value)
        .map_err(|err| FallbackError::InvalidResponse(format!("node has the wrong shape: {}", err)))?;
    if node.type_id.trim().is_empty() {
        return Err(FallbackError::InvalidResponse("node type is empty".to_string()));
    }
    Ok(node)
}

pub fn parse_expression(completion: &str) -> Result<String, FallbackError> {
    let body = strip_fences(completion);
    let body = body
        .strip_prefix('`')
        .and_then(|inner| inner.strip_suffix('`'))
        .unwrap_or(body)
        .trim();
    if body.is_empty() {
        return Err(FallbackError::InvalidResponse("empty expression".to_string()));
    }
    Ok(body.to_string())
}
