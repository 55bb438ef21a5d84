//! Rewriting of templated parameter values between platform dialects.
//!
//! Only plain field references are rewritten here. Anything else inside `{{ }}`
//! (function calls, pipelines, arithmetic) is reported as needing the generative
//! fallback and left untouched.

use crate::core::platform::Platform;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

const PATH: &str = r#"((?:\.[A-Za-z_$][\w$]*|\[\s*"[^"]*"\s*\]|\[\s*'[^']*'\s*\]|\[\d+\])*)"#;

struct Patterns {
    template: Regex,
    path_token: Regex,
    n8n_current: Regex,
    n8n_input: Regex,
    n8n_named: Regex,
    n8n_node: Regex,
    make_reference: Regex,
    zapier_reference: Regex,
    identifier: Regex,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid expression pattern {pattern}: {err}"))
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        template: compile(r"(?s)\{\{(.*?)\}\}"),
        path_token: compile(r#"\.([A-Za-z_$][\w$]*)|\[\s*"([^"]*)"\s*\]|\[\s*'([^']*)'\s*\]|\[(\d+)\]"#),
        n8n_current: compile(&format!(r"^\$json{PATH}$")),
        n8n_input: compile(&format!(r"^\$input\.(?:item|first\(\)|last\(\))\.json{PATH}$")),
        n8n_named: compile(&format!(
            r#"^\$\(\s*(?:'([^']*)'|"([^"]*)")\s*\)\.(?:item|first\(\)|last\(\))\.json{PATH}$"#
        )),
        n8n_node: compile(&format!(r#"^\$node\[\s*(?:'([^']*)'|"([^"]*)")\s*\]\.json{PATH}$"#)),
        make_reference: compile(r"^(\d+)((?:\.[^.\s{}();]+)*)$"),
        zapier_reference: compile(r"^([0-9A-Za-z-]+?)__([^\s{}]+)$"),
        identifier: compile(r"^[A-Za-z_$][\w$]*$"),
    })
}

/// What a field reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    /// The item flowing into the current node.
    Current,
    /// A named upstream node, by its source-platform key.
    Node(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: ReferenceTarget,
    pub path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Reference(Reference),
    /// A template body that is not a plain reference, kept verbatim with its braces.
    Complex(String),
}

/// Node keys on the target platform, used when rendering references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionContext {
    /// Target key of the node feeding the current one.
    #[serde(default)]
    pub upstream: Option<String>,
    /// Source key to target key.
    #[serde(default)]
    pub nodes: HashMap<String, String>,
    /// Render unknown node keys verbatim instead of asking for the fallback.
    #[serde(default)]
    pub passthrough_unknown_keys: bool,
}

impl ExpressionContext {
    /// Context for a single expression translated outside of any workflow.
    pub fn standalone(target: Platform) -> Self {
        let upstream = match target {
            Platform::N8n => None,
            Platform::Make | Platform::Zapier => Some("1".to_string()),
        };
        Self {
            upstream,
            nodes: HashMap::new(),
            passthrough_unknown_keys: true,
        }
    }

    fn resolve(&self, source_key: &str) -> Option<String> {
        match self.nodes.get(source_key) {
            Some(key) => Some(key.clone()),
            None if self.passthrough_unknown_keys => Some(source_key.to_string()),
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Unchanged,
    Rewritten(String),
    /// Some template bodies could not be rewritten. `partial` has every
    /// rewritable reference converted and the rest kept as-is.
    NeedsFallback { partial: String, reason: String },
}

pub fn is_expression(text: &str) -> bool {
    text.contains("{{")
}

/// Split a templated string into literal text and template bodies.
pub fn parse(text: &str, platform: Platform) -> Vec<Segment> {
    let patterns = patterns();
    let body_source = match platform {
        Platform::N8n => text.strip_prefix('=').unwrap_or(text),
        Platform::Make | Platform::Zapier => text,
    };

    let mut segments = Vec::new();
    let mut last = 0;
    for captures in patterns.template.captures_iter(body_source) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(body_source[last..whole.start()].to_string()));
        }
        let body = captures.get(1).map_or("", |m| m.as_str()).trim();
        match parse_reference(body, platform) {
            Some(reference) => segments.push(Segment::Reference(reference)),
            None => segments.push(Segment::Complex(whole.as_str().to_string())),
        }
        last = whole.end();
    }
    if last < body_source.len() {
        segments.push(Segment::Literal(body_source[last..].to_string()));
    }
    segments
}

fn parse_reference(body: &str, platform: Platform) -> Option<Reference> {
    let patterns = patterns();
    match platform {
        Platform::N8n => {
            if let Some(captures) = patterns.n8n_current.captures(body) {
                return Some(Reference {
                    target: ReferenceTarget::Current,
                    path: n8n_path(captures.get(1).map_or("", |m| m.as_str())),
                });
            }
            if let Some(captures) = patterns.n8n_input.captures(body) {
                return Some(Reference {
                    target: ReferenceTarget::Current,
                    path: n8n_path(captures.get(1).map_or("", |m| m.as_str())),
                });
            }
            let named = patterns
                .n8n_named
                .captures(body)
                .or_else(|| patterns.n8n_node.captures(body))?;
            Some(Reference {
                target: ReferenceTarget::Node(quoted_name(&named)?),
                path: n8n_path(named.get(3).map_or("", |m| m.as_str())),
            })
        }
        Platform::Make => {
            let captures = patterns.make_reference.captures(body)?;
            let path = captures
                .get(2)
                .map_or("", |m| m.as_str())
                .split('.')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect();
            Some(Reference {
                target: ReferenceTarget::Node(captures.get(1)?.as_str().to_string()),
                path,
            })
        }
        Platform::Zapier => {
            let captures = patterns.zapier_reference.captures(body)?;
            let path = captures
                .get(2)?
                .as_str()
                .split("__")
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect();
            Some(Reference {
                target: ReferenceTarget::Node(captures.get(1)?.as_str().to_string()),
                path,
            })
        }
    }
}

fn quoted_name(captures: &Captures<'_>) -> Option<String> {
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_string())
}

fn n8n_path(raw: &str) -> Vec<String> {
    patterns()
        .path_token
        .captures_iter(raw)
        .filter_map(|captures| {
            (1..=4)
                .find_map(|group| captures.get(group))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

fn render_reference(reference: &Reference, target: Platform, context: &ExpressionContext) -> Option<String> {
    let key = match &reference.target {
        ReferenceTarget::Current => None,
        ReferenceTarget::Node(source_key) => Some(context.resolve(source_key)?),
    };
    match target {
        Platform::N8n => {
            let mut rendered = match key {
                None => "$json".to_string(),
                Some(name) => format!("$('{}').item.json", name.replace('\'', "\\'")),
            };
            for part in &reference.path {
                if patterns().identifier.is_match(part) {
                    rendered.push('.');
                    rendered.push_str(part);
                } else if part.chars().all(|c| c.is_ascii_digit()) {
                    rendered.push_str(&format!("[{}]", part));
                } else {
                    rendered.push_str(&format!("[\"{}\"]", part.replace('"', "\\\"")));
                }
            }
            Some(format!("{{{{ {} }}}}", rendered))
        }
        Platform::Make => {
            let id = key.or_else(|| context.upstream.clone())?;
            let mut parts = vec![id];
            parts.extend(reference.path.iter().cloned());
            Some(format!("{{{{{}}}}}", parts.join(".")))
        }
        Platform::Zapier => {
            let id = key.or_else(|| context.upstream.clone())?;
            let mut parts = vec![id];
            parts.extend(reference.path.iter().cloned());
            Some(format!("{{{{{}}}}}", parts.join("__")))
        }
    }
}

/// Rewrite a single templated string from `source` dialect to `target` dialect.
pub fn rewrite(text: &str, source: Platform, target: Platform, context: &ExpressionContext) -> RewriteOutcome {
    if !is_expression(text) {
        return RewriteOutcome::Unchanged;
    }
    let mut output = String::new();
    let mut unresolved = Vec::new();
    let mut any_reference = false;
    for segment in parse(text, source) {
        match segment {
            Segment::Literal(literal) => output.push_str(&literal),
            Segment::Complex(raw) => {
                unresolved.push(raw.clone());
                output.push_str(&raw);
            }
            Segment::Reference(reference) => match render_reference(&reference, target, context) {
                Some(rendered) => {
                    any_reference = true;
                    output.push_str(&rendered);
                }
                None => {
                    unresolved.push(format!("reference to unknown node {:?}", reference.target));
                    output.push_str(&render_source(&reference, source));
                }
            },
        }
    }
    if target == Platform::N8n && any_reference {
        output.insert(0, '=');
    }

    if !unresolved.is_empty() {
        return RewriteOutcome::NeedsFallback {
            partial: output,
            reason: format!("could not rewrite {}", unresolved.join(", ")),
        };
    }
    if output == text {
        RewriteOutcome::Unchanged
    } else {
        RewriteOutcome::Rewritten(output)
    }
}

fn render_source(reference: &Reference, source: Platform) -> String {
    let context = ExpressionContext {
        upstream: None,
        nodes: HashMap::new(),
        passthrough_unknown_keys: true,
    };
    render_reference(reference, source, &context).unwrap_or_default()
}

/// Result of rewriting every templated string inside a parameter tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueRewrite {
    pub rewritten: usize,
    /// `(original, partial, reason)` for strings that need the fallback.
    pub pending: Vec<PendingExpression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingExpression {
    pub original: String,
    pub partial: String,
    pub reason: String,
}

/// Rewrite all templated strings in `value` in place. Strings needing the fallback are
/// replaced by their partial rewrite and listed in the result.
pub fn rewrite_value(
    value: &mut Value,
    source: Platform,
    target: Platform,
    context: &ExpressionContext,
) -> ValueRewrite {
    let mut summary = ValueRewrite::default();
    rewrite_in_place(value, source, target, context, &mut summary);
    summary
}

fn rewrite_in_place(
    value: &mut Value,
    source: Platform,
    target: Platform,
    context: &ExpressionContext,
    summary: &mut ValueRewrite,
) {
    match value {
        Value::String(text) => match rewrite(text, source, target, context) {
            RewriteOutcome::Unchanged => {}
            RewriteOutcome::Rewritten(rewritten) => {
                summary.rewritten += 1;
                *text = rewritten;
            }
            RewriteOutcome::NeedsFallback { partial, reason } => {
                summary.pending.push(PendingExpression {
                    original: text.clone(),
                    partial: partial.clone(),
                    reason,
                });
                *text = partial;
            }
        },
        Value::Array(items) => {
            for item in items {
                rewrite_in_place(item, source, target, context, summary);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                rewrite_in_place(item, source, target, context, summary);
            }
        }
        _ => {}
    }
}

/// Count templated strings in a parameter tree.
pub fn count_expressions(value: &Value) -> usize {
    match value {
        Value::String(text) => usize::from(is_expression(text)),
        Value::Array(items) => items.iter().map(count_expressions).sum(),
        Value::Object(map) => map.values().map(count_expressions).sum(),
        _ => 0,
    }
}
