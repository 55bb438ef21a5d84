use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Pure value conversions a parameter mapping may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Transform {
    Identity,
    ToString,
    ToNumber,
    ToBoolean,
    Lowercase,
    Uppercase,
    SplitComma,
    JoinComma,
    WrapArray,
    FirstElement,
}

impl Transform {
    /// Apply the conversion. Values the conversion does not understand pass through.
    pub fn apply(&self, value: &Value) -> Value {
        match self {
            Transform::Identity => value.clone(),
            Transform::ToString => match value {
                Value::String(_) => value.clone(),
                Value::Null => Value::String(String::new()),
                other => Value::String(other.to_string()),
            },
            Transform::ToNumber => match value {
                Value::String(text) if !is_expression(text) => parse_number(text.trim())
                    .map(Value::Number)
                    .unwrap_or_else(|| value.clone()),
                Value::Bool(flag) => Value::from(u8::from(*flag)),
                _ => value.clone(),
            },
            Transform::ToBoolean => match value {
                Value::String(text) if !is_expression(text) => {
                    match text.trim().to_lowercase().as_str() {
                        "true" | "yes" | "1" | "on" => Value::Bool(true),
                        "false" | "no" | "0" | "off" | "" => Value::Bool(false),
                        _ => value.clone(),
                    }
                }
                Value::Number(number) => Value::Bool(number.as_f64().is_some_and(|n| n != 0.0)),
                Value::Null => Value::Bool(false),
                _ => value.clone(),
            },
            Transform::Lowercase => map_string(value, |text| text.to_lowercase()),
            Transform::Uppercase => map_string(value, |text| text.to_uppercase()),
            Transform::SplitComma => match value {
                Value::String(text) if !is_expression(text) => Value::Array(
                    text.split(',')
                        .map(str::trim)
                        .filter(|part| !part.is_empty())
                        .map(|part| Value::String(part.to_string()))
                        .collect(),
                ),
                _ => value.clone(),
            },
            Transform::JoinComma => match value {
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(text) => text.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                ),
                _ => value.clone(),
            },
            Transform::WrapArray => match value {
                Value::Array(_) => value.clone(),
                Value::Null => Value::Array(Vec::new()),
                other => Value::Array(vec![other.clone()]),
            },
            Transform::FirstElement => match value {
                Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
                _ => value.clone(),
            },
        }
    }
}

// Templated strings are resolved at runtime by the target platform, so
// structural conversions must leave them alone.
fn is_expression(text: &str) -> bool {
    text.contains("{{") || text.starts_with('=')
}

fn map_string(value: &Value, convert: impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(text) if !is_expression(text) => Value::String(convert(text)),
        _ => value.clone(),
    }
}

fn parse_number(text: &str) -> Option<serde_json::Number> {
    if let Ok(integer) = text.parse::<i64>() {
        return Some(integer.into());
    }
    text.parse::<f64>().ok().and_then(serde_json::Number::from_f64)
}
