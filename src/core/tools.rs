#![allow(clippy::result_large_err)]

//! Tool-call surface: a named operation plus JSON arguments in, JSON out.
//!
//! Only argument shape problems are errors. Data-level problems (unknown platform in a
//! translation, an empty workflow) come back inside the result object.

use crate::core::analysis::{self, PlatformRequirements};
use crate::core::engine::{BatchResult, TranslationEngine, TranslationOptions, TranslationRequest, TranslationResult};
use crate::core::error::AppError;
use crate::core::expression::{self, ExpressionContext, RewriteOutcome};
use crate::core::knowledge::CapabilitySet;
use crate::core::platform::Platform;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const TRANSLATE_WORKFLOW: &str = "translate_workflow";
pub const CHECK_TRANSLATION_FEASIBILITY: &str = "check_translation_feasibility";
pub const GET_PLATFORM_CAPABILITIES: &str = "get_platform_capabilities";
pub const GET_TRANSLATION_COMPLEXITY: &str = "get_translation_complexity";
pub const SUGGEST_BEST_PLATFORM: &str = "suggest_best_platform";
pub const TRANSLATE_EXPRESSION: &str = "translate_expression";
pub const ANALYZE_WORKFLOW_COMPLEXITY: &str = "analyze_workflow_complexity";
pub const BATCH_TRANSLATE_WORKFLOWS: &str = "batch_translate_workflows";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

const TOOLS: [ToolDescriptor; 8] = [
    ToolDescriptor {
        name: TRANSLATE_WORKFLOW,
        description: "Translate a workflow from one platform to another",
    },
    ToolDescriptor {
        name: CHECK_TRANSLATION_FEASIBILITY,
        description: "Score how cleanly a workflow will translate before translating it",
    },
    ToolDescriptor {
        name: GET_PLATFORM_CAPABILITIES,
        description: "Feature flags and limits for one or more platforms",
    },
    ToolDescriptor {
        name: GET_TRANSLATION_COMPLEXITY,
        description: "Expected difficulty and success rate of a translation path",
    },
    ToolDescriptor {
        name: SUGGEST_BEST_PLATFORM,
        description: "Recommend a platform for a set of requirements",
    },
    ToolDescriptor {
        name: TRANSLATE_EXPRESSION,
        description: "Translate a single templated expression between platform syntaxes",
    },
    ToolDescriptor {
        name: ANALYZE_WORKFLOW_COMPLEXITY,
        description: "Complexity score, suggestions and potential issues for a workflow",
    },
    ToolDescriptor {
        name: BATCH_TRANSLATE_WORKFLOWS,
        description: "Translate many workflows between the same pair of platforms",
    },
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateArgs {
    workflow: Value,
    source_platform: String,
    target_platform: String,
    #[serde(flatten)]
    options: TranslationOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeasibilityArgs {
    workflow: Value,
    source_platform: String,
    target_platform: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CapabilitiesArgs {
    #[serde(default)]
    platforms: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PathArgs {
    source_platform: String,
    target_platform: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestArgs {
    #[serde(default)]
    requirements: PlatformRequirements,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpressionArgs {
    expression: String,
    source_platform: String,
    target_platform: String,
    #[serde(default)]
    context: Option<ExpressionContext>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeArgs {
    workflow: Value,
    platform: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchArgs {
    workflows: Vec<Value>,
    source_platform: String,
    target_platform: String,
    #[serde(default = "default_true")]
    optimize: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionTranslation {
    pub translated_expression: String,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

pub struct ToolService {
    engine: Arc<TranslationEngine>,
    batch_concurrency: usize,
}

impl ToolService {
    pub fn new(engine: Arc<TranslationEngine>, batch_concurrency: usize) -> Self {
        Self {
            engine,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    pub fn list_tools() -> &'static [ToolDescriptor] {
        &TOOLS
    }

    pub fn engine(&self) -> &TranslationEngine {
        &self.engine
    }

    pub async fn call(&self, name: &str, arguments: Value, cancel: &CancellationToken) -> Result<Value, AppError> {
        tracing::debug!(tool = name, "tool call");
        let output = match name {
            TRANSLATE_WORKFLOW => to_value(&self.translate_workflow(parse_args(name, arguments)?, cancel).await)?,
            CHECK_TRANSLATION_FEASIBILITY => {
                let args: FeasibilityArgs = parse_args(name, arguments)?;
                let (source, target) = platforms(&args.source_platform, &args.target_platform)?;
                require_object(name, &args.workflow)?;
                to_value(&self.engine.checker().check(&args.workflow, source, target)?)?
            }
            GET_PLATFORM_CAPABILITIES => to_value(&self.capabilities(parse_args(name, arguments)?)?)?,
            GET_TRANSLATION_COMPLEXITY => {
                let args: PathArgs = parse_args(name, arguments)?;
                let (source, target) = platforms(&args.source_platform, &args.target_platform)?;
                to_value(&analysis::translation_complexity(self.engine.knowledge(), source, target))?
            }
            SUGGEST_BEST_PLATFORM => {
                let args: SuggestArgs = parse_args(name, arguments)?;
                to_value(&analysis::suggest_best_platform(self.engine.knowledge(), &args.requirements))?
            }
            TRANSLATE_EXPRESSION => to_value(&self.translate_expression(parse_args(name, arguments)?, cancel).await?)?,
            ANALYZE_WORKFLOW_COMPLEXITY => {
                let args: AnalyzeArgs = parse_args(name, arguments)?;
                let platform = Platform::parse(&args.platform)?;
                require_object(name, &args.workflow)?;
                to_value(&analysis::analyze_workflow_complexity(
                    self.engine.knowledge(),
                    &args.workflow,
                    platform,
                )?)?
            }
            BATCH_TRANSLATE_WORKFLOWS => to_value(&self.batch_translate(parse_args(name, arguments)?, cancel).await)?,
            other => {
                return Err(AppError::new(ErrorCategory::ValidationError, format!("unknown tool '{}'", other))
                    .with_code("FLOW-TOOL-001")
                    .with_suggestion(format!(
                        "available tools: {}",
                        TOOLS.iter().map(|tool| tool.name).collect::<Vec<_>>().join(", ")
                    )))
            }
        };
        Ok(output)
    }

    async fn translate_workflow(&self, args: TranslateArgs, cancel: &CancellationToken) -> TranslationResult {
        let (source, target) = match platforms(&args.source_platform, &args.target_platform) {
            Ok(pair) => pair,
            Err(err) => return TranslationResult::failure(err.message, 0),
        };
        let request = TranslationRequest::new(args.workflow, source, target).with_options(args.options);
        self.engine.translate(request, cancel).await
    }

    async fn batch_translate(&self, args: BatchArgs, cancel: &CancellationToken) -> BatchResult {
        let (source, target) = match platforms(&args.source_platform, &args.target_platform) {
            Ok(pair) => pair,
            Err(err) => {
                let results = args
                    .workflows
                    .iter()
                    .map(|_| TranslationResult::failure(err.message.clone(), 0))
                    .collect();
                return BatchResult::from_results(results);
            }
        };
        let options = TranslationOptions {
            optimize: args.optimize,
            ..Default::default()
        };
        self.engine
            .translate_many(args.workflows, source, target, options, self.batch_concurrency, cancel)
            .await
    }

    fn capabilities(&self, args: CapabilitiesArgs) -> Result<IndexMap<Platform, CapabilitySet>, AppError> {
        let selected = if args.platforms.is_empty() {
            Platform::ALL.to_vec()
        } else {
            args.platforms
                .iter()
                .map(|name| Platform::parse(name))
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(selected
            .into_iter()
            .map(|platform| (platform, self.engine.knowledge().capabilities(platform).clone()))
            .collect())
    }

    async fn translate_expression(
        &self,
        args: ExpressionArgs,
        cancel: &CancellationToken,
    ) -> Result<ExpressionTranslation, AppError> {
        let (source, target) = platforms(&args.source_platform, &args.target_platform)?;
        let mut context = ExpressionContext::standalone(target);
        if let Some(supplied) = args.context {
            if supplied.upstream.is_some() {
                context.upstream = supplied.upstream;
            }
            context.nodes = supplied.nodes;
        }

        let outcome = if source == target {
            RewriteOutcome::Unchanged
        } else {
            expression::rewrite(&args.expression, source, target, &context)
        };
        let translation = match outcome {
            RewriteOutcome::Unchanged => ExpressionTranslation {
                translated_expression: args.expression,
                used_fallback: false,
                warnings: Vec::new(),
            },
            RewriteOutcome::Rewritten(text) => ExpressionTranslation {
                translated_expression: text,
                used_fallback: false,
                warnings: Vec::new(),
            },
            RewriteOutcome::NeedsFallback { partial, reason } => match self
                .engine
                .fallback()
                .translate_expression(&args.expression, source, target, &context, cancel)
                .await
            {
                Ok(text) => ExpressionTranslation {
                    translated_expression: text,
                    used_fallback: true,
                    warnings: Vec::new(),
                },
                Err(err) => ExpressionTranslation {
                    translated_expression: partial,
                    used_fallback: false,
                    warnings: vec![format!("{} ({})", reason, err)],
                },
            },
        };
        Ok(translation)
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, AppError> {
    serde_json::from_value(arguments).map_err(|err| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("invalid arguments for {}: {}", tool, err),
        )
        .with_code("FLOW-INPUT-001")
    })
}

fn require_object(tool: &str, workflow: &Value) -> Result<(), AppError> {
    if workflow.is_object() {
        Ok(())
    } else {
        Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("invalid arguments for {}: workflow must be a JSON object", tool),
        )
        .with_code("FLOW-INPUT-001"))
    }
}

fn platforms(source: &str, target: &str) -> Result<(Platform, Platform), AppError> {
    Ok((Platform::parse(source)?, Platform::parse(target)?))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(AppError::from)
}

/// Descriptor list as JSON, for transports that advertise tools.
pub fn tool_list_value() -> Value {
    json!(TOOLS)
}
