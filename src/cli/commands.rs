use crate::{
    cli::args::{
        AnalyzeArgs, BatchArgs, CallArgs, CapabilitiesArgs, ComplexityArgs, ExpressionArgs,
        FeasibilityArgs, RecommendArgs, TranslateArgs,
    },
    core::{
        config::FlowbridgeConfig,
        engine::{EngineSettings, TranslationEngine, TranslationOptions},
        fallback,
        platform::Platform,
        tools::{self, ToolService},
        ConfigLoader, PlatformKnowledge,
    },
    Result,
};
use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a command needs, assembled from flowbridge.toml.
struct Services {
    config: FlowbridgeConfig,
    tools: ToolService,
}

fn services(config_path: Option<&Path>) -> Result<Services> {
    let config = ConfigLoader::load(config_path)?;
    let knowledge = PlatformKnowledge::load(
        config.knowledge.capabilities.as_deref(),
        config.knowledge.mappings.as_deref(),
    )?;
    let fallback = fallback::from_config(&config.fallback)?;
    let settings = EngineSettings {
        optimizer: config.optimizer.clone(),
        scoring: config.scoring.clone(),
    };
    let engine = TranslationEngine::new(Arc::new(knowledge), fallback, settings);
    let tools = ToolService::new(Arc::new(engine), config.batch.concurrency);
    Ok(Services { config, tools })
}

/// Read a JSON document from a file, or stdin when the path is `-`.
fn read_json(path: &Path) -> Result<Value> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read stdin")?;
        buffer
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn error_list(result: &Value) -> String {
    result["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default()
}

pub async fn translate(args: TranslateArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let workflow = read_json(&args.input)?;
    let arguments = json!({
        "workflow": workflow,
        "sourcePlatform": args.platforms.source,
        "targetPlatform": args.platforms.target,
        "optimize": !args.no_optimize,
        "preserveNames": args.preserve_names,
        "strictMode": args.strict,
    });
    let result = services
        .tools
        .call(tools::TRANSLATE_WORKFLOW, arguments, cancel)
        .await?;

    if let Some(output) = &args.output {
        if !result["workflow"].is_null() {
            fs::write(output, serde_json::to_string_pretty(&result["workflow"])?)
                .with_context(|| format!("failed to write {}", output.display()))?;
            tracing::info!(path = %output.display(), "wrote translated workflow");
        }
    }
    print_json(&result)?;

    if result["success"] != Value::Bool(true) {
        bail!("translation failed: {}", error_list(&result));
    }
    Ok(())
}

pub async fn feasibility(args: FeasibilityArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let arguments = json!({
        "workflow": read_json(&args.input)?,
        "sourcePlatform": args.platforms.source,
        "targetPlatform": args.platforms.target,
    });
    let check = services
        .tools
        .call(tools::CHECK_TRANSLATION_FEASIBILITY, arguments, cancel)
        .await?;
    print_json(&check)
}

pub async fn capabilities(args: CapabilitiesArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let capabilities = services
        .tools
        .call(tools::GET_PLATFORM_CAPABILITIES, json!({ "platforms": args.platforms }), cancel)
        .await?;
    print_json(&capabilities)
}

pub async fn complexity(args: ComplexityArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let arguments = json!({
        "sourcePlatform": args.platforms.source,
        "targetPlatform": args.platforms.target,
    });
    let complexity = services
        .tools
        .call(tools::GET_TRANSLATION_COMPLEXITY, arguments, cancel)
        .await?;
    print_json(&complexity)
}

pub async fn recommend(args: RecommendArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let arguments = json!({
        "requirements": {
            "needsCustomCode": args.custom_code,
            "needsLoops": args.loops,
            "needsComplexLogic": args.complex_logic,
            "selfHostingPreferred": args.self_host,
            "teamTechnicalLevel": args.level,
            "budgetLevel": args.budget,
        }
    });
    let recommendation = services
        .tools
        .call(tools::SUGGEST_BEST_PLATFORM, arguments, cancel)
        .await?;
    print_json(&recommendation)
}

pub async fn expression(args: ExpressionArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let context = match &args.context {
        Some(path) => read_json(path)?,
        None => Value::Null,
    };
    let arguments = json!({
        "expression": args.expression,
        "sourcePlatform": args.platforms.source,
        "targetPlatform": args.platforms.target,
        "context": context,
    });
    let translation = services
        .tools
        .call(tools::TRANSLATE_EXPRESSION, arguments, cancel)
        .await?;
    print_json(&translation)
}

pub async fn analyze(args: AnalyzeArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let arguments = json!({
        "workflow": read_json(&args.input)?,
        "platform": args.platform,
    });
    let analysis = services
        .tools
        .call(tools::ANALYZE_WORKFLOW_COMPLEXITY, arguments, cancel)
        .await?;
    print_json(&analysis)
}

/// Expand batch inputs: a file holding a JSON array contributes each element.
fn collect_workflows(inputs: &[PathBuf]) -> Result<Vec<Value>> {
    let mut workflows = Vec::new();
    for input in inputs {
        match read_json(input)? {
            Value::Array(items) => workflows.extend(items),
            workflow => workflows.push(workflow),
        }
    }
    Ok(workflows)
}

pub async fn batch(args: BatchArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let source = Platform::parse(&args.platforms.source)?;
    let target = Platform::parse(&args.platforms.target)?;
    let workflows = collect_workflows(&args.inputs)?;
    let concurrency = args
        .concurrency
        .unwrap_or(services.config.batch.concurrency);
    if concurrency == 0 {
        bail!("--concurrency must be at least 1");
    }
    let options = TranslationOptions {
        optimize: !args.no_optimize,
        ..TranslationOptions::default()
    };

    let batch = services
        .tools
        .engine()
        .translate_many(workflows, source, target, options, concurrency, cancel)
        .await;
    print_json(&batch)?;

    if batch.failed > 0 {
        bail!("{} of {} workflows failed to translate", batch.failed, batch.total);
    }
    Ok(())
}

pub fn tools() -> Result<()> {
    print_json(&tools::tool_list_value())
}

pub async fn call(args: CallArgs, config_path: Option<&Path>, cancel: &CancellationToken) -> Result<()> {
    let services = services(config_path)?;
    let arguments = match &args.args {
        Some(path) => read_json(path)?,
        None => json!({}),
    };
    let output = services
        .tools
        .call(&args.tool, arguments, cancel)
        .await
        .map_err(|err| anyhow!("{} ({})", err.message, err.code))?;
    print_json(&output)
}

pub async fn health(config_path: Option<&Path>) -> Result<()> {
    let services = services(config_path)?;
    let health = services.tools.engine().fallback().health().await;
    print_json(&health)?;
    if health.configured && !health.reachable {
        bail!(
            "generative fallback is configured but unreachable: {}",
            health.detail.unwrap_or_default()
        );
    }
    Ok(())
}
