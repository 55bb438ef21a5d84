pub mod args;
pub mod commands;

pub use args::{
    AnalyzeArgs, BatchArgs, CallArgs, CapabilitiesArgs, ComplexityArgs, ExpressionArgs,
    FeasibilityArgs, PlatformPair, RecommendArgs, TranslateArgs,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
WORKFLOW COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "flowbridge")]
#[command(version = crate::VERSION)]
#[command(about = "Translate automation workflows between n8n, Make and Zapier")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: check feasibility, translate, then analyze the result on the target platform."
)]
pub struct Args {
    /// Path to config file (default: ./flowbridge.toml, then the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Translate a workflow to another platform",
        long_about = "Translate maps every node through the mapping table, falls back to the generative adapter for unmapped nodes, rewrites expressions and optionally optimizes for the target.",
        after_help = "Example:\n    flowbridge translate order-flow.json --from n8n --to zapier"
    )]
    Translate(TranslateArgs),
    #[command(
        about = "Score how cleanly a workflow will translate",
        after_help = "Example:\n    flowbridge feasibility order-flow.json --from make --to zapier"
    )]
    Feasibility(FeasibilityArgs),
    #[command(
        about = "Show feature flags and limits of platforms",
        after_help = "Example:\n    flowbridge capabilities zapier make"
    )]
    Capabilities(CapabilitiesArgs),
    #[command(
        about = "Expected difficulty of a translation path",
        after_help = "Example:\n    flowbridge complexity --from n8n --to zapier"
    )]
    Complexity(ComplexityArgs),
    #[command(
        about = "Recommend a platform for a set of requirements",
        after_help = "Example:\n    flowbridge recommend --loops --self-host --level advanced"
    )]
    Recommend(RecommendArgs),
    #[command(
        about = "Translate a single expression",
        after_help = "Example:\n    flowbridge expression '{{ $json.email }}' --from n8n --to make"
    )]
    Expression(ExpressionArgs),
    #[command(
        about = "Measure the complexity of a workflow",
        after_help = "Example:\n    flowbridge analyze scenario.json --platform make"
    )]
    Analyze(AnalyzeArgs),
    #[command(
        about = "Translate many workflows between the same platforms",
        long_about = "Batch translates every input independently with bounded concurrency. Ctrl-C stops items that have not started yet; every input still gets a result.",
        after_help = "Example:\n    flowbridge batch flows/*.json --from zapier --to n8n --concurrency 8"
    )]
    Batch(BatchArgs),
    #[command(about = "List the tool operations available to `call`")]
    Tools,
    #[command(
        about = "Invoke a tool operation with JSON arguments",
        after_help = "Example:\n    flowbridge call get_translation_complexity --args args.json"
    )]
    Call(CallArgs),
    #[command(about = "Probe the generative fallback service")]
    Health,
}

pub async fn run(args: Args, cancel: CancellationToken) -> crate::Result<()> {
    let config = args.config.as_deref();
    match args.command {
        Command::Translate(translate_args) => commands::translate(translate_args, config, &cancel).await,
        Command::Feasibility(feasibility_args) => commands::feasibility(feasibility_args, config, &cancel).await,
        Command::Capabilities(capabilities_args) => commands::capabilities(capabilities_args, config, &cancel).await,
        Command::Complexity(complexity_args) => commands::complexity(complexity_args, config, &cancel).await,
        Command::Recommend(recommend_args) => commands::recommend(recommend_args, config, &cancel).await,
        Command::Expression(expression_args) => commands::expression(expression_args, config, &cancel).await,
        Command::Analyze(analyze_args) => commands::analyze(analyze_args, config, &cancel).await,
        Command::Batch(batch_args) => commands::batch(batch_args, config, &cancel).await,
        Command::Tools => commands::tools(),
        Command::Call(call_args) => commands::call(call_args, config, &cancel).await,
        Command::Health => commands::health(config).await,
    }
}
