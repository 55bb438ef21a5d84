use clap::Args;
use std::path::PathBuf;

/// Source and target platform pair shared by most commands.
#[derive(Args, Debug, Clone)]
pub struct PlatformPair {
    /// Platform the workflow comes from (n8n, make, zapier)
    #[arg(long = "from", value_name = "PLATFORM")]
    pub source: String,

    /// Platform to translate into (n8n, make, zapier)
    #[arg(long = "to", value_name = "PLATFORM")]
    pub target: String,
}

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Workflow JSON file, or `-` to read stdin
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub platforms: PlatformPair,

    /// Skip the target-platform optimizer
    #[arg(long)]
    pub no_optimize: bool,

    /// Keep source node names instead of deriving them from node types
    #[arg(long)]
    pub preserve_names: bool,

    /// Warn about parameters the mapping table does not carry over
    #[arg(long)]
    pub strict: bool,

    /// Write the translated workflow alone to this file
    #[arg(long, short, value_name = "FILE", help_heading = "Output Options")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FeasibilityArgs {
    /// Workflow JSON file, or `-` to read stdin
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub platforms: PlatformPair,
}

#[derive(Args, Debug)]
pub struct CapabilitiesArgs {
    /// Platforms to describe (default: all)
    #[arg(value_name = "PLATFORM")]
    pub platforms: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ComplexityArgs {
    #[command(flatten)]
    pub platforms: PlatformPair,
}

#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Workflows need custom code steps
    #[arg(long)]
    pub custom_code: bool,

    /// Workflows need loops over items
    #[arg(long)]
    pub loops: bool,

    /// Workflows need branching or merging logic
    #[arg(long)]
    pub complex_logic: bool,

    /// The team prefers to self-host
    #[arg(long)]
    pub self_host: bool,

    /// Technical level of the team
    #[arg(
        long,
        default_value = "intermediate",
        value_parser = ["beginner", "intermediate", "advanced"]
    )]
    pub level: String,

    /// Budget available for the platform
    #[arg(long, default_value = "medium", value_parser = ["low", "medium", "high"])]
    pub budget: String,
}

#[derive(Args, Debug)]
pub struct ExpressionArgs {
    /// Expression text in the source platform's syntax
    #[arg(value_name = "EXPRESSION")]
    pub expression: String,

    #[command(flatten)]
    pub platforms: PlatformPair,

    /// JSON file describing upstream and referenced nodes
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Workflow JSON file, or `-` to read stdin
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Platform the workflow belongs to
    #[arg(long, value_name = "PLATFORM")]
    pub platform: String,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Workflow JSON files; a file holding a JSON array contributes every element
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub platforms: PlatformPair,

    /// Skip the target-platform optimizer
    #[arg(long)]
    pub no_optimize: bool,

    /// Workflows translated at the same time (default: [batch] concurrency)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Tool name as listed by `flowbridge tools`
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// JSON arguments file, or `-` to read stdin (default: `{}`)
    #[arg(long, value_name = "FILE")]
    pub args: Option<PathBuf>,
}
