use crate::cli::Command;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// A person running a single command in a terminal.
    Interactive,
    /// Batch translation, which should be quiet on the console.
    Batch,
    /// Raw tool calls, usually driven by another program reading stdout.
    ToolCall,
}

/// Derive the active execution context from a parsed CLI command.
pub fn detect_context(command: &Command) -> ExecutionContext {
    match command {
        Command::Batch(_) => ExecutionContext::Batch,
        Command::Call(_) => ExecutionContext::ToolCall,
        Command::Translate(_)
        | Command::Feasibility(_)
        | Command::Capabilities(_)
        | Command::Complexity(_)
        | Command::Recommend(_)
        | Command::Expression(_)
        | Command::Analyze(_)
        | Command::Tools
        | Command::Health => ExecutionContext::Interactive,
    }
}
