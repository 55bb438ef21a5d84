use crate::logging::context::ExecutionContext;
use serde::Deserialize;
use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

pub type ConsoleFmtLayer<S> =
    tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Compact>, BoxMakeWriter>;

/// Console sink. Stdout carries command output, so logs default to stderr.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

/// Batch runs never log to the console; tool calls stay quiet unless configured.
pub fn select_console_output(context: ExecutionContext, configured: Option<ConsoleOutput>) -> ConsoleOutput {
    match context {
        ExecutionContext::Batch => ConsoleOutput::None,
        ExecutionContext::ToolCall => configured.unwrap_or(ConsoleOutput::None),
        ExecutionContext::Interactive => configured.unwrap_or_default(),
    }
}

/// `None` for a silent console; the caller keeps the layer slot either way.
pub fn console_layer<S>(output: ConsoleOutput) -> Option<ConsoleFmtLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let writer = match output {
        ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
        ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
        ConsoleOutput::None => return None,
    };
    Some(
        tracing_fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false),
    )
}
