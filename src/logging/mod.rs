pub mod config;
pub mod context;
pub mod layers;

pub use context::{detect_context, ExecutionContext};
pub use layers::console::ConsoleOutput;

use crate::logging::config::LoggingConfig;
use crate::logging::layers::{console, file};
use crate::{cli::Command, Result};
use anyhow::Context;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

/// Keeps the file writer alive; drop it last so buffered lines reach disk.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global subscriber for `command`.
///
/// `RUST_LOG` wins over the configured level. Fails if a subscriber is already set.
pub fn init(command: &Command, config_path: Option<&Path>) -> Result<LoggingGuard> {
    let context = detect_context(command);
    let config = LoggingConfig::load(config_path)?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .context("invalid log level")?;

    let (file_layer, file_guard, log_file) = if config.enable_file {
        let sink = file::open_file_sink::<Registry>(&file::log_file_path(&config)?)?;
        (Some(sink.layer), Some(sink.guard), Some(sink.path))
    } else {
        (None, None, None)
    };

    let console_output = console::select_console_output(context, config.console_output);
    let console_layer = console::console_layer::<file::FileLayerStack<Registry>>(console_output);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .with(env_filter)
        .try_init()
        .context("logging already initialized")?;

    tracing::debug!(?context, ?console_output, log_file = ?log_file, "logging initialized");
    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
