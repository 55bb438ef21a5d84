use crate::logging::config::LoggingConfig;
use crate::Result;
use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self as tracing_fmt, format};
use tracing_subscriber::registry::LookupSpan;

const LOG_FILE_NAME: &str = "flowbridge.log";

pub type FileFmtLayer<S> = tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Full>, NonBlocking>;

/// `None` when the file sink is off; `Option<Layer>` is itself a no-op layer.
pub type FileLayerStack<S> = tracing_subscriber::layer::Layered<Option<FileFmtLayer<S>>, S>;

/// An open log file. Dropping `guard` flushes pending lines.
pub struct FileSink<S> {
    pub layer: FileFmtLayer<S>,
    pub guard: WorkerGuard,
    pub path: PathBuf,
}

/// Log file location: `log_dir` when configured, else the user's local data directory.
pub fn log_file_path(config: &LoggingConfig) -> Result<PathBuf> {
    let directory = match &config.log_dir {
        Some(dir) => dir.clone(),
        None => dirs_next::data_local_dir()
            .ok_or_else(|| anyhow!("no local data directory available for log files"))?
            .join("flowbridge")
            .join("logs"),
    };
    Ok(directory.join(LOG_FILE_NAME))
}

/// Open `log_file` for appending behind a non-blocking writer, creating its directory.
pub fn open_file_sink<S>(log_file: &Path) -> Result<FileSink<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let directory = log_file
        .parent()
        .ok_or_else(|| anyhow!("log file path {} has no parent directory", log_file.display()))?;
    let file_name = log_file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("log file path {} has no file name", log_file.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    Ok(FileSink {
        layer,
        guard,
        path: log_file.to_path_buf(),
    })
}
