//! Tracing subscriber setup.
//!
//! Logs go to stdout and, optionally, to a file as well. `RUST_LOG` takes
//! precedence over the configured level.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the level filter.
///
/// `RUST_LOG` wins when set and valid; otherwise `verbose` selects `debug`
/// and the configured `level` is used.
pub fn build_filter(level: &str, verbose: bool) -> EnvFilter {
    let fallback = if verbose { "debug" } else { level };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber.
///
/// When `file` is set, a second non-ANSI layer appends to it. The returned
/// guard flushes the file writer on drop and must be held until exit.
pub fn init_logging(level: &str, file: Option<&Path>, verbose: bool) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(level, verbose);
    let stdout_layer = fmt::layer().with_target(false);

    let (file_layer, guard) = match file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn file_writer(path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    Ok(tracing_appender::non_blocking(appender))
}
