//! Logging infrastructure for Previous Admin services.
//!
//! Structured logging via the `tracing` ecosystem: a JSON-lines file layer
//! under `~/.previous-admin/logs/` and a human-readable console layer on
//! stderr. This is diagnostic logging only; the updater additionally keeps its
//! own append-only plain-text log (see `padmin-update`) so a post-mortem is
//! possible even when no subscriber was initialised.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{PadminError, Result};
use crate::paths;

/// Guard that must be held to ensure log flushing on shutdown.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system.
///
/// Sets up file logging (JSON lines, daily rotation) and console logging on
/// stderr. Returns a [`LogGuard`] that must be held for the application
/// lifetime so pending entries are flushed on shutdown.
///
/// # Arguments
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.previous-admin/logs/`.
/// * `verbose` - If true, sets the default log level to DEBUG instead of INFO.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => paths::log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| PadminError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "padmin.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("padmin={default_level}")));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_current_span(true)
        .with_span_list(true);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(true)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Initialize minimal console-only logging for testing.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
