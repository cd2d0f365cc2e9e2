//! Previous Admin updater CLI.
//!
//! Standalone entry point for the self-update pipeline, intended to be run by
//! a privileged wrapper script or a supervisor process.
//!
//! ## Usage
//!
//! ```bash
//! # Run a real update against the current directory
//! padmin-updater
//!
//! # Rehearse the pipeline without touching anything
//! padmin-updater --simulate
//!
//! # Update an explicit project directory, with verbose logging
//! padmin-updater --project-dir /srv/previous-admin -v
//! ```
//!
//! While running, every status event is written as newline-delimited JSON on
//! stdout and mirrored to a `.update-status.json` snapshot in the working
//! directory so a supervisor can poll the latest state.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info};

use padmin_core::{LogGuard, init_logging, paths};
use padmin_update::{UpdateEvent, UpdateStatus, Updater, UpdaterConfig};

/// Previous Admin self-updater
///
/// Downloads the latest release, backs up the current installation, replaces
/// it, and rolls back on failure. Status events stream on stdout as NDJSON.
#[derive(Parser, Debug)]
#[command(name = "padmin-updater")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit the pipeline's status events at fixed delays without performing
    /// any real filesystem or network operations
    #[arg(long, alias = "dev")]
    simulate: bool,

    /// Project directory to update (defaults to the current directory)
    #[arg(long)]
    project_dir: Option<PathBuf>,

    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.previous-admin/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::from(1);
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("updater error: {e}");
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> padmin_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

#[tokio::main]
async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let project_dir = match cli.project_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    info!(
        project_dir = %project_dir.display(),
        simulate = cli.simulate,
        "starting update"
    );

    let updater = Arc::new(Updater::new(UpdaterConfig::new(project_dir)?));
    let mut rx = updater.subscribe();

    // Stream events while the pipeline runs; the channel closes when the
    // updater is dropped after the run settles.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            write_status_snapshot(&event);
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => debug!("failed to serialize status event: {e}"),
            }
        }
    });

    let runner = {
        let updater = Arc::clone(&updater);
        let simulate = cli.simulate;
        tokio::spawn(async move {
            updater.start_update(simulate).await;
        })
    };
    let _ = runner.await;

    let final_status = updater.status();
    drop(updater);
    let _ = writer.await;

    // A failed pipeline yields a nonzero exit so supervisors can tell the
    // difference without parsing the event stream.
    if final_status.status == UpdateStatus::Error {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Best-effort status snapshot next to the working directory, for external
/// polling by a supervisor process.
fn write_status_snapshot(event: &UpdateEvent) {
    let path = PathBuf::from(paths::STATUS_SNAPSHOT_FILE);
    match serde_json::to_vec(event) {
        Ok(body) => {
            if let Err(e) = std::fs::write(&path, body) {
                debug!("failed to write status snapshot: {e}");
            }
        }
        Err(e) => debug!("failed to serialize status snapshot: {e}"),
    }
}
