//! Well-known filesystem locations for Previous Admin.
//!
//! Everything the updater persists outside the project tree lives under the
//! per-user hidden data directory `~/.previous-admin`: logs, backups, and the
//! version metadata file. The emulator's own configuration lives under
//! `~/.config/previous/`.

use std::path::PathBuf;

use crate::error::{PadminError, Result};

/// Name of the hidden per-user data directory (also excluded from replace).
pub const DATA_DIR_NAME: &str = ".previous-admin";

/// Environment variable overriding the update log file location.
pub const UPDATER_LOG_ENV: &str = "UPDATER_LOG";

/// Status snapshot file written next to the working directory by the CLI.
pub const STATUS_SNAPSHOT_FILE: &str = ".update-status.json";

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").map_err(|_| PadminError::Internal {
        message: "HOME environment variable not set".into(),
    })?;
    Ok(PathBuf::from(home))
}

/// Per-user data directory: `~/.previous-admin`.
pub fn data_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(DATA_DIR_NAME))
}

/// Log directory: `~/.previous-admin/logs`.
pub fn log_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("logs"))
}

/// Backup root: `~/.previous-admin/backup`. Timestamped backup directories
/// are created beneath this.
pub fn backup_root() -> Result<PathBuf> {
    Ok(data_dir()?.join("backup"))
}

/// Version metadata file: `~/.previous-admin/version.json`.
pub fn version_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("version.json"))
}

/// Update log file, honoring the `UPDATER_LOG` environment override.
///
/// Defaults to `~/.previous-admin/logs/updater.log`.
pub fn updater_log_file() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(UPDATER_LOG_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(log_dir()?.join("updater.log"))
}

/// Emulator configuration file: `~/.config/previous/previous.cfg`.
pub fn emulator_config_file() -> Result<PathBuf> {
    Ok(home_dir()?.join(".config").join("previous").join("previous.cfg"))
}
