//! Append-only update log.
//!
//! One timestamped plain-text line per pipeline transition, written as a side
//! channel independent of the in-memory event stream so a post-mortem is
//! possible even if no event subscriber was listening live. Never JSON, never
//! fatal: a failed append is logged at WARN level and swallowed.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use padmin_core::{PadminError, Result, paths};

/// Handle to the append-only update log file.
#[derive(Debug, Clone)]
pub struct UpdateLog {
    path: PathBuf,
}

impl UpdateLog {
    /// Log writing to an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log at the default location, honoring the `UPDATER_LOG` env override.
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(paths::updater_log_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line.
    pub fn append(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PadminError::LogWrite {
                path: self.path.clone(),
                source: e,
            })?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PadminError::LogWrite {
                path: self.path.clone(),
                source: e,
            })?;
        writeln!(file, "[{}] {}", Utc::now().to_rfc3339(), line).map_err(|e| {
            PadminError::LogWrite {
                path: self.path.clone(),
                source: e,
            }
        })
    }

    /// Best-effort append: failures are logged and swallowed.
    pub fn note(&self, line: &str) {
        padmin_core::best_effort("update log write", self.append(line));
    }
}
