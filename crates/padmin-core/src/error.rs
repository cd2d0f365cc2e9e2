//! Error types for Previous Admin operations.
//!
//! This module defines [`PadminError`], a closed set of tagged error variants
//! covering process execution, transfer helpers, the update pipeline, and the
//! configuration watcher. Variants carry structured fields (command, args, exit
//! code, stderr) so callers and tests can assert on data instead of substrings.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`PadminError`].
pub type Result<T> = std::result::Result<T, PadminError>;

/// Error type for all Previous Admin updater and watcher operations.
#[derive(Debug, Error)]
pub enum PadminError {
    // =========================================================================
    // Process Errors
    // =========================================================================
    /// Executable missing or unspawnable.
    #[error("Failed to spawn {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A spawned command exited with a nonzero status.
    #[error("Command failed: {command} {} (code={code})", .args.join(" "))]
    CommandFailed {
        command: String,
        args: Vec<String>,
        code: i32,
        stderr: String,
    },

    // =========================================================================
    // Transfer Errors
    // =========================================================================
    /// Network fetch of a release asset failed.
    #[error("Download failed for {url}")]
    DownloadFailed {
        url: String,
        #[source]
        cause: Box<PadminError>,
    },

    /// Archive extraction tool invocation failed.
    #[error("Extraction failed for {archive}")]
    ExtractFailed {
        archive: PathBuf,
        #[source]
        cause: Box<PadminError>,
    },

    /// Mirroring the project into the backup directory failed.
    #[error("Backup failed: {project} -> {backup}")]
    BackupFailed {
        project: PathBuf,
        backup: PathBuf,
        #[source]
        cause: Box<PadminError>,
    },

    /// Mirroring the extracted source into the project directory failed.
    #[error("Replace failed for project {project}")]
    ReplaceFailed {
        project: PathBuf,
        #[source]
        cause: Box<PadminError>,
    },

    /// Restoring the project from a backup failed.
    #[error("Restore failed from backup {backup}")]
    RestoreFailed {
        backup: PathBuf,
        #[source]
        cause: Box<PadminError>,
    },

    // =========================================================================
    // Release Metadata Errors
    // =========================================================================
    /// Release metadata lacked a usable download URL.
    #[error("No release asset URL found for release {tag}")]
    NoReleaseAsset { tag: String },

    /// Release metadata could not be parsed.
    #[error("Invalid release metadata: {message}")]
    ReleaseParse { message: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context.
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed.
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Appending to the update log failed. Always swallowed by callers;
    /// logging must never abort the pipeline.
    #[error("Failed to write update log {path}")]
    LogWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Emulator configuration file could not be read.
    #[error("Failed to read config file {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // File Watching Errors
    // =========================================================================
    /// File watcher initialization failed.
    #[error("Failed to initialize file watcher: {message}")]
    WatcherInit { message: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in Previous Admin).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PadminError {
    /// Create an I/O error.
    pub fn io(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error came from running an external command.
    pub fn is_process_error(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::CommandFailed { .. })
    }

    /// Returns true if this error came from a transfer helper.
    pub fn is_transfer_error(&self) -> bool {
        matches!(
            self,
            Self::DownloadFailed { .. }
                | Self::ExtractFailed { .. }
                | Self::BackupFailed { .. }
                | Self::ReplaceFailed { .. }
                | Self::RestoreFailed { .. }
        )
    }

    /// Exit code carried by a [`PadminError::CommandFailed`], if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
