//! Transfer helpers: download, archive extraction, and directory mirroring.
//!
//! Each helper is a thin composition over the process runner with a specific
//! external tool contract (curl, tar, unzip, rsync). They are grouped behind
//! the [`TransferOps`] trait so the orchestrator can be exercised against a
//! mock layer without touching the network or the live project tree.
//!
//! Mirroring (`--delete`) rather than additive copying is required so stale
//! files from a previous version do not linger after an update or rollback.
//! The explicit excludes keep dependency caches and the admin tool's own data
//! directory out of backup and replace.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use padmin_core::{PadminError, Result, paths};

use crate::process::{CommandOutput, run_command};

/// Directories never mirrored between the project and a backup.
pub const SYNC_EXCLUDES: [&str; 2] = ["node_modules", ".git"];

/// Archive flavor, picked from the archive's filename/URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

/// Pick the extraction tool from the archive path.
///
/// `.tar.gz`/`.tgz` and GitHub `/tarball/` URLs use tar; `.zip`/`.zipball`
/// uses unzip; anything else defaults to tar.
pub fn archive_kind(archive: &Path) -> ArchiveKind {
    let lower = archive.to_string_lossy().to_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") || lower.contains("/tarball/") {
        ArchiveKind::TarGz
    } else if lower.ends_with(".zip") || lower.ends_with(".zipball") {
        ArchiveKind::Zip
    } else {
        ArchiveKind::TarGz
    }
}

/// Locate the effective source root after extraction: the first child
/// directory in directory-listing order, or the destination itself when the
/// archive had no top-level directory.
pub fn resolve_source_root(dest: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dest)
        .map_err(|e| PadminError::io("listing extracted files", dest, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| PadminError::io("listing extracted files", dest, e))?;
        let path = entry.path();
        if path.is_dir() {
            return Ok(path);
        }
    }
    Ok(dest.to_path_buf())
}

/// External-tool operations used by the update pipeline.
///
/// [`SystemTransfer`] is the production implementation; tests substitute a
/// recording mock to drive the orchestrator without side effects.
#[async_trait]
pub trait TransferOps: Send + Sync {
    /// Run an arbitrary external command (dependency install, build, service
    /// control, release metadata fetch).
    async fn run(&self, command: &str, args: &[&str], cwd: Option<&Path>)
    -> Result<CommandOutput>;

    /// Download `url` to `dest`, creating the parent directory first.
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;

    /// Extract `archive` into `dest` and return the effective source root.
    async fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<PathBuf>;

    /// Mirror the project into a backup directory.
    async fn create_backup(&self, project: &Path, backup: &Path) -> Result<()>;

    /// Mirror the extracted source over the live project directory.
    async fn replace_project(&self, source: &Path, project: &Path) -> Result<()>;

    /// Mirror a backup back over the live project directory (full restore).
    async fn restore_backup(&self, backup: &Path, project: &Path) -> Result<()>;
}

/// Production [`TransferOps`] backed by curl, tar, unzip, and rsync.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTransfer;

impl SystemTransfer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransferOps for SystemTransfer {
    async fn run(
        &self,
        command: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<CommandOutput> {
        run_command(command, args, cwd).await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PadminError::DirectoryCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let dest_str = dest.to_string_lossy().into_owned();
        // -L follow redirects, -f fail on HTTP errors, -sS silent but keep errors
        run_command("curl", &["-L", "-f", "-s", "-S", "-o", &dest_str, url], None)
            .await
            .map_err(|e| PadminError::DownloadFailed {
                url: url.to_string(),
                cause: Box::new(e),
            })?;
        Ok(())
    }

    async fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dest).map_err(|e| PadminError::DirectoryCreation {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let archive_str = archive.to_string_lossy().into_owned();
        let dest_str = dest.to_string_lossy().into_owned();
        let result = match archive_kind(archive) {
            ArchiveKind::TarGz => {
                run_command("tar", &["-xzf", &archive_str, "-C", &dest_str], None).await
            }
            ArchiveKind::Zip => {
                run_command("unzip", &["-q", &archive_str, "-d", &dest_str], None).await
            }
        };
        result.map_err(|e| PadminError::ExtractFailed {
            archive: archive.to_path_buf(),
            cause: Box::new(e),
        })?;

        resolve_source_root(dest)
    }

    async fn create_backup(&self, project: &Path, backup: &Path) -> Result<()> {
        std::fs::create_dir_all(backup).map_err(|e| PadminError::DirectoryCreation {
            path: backup.to_path_buf(),
            source: e,
        })?;
        mirror(project, backup, &SYNC_EXCLUDES)
            .await
            .map_err(|e| PadminError::BackupFailed {
                project: project.to_path_buf(),
                backup: backup.to_path_buf(),
                cause: Box::new(e),
            })
            .map(|_| ())
    }

    async fn replace_project(&self, source: &Path, project: &Path) -> Result<()> {
        // The data directory survives an update so user data and config are kept.
        let excludes = [SYNC_EXCLUDES[0], SYNC_EXCLUDES[1], paths::DATA_DIR_NAME];
        mirror(source, project, &excludes)
            .await
            .map_err(|e| PadminError::ReplaceFailed {
                project: project.to_path_buf(),
                cause: Box::new(e),
            })
            .map(|_| ())
    }

    async fn restore_backup(&self, backup: &Path, project: &Path) -> Result<()> {
        // Destructive full restore: everything not in the backup is deleted.
        mirror(backup, project, &[])
            .await
            .map_err(|e| PadminError::RestoreFailed {
                backup: backup.to_path_buf(),
                cause: Box::new(e),
            })
            .map(|_| ())
    }
}

/// Mirroring copy via rsync: copies new/changed files and deletes files absent
/// from the source. Trailing slashes make rsync sync directory contents.
async fn mirror(from: &Path, to: &Path, excludes: &[&str]) -> Result<CommandOutput> {
    let from_arg = format!("{}/", from.display());
    let to_arg = format!("{}/", to.display());

    let mut args: Vec<&str> = vec!["-a", "--delete"];
    for exclude in excludes {
        args.push("--exclude");
        args.push(exclude);
    }
    args.push(&from_arg);
    args.push(&to_arg);

    run_command("rsync", &args, None).await
}
