//! The update orchestrator.
//!
//! Runs the pipeline as one sequential task: fetch release metadata, download,
//! extract, back up, replace, reinstall dependencies, rebuild, restart
//! services. Every step emits a status event with a non-decreasing progress
//! value before execution; the backup step is the rollback checkpoint — any
//! later failure triggers a restore attempt from that backup.
//!
//! [`Updater::start_update`] never returns an error: callers learn the outcome
//! from the emitted events or from [`Updater::status`]. No cross-process lock
//! is taken; callers must ensure only one update runs at a time against a
//! given project directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use padmin_core::{PadminError, Result, best_effort, paths};

use crate::event::{UpdateEvent, UpdateStatus, keys};
use crate::transfer::{SystemTransfer, TransferOps};
use crate::update_log::UpdateLog;

/// GitHub API URL for the latest Previous Admin release.
pub const RELEASES_API: &str =
    "https://api.github.com/repos/LAYEREDwork/previous-admin/releases/latest";

const ACCEPT_HEADER: &str = "Accept: application/vnd.github.v3+json";
const USER_AGENT_HEADER: &str = "User-Agent: Previous-Admin-Updater";

/// Services restarted (best-effort) after a successful replace and rebuild.
const MANAGED_SERVICES: [&str; 2] = ["previous-admin-backend", "previous-admin-frontend"];

/// Version metadata persisted after a successful replace.
#[derive(Debug, Serialize)]
struct VersionInfo<'a> {
    version: &'a str,
}

/// Configuration for one [`Updater`] instance.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Live project directory that gets replaced in place.
    pub project_dir: PathBuf,
    /// Per-user data directory holding backups and the version file.
    pub data_dir: PathBuf,
    /// Append-only update log file.
    pub log_file: PathBuf,
    /// Latest-release metadata endpoint.
    pub repo_api_url: String,
}

impl UpdaterConfig {
    /// Config with default data locations under `~/.previous-admin`.
    pub fn new(project_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            project_dir: project_dir.into(),
            data_dir: paths::data_dir()?,
            log_file: paths::updater_log_file()?,
            repo_api_url: RELEASES_API.to_string(),
        })
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_log_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.log_file = file.into();
        self
    }

    pub fn with_repo_api_url(mut self, url: impl Into<String>) -> Self {
        self.repo_api_url = url.into();
        self
    }
}

/// Sequences the update pipeline, maintains the current status, and fans
/// status events out to all subscribers.
pub struct Updater {
    config: UpdaterConfig,
    ops: Arc<dyn TransferOps>,
    log: UpdateLog,
    status: Mutex<UpdateEvent>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<UpdateEvent>>>,
}

impl Updater {
    /// Updater backed by the real external tools (curl, tar, rsync, npm).
    pub fn new(config: UpdaterConfig) -> Self {
        Self::with_ops(config, Arc::new(SystemTransfer::new()))
    }

    /// Updater with a custom transfer layer. This is the seam tests use to
    /// drive the pipeline without touching the network or the filesystem.
    pub fn with_ops(config: UpdaterConfig, ops: Arc<dyn TransferOps>) -> Self {
        let log = UpdateLog::new(&config.log_file);
        Self {
            config,
            ops,
            log,
            status: Mutex::new(UpdateEvent::idle()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe to the status event stream. Every subscriber receives every
    /// subsequent event, in emission order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UpdateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// The most recently emitted status event.
    pub fn status(&self) -> UpdateEvent {
        self.status.lock().unwrap().clone()
    }

    /// Run the update pipeline to completion or failure.
    ///
    /// Resolves normally regardless of outcome; inspect the emitted events or
    /// [`Updater::status`] to learn success or failure. With `simulate` set,
    /// the same sequence of status keys is emitted at fixed delays without any
    /// real filesystem or network operations.
    pub async fn start_update(&self, simulate: bool) {
        self.log.note("Update started");
        self.emit_step(keys::RUNNING, 1, "Update started", None);

        let mut checkpoint: Option<PathBuf> = None;
        let outcome = if simulate {
            self.simulate_steps().await;
            Ok(())
        } else {
            self.run_pipeline(&mut checkpoint).await
        };

        match outcome {
            Ok(()) => {
                self.emit_completed();
                self.log.note("Update completed successfully");
            }
            Err(err) => {
                let message = err.to_string();
                self.log.note(&format!("Update failed: {message}"));
                self.emit_error(&message);
                if let Some(backup) = checkpoint {
                    self.attempt_rollback(&backup).await;
                }
            }
        }
    }

    async fn run_pipeline(&self, checkpoint: &mut Option<PathBuf>) -> Result<()> {
        let project_dir = self.config.project_dir.clone();

        self.emit_step(keys::CHECKING, 5, "Checking latest release", None);
        self.log.note("Checking latest release");

        let temp_dir = std::env::temp_dir()
            .join(format!("previous-admin-update-{}", Utc::now().timestamp_millis()));
        std::fs::create_dir_all(&temp_dir).map_err(|e| PadminError::DirectoryCreation {
            path: temp_dir.clone(),
            source: e,
        })?;

        let release = self.fetch_release(&temp_dir).await?;
        let version = release.version().to_string();
        let asset_url = release
            .asset_url()
            .ok_or_else(|| PadminError::NoReleaseAsset {
                tag: release.tag_name.clone(),
            })?
            .to_string();

        let mut args = HashMap::new();
        args.insert("version".to_string(), version.clone());
        self.emit_step(
            keys::DOWNLOADING,
            15,
            &format!("Downloading version {version}"),
            Some(args),
        );
        self.log.note(&format!("Downloading {asset_url}"));
        let archive = temp_dir.join("update.asset");
        self.ops.download(&asset_url, &archive).await?;

        self.emit_step(keys::EXTRACTING, 30, "Extracting files", None);
        self.log.note("Extracting files");
        let source_dir = self
            .ops
            .extract_archive(&archive, &temp_dir.join("src"))
            .await?;

        let backup_dir = self
            .config
            .data_dir
            .join("backup")
            .join(format!("previous-admin-backup-{}", Utc::now().timestamp_millis()));
        self.emit_step(keys::BACKUP, 40, "Creating backup", None);
        self.log.note(&format!("Creating backup {}", backup_dir.display()));
        self.ops.create_backup(&project_dir, &backup_dir).await?;
        // Rollback checkpoint: from here on, failure restores from this backup.
        *checkpoint = Some(backup_dir);

        self.emit_step(keys::INSTALLING, 55, "Installing new files", None);
        self.log
            .note(&format!("Replacing project with {}", source_dir.display()));
        self.ops.replace_project(&source_dir, &project_dir).await?;

        best_effort("version file write", self.write_version_file(&version));

        self.emit_step(keys::DEPENDENCIES, 65, "Installing dependencies", None);
        self.log.note("Installing dependencies");
        self.ops
            .run("npm", &["install", "--prefer-offline"], Some(&project_dir))
            .await?;

        self.emit_step(keys::BUILDING, 80, "Building application", None);
        self.log.note("Building application");
        self.ops
            .run("npm", &["run", "build"], Some(&project_dir))
            .await?;

        self.emit_step(keys::STARTING, 90, "Starting services", None);
        self.log.note("Starting services");
        best_effort(
            "service restart",
            self.ops
                .run(
                    "systemctl",
                    &["--user", "restart", MANAGED_SERVICES[0], MANAGED_SERVICES[1]],
                    None,
                )
                .await,
        );

        best_effort(
            "temp dir cleanup",
            std::fs::remove_dir_all(&temp_dir)
                .map_err(|e| PadminError::io("removing temp dir", &temp_dir, e)),
        );
        self.log.note("Cleanup finished");

        Ok(())
    }

    async fn fetch_release(&self, temp_dir: &Path) -> Result<crate::release::Release> {
        let release_json = temp_dir.join("release.json");
        let release_json_str = release_json.to_string_lossy().into_owned();
        self.ops
            .run(
                "curl",
                &[
                    "-sSf",
                    "-H",
                    ACCEPT_HEADER,
                    "-H",
                    USER_AGENT_HEADER,
                    "-o",
                    &release_json_str,
                    &self.config.repo_api_url,
                ],
                None,
            )
            .await?;
        let raw = std::fs::read_to_string(&release_json)
            .map_err(|e| PadminError::io("reading release metadata", &release_json, e))?;
        crate::release::Release::parse(&raw)
    }

    async fn attempt_rollback(&self, backup: &Path) {
        self.emit_rollback("Restoring backup");
        self.log
            .note(&format!("Restoring backup from {}", backup.display()));
        match self
            .ops
            .restore_backup(backup, &self.config.project_dir)
            .await
        {
            Ok(()) => {
                self.log.note("Rollback completed");
                info!("rollback completed from {}", backup.display());
            }
            Err(rollback_err) => {
                // The original failure stays the cause; the rollback failure
                // is surfaced as a second error event.
                self.log.note(&format!("Rollback failed: {rollback_err}"));
                self.emit_error(&format!("Rollback failed: {rollback_err}"));
            }
        }
    }

    fn write_version_file(&self, version: &str) -> Result<()> {
        let file = self.config.data_dir.join("version.json");
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PadminError::DirectoryCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let body = serde_json::to_string_pretty(&VersionInfo { version })
            .map_err(|e| PadminError::internal(format!("serializing version info: {e}")))?;
        std::fs::write(&file, body).map_err(|e| PadminError::io("writing version file", &file, e))
    }

    /// Emit the real pipeline's status keys at fixed delays without touching
    /// the filesystem or the network. Used for interactive rehearsal of
    /// status-event consumers.
    async fn simulate_steps(&self) {
        let steps: [(&str, u8, &str, u64); 5] = [
            (keys::DOWNLOADING, 10, "Simulated download", 400),
            (keys::EXTRACTING, 30, "Simulated extraction", 400),
            (keys::BACKUP, 45, "Simulated backup", 300),
            (keys::INSTALLING, 60, "Simulated install", 500),
            (keys::BUILDING, 80, "Simulated build", 400),
        ];
        for (key, progress, message, delay_ms) in steps {
            self.emit_step(key, progress, message, None);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    fn emit_step(
        &self,
        key: &str,
        progress: u8,
        message: &str,
        args: Option<HashMap<String, String>>,
    ) {
        self.emit(UpdateEvent {
            key: key.to_string(),
            args,
            progress,
            status: UpdateStatus::Running,
            message: Some(message.to_string()),
        });
    }

    fn emit_completed(&self) {
        self.emit(UpdateEvent {
            key: keys::COMPLETED.to_string(),
            args: None,
            progress: 100,
            status: UpdateStatus::Completed,
            message: Some("Update completed".to_string()),
        });
    }

    fn emit_error(&self, message: &str) {
        self.emit(UpdateEvent {
            key: keys::ERROR.to_string(),
            args: None,
            progress: 0,
            status: UpdateStatus::Error,
            message: Some(message.to_string()),
        });
    }

    /// Rollback is a sub-step of the error state: the run still settles as
    /// `Error` even when restoration succeeds.
    fn emit_rollback(&self, message: &str) {
        self.emit(UpdateEvent {
            key: keys::ROLLBACK.to_string(),
            args: None,
            progress: 0,
            status: UpdateStatus::Error,
            message: Some(message.to_string()),
        });
    }

    fn emit(&self, event: UpdateEvent) {
        *self.status.lock().unwrap() = event.clone();
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
