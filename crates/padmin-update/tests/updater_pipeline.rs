//! Integration tests for the update pipeline with a mock transfer layer.
//!
//! The mock replaces curl/tar/rsync with in-process filesystem operations and
//! records how often each helper ran, so the rollback semantics can be
//! asserted without network access or a real installation tree.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use padmin_core::{PadminError, Result};
use padmin_update::{
    CommandOutput, TransferOps, UpdateEvent, UpdateStatus, Updater, UpdaterConfig, keys,
};

/// Recursive additive copy, standing in for the rsync mirror in tests.
fn copy_tree(src: &Path, dst: &Path) {
    std::fs::create_dir_all(dst).unwrap();
    for entry in std::fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let from = entry.path();
        let to = dst.join(entry.file_name());
        if from.is_dir() {
            copy_tree(&from, &to);
        } else {
            std::fs::copy(&from, &to).unwrap();
        }
    }
}

/// Mock [`TransferOps`] with per-helper invocation counters.
#[derive(Default)]
struct MockTransfer {
    release_json: String,
    fail_replace: bool,
    fail_restore: bool,
    fail_restart: bool,
    downloads: AtomicUsize,
    extracts: AtomicUsize,
    backups: AtomicUsize,
    replaces: AtomicUsize,
    restores: AtomicUsize,
    /// Archive path and bytes seen by the extract stage, as handed over from
    /// the download stage.
    extracted_archive: Mutex<Option<(PathBuf, Vec<u8>)>>,
}

impl MockTransfer {
    fn with_release(release_json: &str) -> Self {
        Self {
            release_json: release_json.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl TransferOps for MockTransfer {
    async fn run(
        &self,
        command: &str,
        args: &[&str],
        _cwd: Option<&Path>,
    ) -> Result<CommandOutput> {
        // The metadata fetch writes the release JSON to the -o path; every
        // other command (npm, systemctl) succeeds silently unless configured
        // to fail the restart.
        if command == "curl" {
            if let Some(pos) = args.iter().position(|a| *a == "-o") {
                let out = PathBuf::from(args[pos + 1]);
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(&out, &self.release_json).unwrap();
            }
        }
        if command == "systemctl" && self.fail_restart {
            return Err(PadminError::CommandFailed {
                command: command.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                code: 1,
                stderr: "Failed to restart unit".to_string(),
            });
        }
        Ok(CommandOutput {
            code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn download(&self, _url: &str, dest: &Path) -> Result<()> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(dest, b"mock archive bytes").unwrap();
        Ok(())
    }

    async fn extract_archive(&self, archive: &Path, dest: &Path) -> Result<PathBuf> {
        self.extracts.fetch_add(1, Ordering::SeqCst);
        *self.extracted_archive.lock().unwrap() =
            Some((archive.to_path_buf(), std::fs::read(archive).unwrap()));
        let src = dest.join("repo-src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("file.txt"), "NEW").unwrap();
        Ok(src)
    }

    async fn create_backup(&self, project: &Path, backup: &Path) -> Result<()> {
        self.backups.fetch_add(1, Ordering::SeqCst);
        copy_tree(project, backup);
        Ok(())
    }

    async fn replace_project(&self, source: &Path, project: &Path) -> Result<()> {
        self.replaces.fetch_add(1, Ordering::SeqCst);
        if self.fail_replace {
            return Err(PadminError::ReplaceFailed {
                project: project.to_path_buf(),
                cause: Box::new(PadminError::internal("simulated replace failure")),
            });
        }
        copy_tree(source, project);
        Ok(())
    }

    async fn restore_backup(&self, backup: &Path, project: &Path) -> Result<()> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        if self.fail_restore {
            return Err(PadminError::RestoreFailed {
                backup: backup.to_path_buf(),
                cause: Box::new(PadminError::internal("simulated restore failure")),
            });
        }
        copy_tree(backup, project);
        Ok(())
    }
}

const RELEASE_WITH_TARBALL: &str =
    r#"{"tag_name": "v9.9.9", "tarball_url": "https://example.invalid/archive.tar.gz"}"#;

/// Project tree with one file, plus a nested subdirectory so backup fidelity
/// is observable.
fn setup_project(tmp: &TempDir) -> PathBuf {
    let project = tmp.path().join("project");
    std::fs::create_dir_all(project.join("config")).unwrap();
    std::fs::write(project.join("file.txt"), "ORIGINAL").unwrap();
    std::fs::write(project.join("config").join("settings.json"), "{\"a\":1}").unwrap();
    project
}

fn updater_with(tmp: &TempDir, ops: Arc<MockTransfer>) -> Updater {
    let config = UpdaterConfig {
        project_dir: tmp.path().join("project"),
        data_dir: tmp.path().join("data"),
        log_file: tmp.path().join("updater.log"),
        repo_api_url: "https://example.invalid/releases/latest".to_string(),
    };
    Updater::with_ops(config, ops)
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<UpdateEvent>) -> Vec<UpdateEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn replace_failure_rolls_back_to_backup() {
    let tmp = TempDir::new().unwrap();
    let project = setup_project(&tmp);

    let ops = Arc::new(MockTransfer {
        fail_replace: true,
        ..MockTransfer::with_release(RELEASE_WITH_TARBALL)
    });
    let updater = updater_with(&tmp, Arc::clone(&ops));
    let mut rx = updater.subscribe();

    updater.start_update(false).await;

    // Pre-update content restored exactly
    assert_eq!(
        std::fs::read_to_string(project.join("file.txt")).unwrap(),
        "ORIGINAL"
    );
    assert_eq!(
        std::fs::read_to_string(project.join("config").join("settings.json")).unwrap(),
        "{\"a\":1}"
    );

    // Error emitted before the rollback event
    let events = drain(&mut rx);
    let event_keys: Vec<&str> = events.iter().map(|e| e.key.as_str()).collect();
    let error_pos = event_keys.iter().position(|k| *k == keys::ERROR).unwrap();
    let rollback_pos = event_keys.iter().position(|k| *k == keys::ROLLBACK).unwrap();
    assert!(error_pos < rollback_pos);

    // Backup and restore each ran exactly once
    assert_eq!(ops.backups.load(Ordering::SeqCst), 1);
    assert_eq!(ops.restores.load(Ordering::SeqCst), 1);

    // The run settles as Error even though restoration succeeded
    assert_eq!(updater.status().status, UpdateStatus::Error);
}

#[tokio::test]
async fn rollback_failure_emits_second_error() {
    let tmp = TempDir::new().unwrap();
    setup_project(&tmp);

    let ops = Arc::new(MockTransfer {
        fail_replace: true,
        fail_restore: true,
        ..MockTransfer::with_release(RELEASE_WITH_TARBALL)
    });
    let updater = updater_with(&tmp, Arc::clone(&ops));
    let mut rx = updater.subscribe();

    updater.start_update(false).await;

    let events = drain(&mut rx);
    let errors: Vec<&UpdateEvent> = events.iter().filter(|e| e.key == keys::ERROR).collect();
    assert_eq!(errors.len(), 2);
    // First error reports the original failure, second the rollback failure
    assert!(
        errors[0]
            .message
            .as_deref()
            .unwrap()
            .contains("Replace failed")
    );
    assert!(
        errors[1]
            .message
            .as_deref()
            .unwrap()
            .starts_with("Rollback failed")
    );
    assert_eq!(updater.status().status, UpdateStatus::Error);
}

#[tokio::test]
async fn successful_run_completes_with_monotonic_progress() {
    let tmp = TempDir::new().unwrap();
    let project = setup_project(&tmp);

    let ops = Arc::new(MockTransfer::with_release(RELEASE_WITH_TARBALL));
    let updater = updater_with(&tmp, Arc::clone(&ops));
    let mut rx = updater.subscribe();

    updater.start_update(false).await;

    let events = drain(&mut rx);
    let progress: Vec<u8> = events.iter().map(|e| e.progress).collect();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    let last = events.last().unwrap();
    assert_eq!(last.progress, 100);
    assert_eq!(last.status, UpdateStatus::Completed);
    assert_eq!(last.key, keys::COMPLETED);

    // Project replaced with the extracted source
    assert_eq!(
        std::fs::read_to_string(project.join("file.txt")).unwrap(),
        "NEW"
    );

    // Version metadata persisted from the release tag
    let version_json =
        std::fs::read_to_string(tmp.path().join("data").join("version.json")).unwrap();
    assert!(version_json.contains("9.9.9"));

    // No rollback on the happy path
    assert_eq!(ops.restores.load(Ordering::SeqCst), 0);

    // The download landed at the destination the extract stage was handed,
    // with its content intact
    assert_eq!(ops.downloads.load(Ordering::SeqCst), 1);
    let guard = ops.extracted_archive.lock().unwrap();
    let (archive, bytes) = guard.as_ref().unwrap();
    assert_eq!(archive.file_name().unwrap(), "update.asset");
    assert_eq!(bytes, b"mock archive bytes");

    // The downloading event carries the version as a templating arg
    let downloading = events.iter().find(|e| e.key == keys::DOWNLOADING).unwrap();
    assert_eq!(
        downloading.args.as_ref().unwrap().get("version").unwrap(),
        "9.9.9"
    );
}

#[tokio::test]
async fn service_restart_failure_does_not_fail_update() {
    let tmp = TempDir::new().unwrap();
    let project = setup_project(&tmp);

    let ops = Arc::new(MockTransfer {
        fail_restart: true,
        ..MockTransfer::with_release(RELEASE_WITH_TARBALL)
    });
    let updater = updater_with(&tmp, Arc::clone(&ops));
    let mut rx = updater.subscribe();

    updater.start_update(false).await;

    // Restart is best-effort: the run still settles as Completed
    assert_eq!(updater.status().status, UpdateStatus::Completed);
    assert_eq!(
        std::fs::read_to_string(project.join("file.txt")).unwrap(),
        "NEW"
    );

    let events = drain(&mut rx);
    let event_keys: Vec<&str> = events.iter().map(|e| e.key.as_str()).collect();
    assert!(!event_keys.contains(&keys::ERROR));
    assert_eq!(ops.restores.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_asset_url_fails_without_rollback() {
    let tmp = TempDir::new().unwrap();
    setup_project(&tmp);

    let ops = Arc::new(MockTransfer::with_release(r#"{"tag_name": "v1.0.0"}"#));
    let updater = updater_with(&tmp, Arc::clone(&ops));
    let mut rx = updater.subscribe();

    updater.start_update(false).await;

    let events = drain(&mut rx);
    let event_keys: Vec<&str> = events.iter().map(|e| e.key.as_str()).collect();
    assert!(event_keys.contains(&keys::ERROR));
    // Failed before the checkpoint: no backup, no rollback attempt
    assert!(!event_keys.contains(&keys::ROLLBACK));
    assert_eq!(ops.backups.load(Ordering::SeqCst), 0);
    assert_eq!(ops.restores.load(Ordering::SeqCst), 0);

    let error = events.iter().find(|e| e.key == keys::ERROR).unwrap();
    assert!(
        error
            .message
            .as_deref()
            .unwrap()
            .contains("No release asset URL")
    );
}

#[tokio::test]
async fn simulated_mode_performs_no_operations() {
    let tmp = TempDir::new().unwrap();
    let project = setup_project(&tmp);

    let ops = Arc::new(MockTransfer::with_release(RELEASE_WITH_TARBALL));
    let updater = updater_with(&tmp, Arc::clone(&ops));
    let mut rx = updater.subscribe();

    updater.start_update(true).await;

    let events = drain(&mut rx);
    let event_keys: Vec<&str> = events.iter().map(|e| e.key.as_str()).collect();
    assert_eq!(
        event_keys,
        vec![
            keys::RUNNING,
            keys::DOWNLOADING,
            keys::EXTRACTING,
            keys::BACKUP,
            keys::INSTALLING,
            keys::BUILDING,
            keys::COMPLETED,
        ]
    );

    // No helper ran and the project tree is untouched
    assert_eq!(ops.downloads.load(Ordering::SeqCst), 0);
    assert_eq!(ops.backups.load(Ordering::SeqCst), 0);
    assert_eq!(ops.replaces.load(Ordering::SeqCst), 0);
    assert_eq!(
        std::fs::read_to_string(project.join("file.txt")).unwrap(),
        "ORIGINAL"
    );
}

#[tokio::test]
async fn update_log_records_pipeline_transitions() {
    let tmp = TempDir::new().unwrap();
    setup_project(&tmp);

    let ops = Arc::new(MockTransfer::with_release(RELEASE_WITH_TARBALL));
    let updater = updater_with(&tmp, ops);

    updater.start_update(false).await;

    let log = std::fs::read_to_string(tmp.path().join("updater.log")).unwrap();
    assert!(log.contains("Update started"));
    assert!(log.contains("Checking latest release"));
    assert!(log.contains("Update completed successfully"));
    // Timestamped, JSON-free lines
    assert!(log.lines().all(|l| l.starts_with('[')));
}
