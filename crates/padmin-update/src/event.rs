//! Status events emitted by the update orchestrator.
//!
//! Events are immutable snapshots: a new instance replaces the orchestrator's
//! current status on every transition, and the latest instance stays queryable
//! via [`crate::Updater::status`]. The `key` is a symbolic identifier the UI
//! maps to a translated message; `message` is the human-readable fallback used
//! for logs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Symbolic status keys, in pipeline order.
pub mod keys {
    pub const RUNNING: &str = "updater.running";
    pub const CHECKING: &str = "updater.checking";
    pub const DOWNLOADING: &str = "updater.downloading";
    pub const EXTRACTING: &str = "updater.extracting";
    pub const BACKUP: &str = "updater.backup";
    pub const INSTALLING: &str = "updater.installing";
    pub const DEPENDENCIES: &str = "updater.dependencies";
    pub const BUILDING: &str = "updater.building";
    pub const STARTING: &str = "updater.starting";
    pub const COMPLETED: &str = "updater.completed";
    pub const ERROR: &str = "updater.error";
    pub const ROLLBACK: &str = "updater.rollback";
}

/// Overall state of an update run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Idle,
    Running,
    Error,
    Completed,
}

impl UpdateStatus {
    /// Returns true once the run has settled.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error | Self::Completed)
    }
}

/// One status snapshot of the update pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEvent {
    /// Symbolic status identifier (see [`keys`]).
    pub key: String,
    /// Optional key-value substitutions for message templating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<HashMap<String, String>>,
    /// Progress percentage, 0-100, non-decreasing over a successful run.
    pub progress: u8,
    pub status: UpdateStatus,
    /// Human-readable fallback for logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UpdateEvent {
    /// Initial status before any update has been started.
    pub fn idle() -> Self {
        Self {
            key: keys::STARTING.to_string(),
            args: None,
            progress: 0,
            status: UpdateStatus::Idle,
            message: None,
        }
    }
}

impl Default for UpdateEvent {
    fn default() -> Self {
        Self::idle()
    }
}
