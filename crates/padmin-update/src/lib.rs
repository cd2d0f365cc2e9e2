//! # padmin-update
//!
//! Self-update pipeline for the Previous Admin dashboard:
//!
//! - [`process`] - External command execution with captured, mirrored output
//! - [`transfer`] - Download, extraction, and directory mirroring behind the
//!   [`TransferOps`] seam
//! - [`release`] - Latest-release metadata model
//! - [`event`] - Status events published by the orchestrator
//! - [`update_log`] - Append-only timestamped log for post-mortems
//! - [`updater`] - The [`Updater`] orchestrator with rollback and a simulated
//!   mode

pub mod event;
pub mod process;
pub mod release;
pub mod transfer;
pub mod update_log;
pub mod updater;

// Re-export main types for convenience
pub use event::{UpdateEvent, UpdateStatus, keys};
pub use process::{CommandOutput, run_command};
pub use release::{Release, ReleaseAsset};
pub use transfer::{ArchiveKind, SystemTransfer, TransferOps, archive_kind, resolve_source_root};
pub use update_log::UpdateLog;
pub use updater::{RELEASES_API, Updater, UpdaterConfig};
