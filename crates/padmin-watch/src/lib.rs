//! # padmin-watch
//!
//! Emulator configuration support for Previous Admin:
//!
//! - [`config`] - Lenient INI-style model of `previous.cfg`
//! - [`watcher`] - Debounced, single-flight file watcher that re-reads the
//!   configuration on external changes and hands it to a callback

pub mod config;
pub mod watcher;

// Re-export main types for convenience
pub use config::{ConfigSection, EmulatorConfig};
pub use watcher::{ConfigCallback, ConfigFileWatcher};
