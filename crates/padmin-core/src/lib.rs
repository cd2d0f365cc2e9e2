//! # padmin-core
//!
//! Core types and utilities shared by the Previous Admin updater and watcher:
//!
//! - [`PadminError`] - Closed error taxonomy for all operations
//! - [`logging`] - Tracing setup (JSON file + console layers)
//! - [`paths`] - Well-known locations under `~/.previous-admin`
//! - [`util::best_effort`] - Fire-and-forget wrapper for non-fatal side effects

pub mod error;
pub mod logging;
pub mod paths;
pub mod util;

// Re-export main types for convenience
pub use error::{PadminError, Result};
pub use logging::{LogGuard, init_logging};
pub use util::best_effort;
