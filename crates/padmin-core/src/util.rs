//! Small shared helpers.

use crate::error::Result;

/// Run a fallible operation in fire-and-forget mode: the error is logged at
/// WARN level and never propagated.
///
/// Used for the pipeline's best-effort side effects (version file write,
/// service restart, temp cleanup) where failure must not abort an update.
pub fn best_effort<T>(what: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{what}: {e}");
            None
        }
    }
}
