//! Debounced watcher for the emulator configuration file.
//!
//! Observes one configuration file for external modification and invokes a
//! callback with the freshly parsed configuration. Two independent debounce
//! layers apply: the notify debouncer requires the file to stop changing for a
//! stability interval before signaling at all, and the handler re-arms only
//! after a cooldown once a re-read cycle finishes. A cycle already in flight
//! drops new notifications (single-flight; no queueing).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, Debouncer, RecommendedCache, new_debouncer};
use tracing::{debug, error, warn};

use padmin_core::{PadminError, Result};

use crate::config::EmulatorConfig;

/// How long the file size must stay stable before a change is signaled.
pub const DEFAULT_STABILITY_MS: u64 = 500;

/// Cooldown before the handler re-arms after processing a change. Prevents
/// thrashing on editors that perform multiple writes per save.
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

/// Callback invoked with each successfully re-read configuration.
pub type ConfigCallback = Arc<dyn Fn(EmulatorConfig) + Send + Sync>;

/// One armed watch: a file path bound to a callback and a debouncer handle.
/// Dropping it tears the underlying watch down.
struct WatchSession {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    path: PathBuf,
}

/// Watches a single configuration file and re-reads it on external changes.
///
/// `watch` replaces any existing session on this instance (idempotent
/// re-arming, not additive); `unwatch` is idempotent.
pub struct ConfigFileWatcher {
    session: Option<WatchSession>,
    stability: Duration,
    cooldown: Duration,
}

impl ConfigFileWatcher {
    pub fn new() -> Self {
        Self {
            session: None,
            stability: Duration::from_millis(DEFAULT_STABILITY_MS),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
        }
    }

    /// Set the stability threshold of the underlying debounce layer.
    pub fn with_stability(mut self, stability: Duration) -> Self {
        self.stability = stability;
        self
    }

    /// Set the handler re-arm cooldown.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Start watching `path`, replacing any prior session on this watcher.
    pub fn watch<F>(&mut self, path: &Path, callback: F) -> Result<()>
    where
        F: Fn(EmulatorConfig) + Send + Sync + 'static,
    {
        if self.session.is_some() {
            self.unwatch();
        }

        let callback: ConfigCallback = Arc::new(callback);
        let in_flight = Arc::new(AtomicBool::new(false));
        let watch_path = path.to_path_buf();
        let cooldown = self.cooldown;

        let mut debouncer = new_debouncer(
            self.stability,
            None, // Use default tick rate
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    if events.iter().any(|e| is_change(&e.event)) {
                        handle_change(&watch_path, &in_flight, &callback, cooldown);
                    }
                }
                Err(errors) => {
                    for e in errors {
                        error!("file watcher error: {e:?}");
                    }
                }
            },
        )
        .map_err(|e| PadminError::WatcherInit {
            message: format!("Failed to create debouncer: {e}"),
        })?;

        debouncer
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| PadminError::WatcherInit {
                message: format!("Failed to watch {}: {e}", path.display()),
            })?;

        debug!(path = %path.display(), "watching config file");
        self.session = Some(WatchSession {
            _debouncer: debouncer,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Tear down the underlying watch handle and clear the callback.
    /// Idempotent if already unwatched.
    pub fn unwatch(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(path = %session.path.display(), "stopped watching config file");
        }
    }

    pub fn is_watching(&self) -> bool {
        self.session.is_some()
    }

    /// Path of the active watch session, if any.
    pub fn watched_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }
}

impl Default for ConfigFileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConfigFileWatcher {
    fn drop(&mut self) {
        self.unwatch();
    }
}

fn is_change(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

/// Process one debounced change notification.
///
/// The in-flight flag stays set through the read, the callback, and the
/// cooldown, so overlapping notifications never trigger concurrent re-reads
/// for the same session.
fn handle_change(
    path: &Path,
    in_flight: &Arc<AtomicBool>,
    callback: &ConfigCallback,
    cooldown: Duration,
) {
    if in_flight.swap(true, Ordering::SeqCst) {
        debug!(path = %path.display(), "change dropped; reload already in flight");
        return;
    }

    match EmulatorConfig::load(path) {
        Ok(config) => callback(config),
        Err(e) => warn!("error reading config after file change: {e}"),
    }

    let flag = Arc::clone(in_flight);
    std::thread::spawn(move || {
        std::thread::sleep(cooldown);
        flag.store(false, Ordering::SeqCst);
    });
}
