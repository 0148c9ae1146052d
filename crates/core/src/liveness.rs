//! Popup liveness watchers
//!
//! A watcher decides when an open login popup should be given up on. It only
//! resolves when the attempt must fail; dropping the watch future cancels it
//! and releases everything it installed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use handoff_domain::{FailureKind, LivenessStrategy};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::ports::{BrowserWindow, PopupHandle, UnloadHookGuard};

/// Detects an abandoned or unresponsive popup
#[async_trait]
pub trait LivenessWatcher: Send + Sync {
    /// Resolves with the failure kind once the attempt must be abandoned.
    async fn watch(&self, window: Arc<dyn BrowserWindow>, popup: Arc<dyn PopupHandle>)
        -> FailureKind;
}

/// Checks on a fixed interval whether the popup was closed
///
/// While watching, an unload hook on the opener closes the popup so it does
/// not outlive the page that opened it.
#[derive(Debug, Clone, Copy)]
pub struct PollingWatcher {
    interval: Duration,
}

impl PollingWatcher {
    /// Zero intervals are raised to one millisecond.
    pub fn new(interval: Duration) -> Self {
        Self { interval: interval.max(Duration::from_millis(1)) }
    }
}

#[async_trait]
impl LivenessWatcher for PollingWatcher {
    async fn watch(
        &self,
        window: Arc<dyn BrowserWindow>,
        popup: Arc<dyn PopupHandle>,
    ) -> FailureKind {
        let on_unload = Arc::clone(&popup);
        let _guard = UnloadHookGuard::install(window, Box::new(move || on_unload.close()));

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if popup.is_closed() {
                debug!("Login popup was closed");
                return FailureKind::Closed;
            }
        }
    }
}

/// Gives up after a single timer, without looking at the popup
#[derive(Debug, Clone, Copy)]
pub struct TimeoutWatcher {
    timeout: Duration,
}

impl TimeoutWatcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LivenessWatcher for TimeoutWatcher {
    async fn watch(
        &self,
        _window: Arc<dyn BrowserWindow>,
        _popup: Arc<dyn PopupHandle>,
    ) -> FailureKind {
        tokio::time::sleep(self.timeout).await;
        debug!(timeout = ?self.timeout, "Login popup timed out");
        FailureKind::Timeout
    }
}

/// Build the watcher selected by `strategy`.
pub fn watcher_for(strategy: LivenessStrategy) -> Arc<dyn LivenessWatcher> {
    match strategy {
        LivenessStrategy::Poll { interval_ms } => {
            Arc::new(PollingWatcher::new(Duration::from_millis(interval_ms)))
        }
        LivenessStrategy::Timeout { timeout_ms } => {
            Arc::new(TimeoutWatcher::new(Duration::from_millis(timeout_ms)))
        }
    }
}
