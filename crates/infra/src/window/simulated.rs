//! Headless browser window
//!
//! Keeps the location, navigation history, unload hooks and child popups of a
//! window in memory. Popups are windows themselves, so a landing handler can
//! run against the popup's own [`SimulatedWindow`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use handoff_core::{BrowserWindow, PopupHandle, UnloadHook, UnloadHookId};
use handoff_domain::Result;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

type SharedHook = Arc<dyn Fn() + Send + Sync>;

/// In-memory browser window
pub struct SimulatedWindow {
    href: Mutex<String>,
    history: Mutex<Vec<String>>,
    popups_blocked: AtomicBool,
    closed: AtomicBool,
    hooks: Mutex<BTreeMap<u64, SharedHook>>,
    next_hook: AtomicU64,
    popup_sender: Mutex<Option<mpsc::UnboundedSender<Arc<SimulatedPopup>>>>,
}

impl SimulatedWindow {
    /// Window showing `href`.
    pub fn new(href: impl Into<String>) -> Arc<Self> {
        let href = href.into();
        Arc::new(Self {
            history: Mutex::new(vec![href.clone()]),
            href: Mutex::new(href),
            popups_blocked: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            hooks: Mutex::new(BTreeMap::new()),
            next_hook: AtomicU64::new(0),
            popup_sender: Mutex::new(None),
        })
    }

    /// Make `open_popup` behave like a popup blocker.
    pub fn set_popups_blocked(&self, blocked: bool) {
        self.popups_blocked.store(blocked, Ordering::SeqCst);
    }

    /// Every location this window has shown, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn unload_hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Receive every popup opened from now on.
    ///
    /// Replaces any earlier receiver.
    pub fn watch_popups(&self) -> mpsc::UnboundedReceiver<Arc<SimulatedPopup>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.popup_sender.lock() = Some(sender);
        receiver
    }

    /// Run the unload hooks as if the page were being torn down.
    pub fn unload(&self) {
        let hooks: Vec<SharedHook> = self.hooks.lock().values().cloned().collect();
        debug!(count = hooks.len(), "Running unload hooks");
        for hook in hooks {
            hook();
        }
    }
}

impl BrowserWindow for SimulatedWindow {
    fn location_hash(&self) -> String {
        let href = self.href.lock();
        match Url::parse(&href) {
            Ok(url) => url.fragment().map(|f| format!("#{f}")).unwrap_or_default(),
            Err(_) => href.find('#').map(|at| href[at..].to_string()).unwrap_or_default(),
        }
    }

    fn location_href(&self) -> String {
        self.href.lock().clone()
    }

    fn navigate(&self, url: &str) {
        info!(url, "Navigating window");
        *self.href.lock() = url.to_string();
        self.history.lock().push(url.to_string());
    }

    fn open_popup(&self, url: &str, features: &str) -> Result<Option<Arc<dyn PopupHandle>>> {
        if self.popups_blocked.load(Ordering::SeqCst) {
            info!("Popup blocked");
            return Ok(None);
        }

        debug!(features, "Opening popup");
        let popup = Arc::new(SimulatedPopup { window: SimulatedWindow::new(url) });

        let mut sender = self.popup_sender.lock();
        if let Some(tx) = sender.as_ref() {
            if tx.send(Arc::clone(&popup)).is_err() {
                *sender = None;
            }
        }

        let handle: Arc<dyn PopupHandle> = popup;
        Ok(Some(handle))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.unload();
        info!("Window closed");
    }

    fn add_unload_hook(&self, hook: UnloadHook) -> UnloadHookId {
        let id = self.next_hook.fetch_add(1, Ordering::Relaxed);
        self.hooks.lock().insert(id, Arc::from(hook));
        UnloadHookId(id)
    }

    fn remove_unload_hook(&self, id: UnloadHookId) {
        self.hooks.lock().remove(&id.0);
    }
}

/// A popup opened by a [`SimulatedWindow`]
pub struct SimulatedPopup {
    window: Arc<SimulatedWindow>,
}

impl SimulatedPopup {
    /// The popup's own window, for running code inside it.
    pub fn window(&self) -> Arc<SimulatedWindow> {
        Arc::clone(&self.window)
    }

    pub fn url(&self) -> String {
        self.window.location_href()
    }
}

impl PopupHandle for SimulatedPopup {
    fn is_closed(&self) -> bool {
        self.window.is_closed()
    }

    fn close(&self) {
        BrowserWindow::close(self.window.as_ref());
    }
}
