//! Port interfaces for the cross-window coordinator
//!
//! These traits define the boundaries between core logic and the platform:
//! the shared key-value store, the token validation endpoint and the browser
//! window that navigates, opens popups and unloads.

use std::sync::Arc;

use async_trait::async_trait;
use handoff_domain::Result;
use tokio::sync::broadcast;

/// A change made to the shared store by another context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
}

/// Key-value store shared by every same-origin context
///
/// Writes are last-write-wins per key. Change notifications are only
/// delivered for writes made by *other* contexts, never for our own.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Subscribe to changes made by other contexts.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Checks whether an access token is accepted by the API
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// `Ok(())` when the token is usable. Any failure means unusable.
    async fn validate(&self, token: &str) -> Result<()>;
}

/// Callback run when the window is being torn down
pub type UnloadHook = Box<dyn Fn() + Send + Sync>;

/// Handle used to remove a registered [`UnloadHook`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnloadHookId(pub u64);

/// A popup window opened by this context
pub trait PopupHandle: Send + Sync {
    fn is_closed(&self) -> bool;

    fn close(&self);
}

/// The browser window this context runs in
pub trait BrowserWindow: Send + Sync {
    /// Current fragment, including the leading `#` if present.
    fn location_hash(&self) -> String;

    fn location_href(&self) -> String;

    /// Replace the current location. Navigation is destructive: the caller
    /// should treat the current context as finished.
    fn navigate(&self, url: &str);

    /// Open `url` in a new window. `Ok(None)` means the browser blocked it.
    fn open_popup(&self, url: &str, features: &str) -> Result<Option<Arc<dyn PopupHandle>>>;

    /// Close this window.
    fn close(&self);

    fn add_unload_hook(&self, hook: UnloadHook) -> UnloadHookId;

    fn remove_unload_hook(&self, id: UnloadHookId);
}

/// Removes an unload hook when dropped
pub struct UnloadHookGuard {
    window: Arc<dyn BrowserWindow>,
    id: UnloadHookId,
}

impl UnloadHookGuard {
    /// Register `hook` on `window` for the lifetime of the guard.
    pub fn install(window: Arc<dyn BrowserWindow>, hook: UnloadHook) -> Self {
        let id = window.add_unload_hook(hook);
        Self { window, id }
    }
}

impl Drop for UnloadHookGuard {
    fn drop(&mut self) {
        self.window.remove_unload_hook(self.id);
    }
}
