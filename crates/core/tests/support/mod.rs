//! Shared test helpers for `handoff-core` integration tests.
//!
//! Lightweight in-memory doubles for the ports: a shared store with
//! per-context change notifications, a scripted browser window and a token
//! validator backed by an allow-list.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use handoff_core::{
    BrowserWindow, KeyValueStore, PopupHandle, StorageChange, TokenValidator, UnloadHook,
    UnloadHookId,
};
use handoff_domain::{AuthError, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Upper bound for any await in a test.
pub const TEST_DEADLINE: Duration = Duration::from_secs(2);

/* -------------------------------------------------------------------------- */
/* Shared storage */
/* -------------------------------------------------------------------------- */

#[derive(Default)]
pub struct SharedMemory {
    data: Mutex<HashMap<String, String>>,
    contexts: Mutex<Vec<(u64, broadcast::Sender<StorageChange>)>>,
    next_context: AtomicU64,
}

impl SharedMemory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A store handle for one browsing context.
    pub fn context(self: &Arc<Self>) -> Arc<ContextStore> {
        let id = self.next_context.fetch_add(1, Ordering::SeqCst);
        let (tx, _) = broadcast::channel(64);
        self.contexts.lock().push((id, tx.clone()));
        Arc::new(ContextStore { shared: Arc::clone(self), id, tx })
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.data.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.lock().keys().cloned().collect()
    }

    fn notify(&self, origin: u64, change: &StorageChange) {
        for (id, tx) in self.contexts.lock().iter() {
            if *id != origin {
                let _ = tx.send(change.clone());
            }
        }
    }
}

pub struct ContextStore {
    shared: Arc<SharedMemory>,
    id: u64,
    tx: broadcast::Sender<StorageChange>,
}

impl KeyValueStore for ContextStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.shared.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let old_value = self.shared.data.lock().insert(key.to_string(), value.to_string());
        self.shared.notify(
            self.id,
            &StorageChange { key: key.to_string(), old_value, new_value: Some(value.to_string()) },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let old_value = self.shared.data.lock().remove(key);
        if old_value.is_some() {
            self.shared
                .notify(self.id, &StorageChange { key: key.to_string(), old_value, new_value: None });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.tx.subscribe()
    }
}

/* -------------------------------------------------------------------------- */
/* Windows */
/* -------------------------------------------------------------------------- */

#[derive(Default)]
pub struct FakePopup {
    closed: AtomicBool,
}

impl PopupHandle for FakePopup {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

type OpenHook = Box<dyn FnOnce(String, Arc<FakePopup>) + Send>;

#[derive(Default)]
pub struct FakeWindow {
    href: Mutex<String>,
    navigations: Mutex<Vec<String>>,
    popups: Mutex<Vec<(String, Arc<FakePopup>)>>,
    block_popups: AtomicBool,
    closed: AtomicBool,
    hooks: Mutex<HashMap<u64, UnloadHook>>,
    next_hook: AtomicU64,
    on_open: Mutex<Option<OpenHook>>,
}

impl FakeWindow {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn at(href: &str) -> Arc<Self> {
        let window = Self::default();
        *window.href.lock() = href.to_string();
        Arc::new(window)
    }

    pub fn blocking_popups() -> Arc<Self> {
        let window = Self::default();
        window.block_popups.store(true, Ordering::SeqCst);
        Arc::new(window)
    }

    /// Run `hook` with the popup URL and handle when the next popup opens.
    pub fn on_popup_open(&self, hook: impl FnOnce(String, Arc<FakePopup>) + Send + 'static) {
        *self.on_open.lock() = Some(Box::new(hook));
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }

    pub fn popups(&self) -> Vec<(String, Arc<FakePopup>)> {
        self.popups.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Simulate the page being torn down.
    pub fn unload(&self) {
        for hook in self.hooks.lock().values() {
            hook();
        }
    }
}

impl BrowserWindow for FakeWindow {
    fn location_hash(&self) -> String {
        let href = self.href.lock();
        href.find('#').map(|at| href[at..].to_string()).unwrap_or_default()
    }

    fn location_href(&self) -> String {
        self.href.lock().clone()
    }

    fn navigate(&self, url: &str) {
        self.navigations.lock().push(url.to_string());
    }

    fn open_popup(&self, url: &str, _features: &str) -> Result<Option<Arc<dyn PopupHandle>>> {
        if self.block_popups.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let popup = Arc::new(FakePopup::default());
        self.popups.lock().push((url.to_string(), Arc::clone(&popup)));
        if let Some(hook) = self.on_open.lock().take() {
            hook(url.to_string(), Arc::clone(&popup));
        }
        let handle: Arc<dyn PopupHandle> = popup;
        Ok(Some(handle))
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn add_unload_hook(&self, hook: UnloadHook) -> UnloadHookId {
        let id = self.next_hook.fetch_add(1, Ordering::SeqCst);
        self.hooks.lock().insert(id, hook);
        UnloadHookId(id)
    }

    fn remove_unload_hook(&self, id: UnloadHookId) {
        self.hooks.lock().remove(&id.0);
    }
}

/* -------------------------------------------------------------------------- */
/* Validation */
/* -------------------------------------------------------------------------- */

#[derive(Default)]
pub struct AllowListValidator {
    valid: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl AllowListValidator {
    pub fn accepting(tokens: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            valid: tokens.iter().map(|t| (*t).to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting_all() -> Arc<Self> {
        Self::accepting(&[])
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TokenValidator for AllowListValidator {
    async fn validate(&self, token: &str) -> Result<()> {
        self.calls.lock().push(token.to_string());
        if self.valid.contains(token) {
            Ok(())
        } else {
            Err(AuthError::Validation("401 Unauthorized".into()))
        }
    }
}

/// Value of query parameter `key` in `url`.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
