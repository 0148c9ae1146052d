//! Origin-wide storage shared by several browsing contexts
//!
//! Models `localStorage`: one map per origin, last write wins per key, and a
//! change notification delivered to every context except the writer.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use handoff_core::{KeyValueStore, StorageChange};
use handoff_domain::Result;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Buffered notifications per context before a slow reader lags.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Storage shared by all contexts of one origin
#[derive(Default)]
pub struct SharedStorage {
    entries: RwLock<HashMap<String, String>>,
    contexts: Mutex<HashMap<u64, broadcast::Sender<StorageChange>>>,
    next_context: AtomicU64,
}

impl SharedStorage {
    /// Empty storage with no attached contexts.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Attach a new browsing context.
    ///
    /// The context stops receiving notifications once dropped.
    pub fn context(self: &Arc<Self>) -> Arc<StorageContext> {
        let id = self.next_context.fetch_add(1, Ordering::Relaxed);
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        self.contexts.lock().insert(id, sender.clone());
        debug!(context = id, "Storage context attached");
        Arc::new(StorageContext { storage: Arc::clone(self), id, sender })
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// `true` when no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of every entry, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Number of attached contexts.
    pub fn context_count(&self) -> usize {
        self.contexts.lock().len()
    }

    fn broadcast(&self, origin: u64, change: StorageChange) {
        let contexts = self.contexts.lock();
        for (id, sender) in contexts.iter().filter(|(id, _)| **id != origin) {
            // No receivers is fine; nobody in that context is listening yet.
            if sender.send(change.clone()).is_err() {
                trace!(context = *id, key = %change.key, "No listeners for change");
            }
        }
    }

    fn detach(&self, id: u64) {
        self.contexts.lock().remove(&id);
        debug!(context = id, "Storage context detached");
    }
}

/// One browsing context's view of a [`SharedStorage`]
pub struct StorageContext {
    storage: Arc<SharedStorage>,
    id: u64,
    sender: broadcast::Sender<StorageChange>,
}

impl StorageContext {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn storage(&self) -> &Arc<SharedStorage> {
        &self.storage
    }
}

impl KeyValueStore for StorageContext {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.storage.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let old_value = self.storage.entries.write().insert(key.to_string(), value.to_string());

        // Browsers do not fire a storage event when the value is unchanged.
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }

        trace!(context = self.id, key, "Storage entry set");
        self.storage.broadcast(
            self.id,
            StorageChange { key: key.to_string(), old_value, new_value: Some(value.to_string()) },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let old_value = self.storage.entries.write().remove(key);
        if old_value.is_some() {
            trace!(context = self.id, key, "Storage entry removed");
            self.storage
                .broadcast(self.id, StorageChange { key: key.to_string(), old_value, new_value: None });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.sender.subscribe()
    }
}

impl Drop for StorageContext {
    fn drop(&mut self) {
        self.storage.detach(self.id);
    }
}
