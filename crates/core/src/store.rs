//! Auth data persistence
//!
//! Faithful cache of the last [`AuthData`] handed to it, kept under one
//! configured key of the shared store. Corrupted entries read as empty.

use std::sync::Arc;

use handoff_domain::{AuthData, AuthError, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::ports::KeyValueStore;

/// Reads and writes the current token record
pub struct AuthDataStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    persist: bool,
    memory: Mutex<Option<AuthData>>,
}

impl AuthDataStore {
    /// Store backed by `kv` under `key`.
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { kv, key: key.into(), persist: true, memory: Mutex::new(None) }
    }

    /// When `persist` is false the record lives in memory only and the
    /// key-value store is never touched.
    #[must_use]
    pub fn with_persistence(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Storage key of the record.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current record, or an empty one when nothing usable is stored.
    pub fn read(&self) -> AuthData {
        if !self.persist {
            return self.memory.lock().clone().unwrap_or_default();
        }

        let raw = match self.kv.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return AuthData::default(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "Failed to read auth data");
                return AuthData::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(key = %self.key, error = %err, "Stored auth data is not valid JSON, ignoring");
            AuthData::default()
        })
    }

    /// Replace the record. `None` removes it.
    pub fn write(&self, data: Option<&AuthData>) -> Result<()> {
        let Some(data) = data else {
            return self.clear();
        };

        debug!(key = %self.key, has_token = data.has_token(), "Writing auth data");
        if !self.persist {
            *self.memory.lock() = Some(data.clone());
            return Ok(());
        }

        let raw = serde_json::to_string(data)
            .map_err(|e| AuthError::Internal(format!("failed to encode auth data: {e}")))?;
        self.kv.set(&self.key, &raw)
    }

    /// Drop the record.
    pub fn clear(&self) -> Result<()> {
        debug!(key = %self.key, "Deleting auth data");
        if !self.persist {
            *self.memory.lock() = None;
            return Ok(());
        }
        self.kv.remove(&self.key)
    }
}
