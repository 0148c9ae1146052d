//! Authenticator cache keyed by client id
//!
//! Owned by the application's composition root. The first configuration
//! registered for a client id wins; later lookups return the same instance.

use std::collections::HashMap;
use std::sync::Arc;

use handoff_domain::Result;
use parking_lot::Mutex;
use tracing::debug;

use super::coordinator::Authenticator;

/// Authenticators shared by client id
#[derive(Default)]
pub struct AuthenticatorRegistry {
    authenticators: Mutex<HashMap<String, Arc<Authenticator>>>,
}

impl AuthenticatorRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the authenticator for `client_id`, building it with `build`
    /// only when none is registered yet.
    pub fn get_or_insert_with<F>(&self, client_id: &str, build: F) -> Result<Arc<Authenticator>>
    where
        F: FnOnce() -> Result<Authenticator>,
    {
        let mut authenticators = self.authenticators.lock();
        if let Some(existing) = authenticators.get(client_id) {
            debug!(client_id, "Reusing registered authenticator");
            return Ok(Arc::clone(existing));
        }

        let authenticator = Arc::new(build()?);
        authenticators.insert(client_id.to_string(), Arc::clone(&authenticator));
        debug!(client_id, "Registered authenticator");
        Ok(authenticator)
    }

    /// Registered authenticator for `client_id`.
    pub fn get(&self, client_id: &str) -> Option<Arc<Authenticator>> {
        self.authenticators.lock().get(client_id).cloned()
    }

    /// Forget `client_id`, returning its authenticator.
    pub fn remove(&self, client_id: &str) -> Option<Arc<Authenticator>> {
        self.authenticators.lock().remove(client_id)
    }

    /// Number of registered client ids.
    pub fn len(&self) -> usize {
        self.authenticators.lock().len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.authenticators.lock().is_empty()
    }
}
