//! Redirect landing handler
//!
//! Runs in the context that received the OAuth response, usually the login
//! popup. It finds the originating attempt through the returned `state`,
//! hands the token back to the opener and closes the window.

use std::sync::Arc;

use handoff_domain::{AttemptMetadata, AuthData, AuthError, DeliveryChannel, PubSubEvent, Result};
use tracing::{debug, info};

use crate::fragment::parse_fragment;
use crate::messenger::Messenger;
use crate::ports::{BrowserWindow, KeyValueStore};
use crate::store::AuthDataStore;

/// Delivers a redirect response to the attempt that started it
pub struct LandingHandler {
    kv: Arc<dyn KeyValueStore>,
    window: Arc<dyn BrowserWindow>,
}

impl LandingHandler {
    /// Handler for the context owning `kv` and `window`.
    pub fn new(kv: Arc<dyn KeyValueStore>, window: Arc<dyn BrowserWindow>) -> Self {
        Self { kv, window }
    }

    /// Deliver the token in the current fragment to its attempt.
    ///
    /// Returns the delivered auth data, with `state` replaced by the
    /// application state recorded for the attempt.
    pub async fn handle(&self) -> Result<AuthData> {
        let mut auth_data = parse_fragment(&self.window.location_hash());

        if let Some(err) = auth_data.as_error() {
            return Err(err);
        }
        if !auth_data.has_token() {
            return Err(AuthError::MissingAccessToken);
        }
        let topic = auth_data
            .state_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(AuthError::MissingState)?;

        let metadata = self.read_metadata(&topic)?;
        auth_data.state = metadata.app_state().cloned();

        match metadata.delivery {
            DeliveryChannel::Messenger => {
                let href = self.window.location_href();
                let messenger = Messenger::open(topic.clone(), Arc::clone(&self.kv));
                messenger.publish(&PubSubEvent::in_progress(Some(href.clone())))?;
                messenger.publish(&PubSubEvent::complete(auth_data.clone(), Some(href)))?;
                if !metadata.debug {
                    messenger.close();
                }
            }
            DeliveryChannel::Storage => {
                debug!(key = %metadata.storage_key, "Writing auth data for the opener");
                AuthDataStore::new(Arc::clone(&self.kv), metadata.storage_key.clone())
                    .write(Some(&auth_data))?;
                if !metadata.debug {
                    self.kv.remove(&topic)?;
                }
            }
        }

        if metadata.debug {
            info!(topic = %topic, "Debug mode, leaving window and attempt entry in place");
        } else {
            debug!(topic = %topic, "Closing landing window");
            self.window.close();
        }

        Ok(auth_data)
    }

    fn read_metadata(&self, topic: &str) -> Result<AttemptMetadata> {
        let raw = self
            .kv
            .get(topic)?
            .ok_or_else(|| AuthError::AttemptMetadata(format!("no entry for {topic}")))?;
        let metadata: AttemptMetadata =
            serde_json::from_str(&raw).map_err(|e| AuthError::AttemptMetadata(e.to_string()))?;

        if metadata.storage_key.is_empty() {
            return Err(AuthError::AttemptMetadata(format!("entry for {topic} has no storageKey")));
        }
        Ok(metadata)
    }
}
