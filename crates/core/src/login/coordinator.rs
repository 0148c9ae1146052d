//! Login coordinator
//!
//! State machine driving one client's implicit grant login:
//!
//! ```text
//! Idle -> CheckingExisting -> Authenticated
//!                          -> Redirecting
//!                          -> AwaitingPopup -> Authenticated | Failed
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use handoff_domain::constants::{
    AUTHORIZE_PATH, LOGOUT_PATH, POPUP_WINDOW_FEATURES, TOPIC_KEY_PREFIX,
};
use handoff_domain::{
    parse_env, AttemptMetadata, AuthData, AuthError, AuthRequestParams, AuthenticatorConfig,
    DeliveryChannel, Environment, LivenessStrategy, LoginOptions, LoginState, PubSubEvent, Result,
};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::authorize_url::build_auth_url;
use crate::fragment::parse_fragment;
use crate::liveness::{watcher_for, LivenessWatcher, TimeoutWatcher};
use crate::messenger::{Messenger, Subscription};
use crate::ports::{BrowserWindow, KeyValueStore, PopupHandle, TokenValidator};
use crate::store::AuthDataStore;

/// Implicit grant authenticator for one client id
pub struct Authenticator {
    client_id: String,
    config: AuthenticatorConfig,
    environment: Environment,
    store: AuthDataStore,
    kv: Arc<dyn KeyValueStore>,
    window: Arc<dyn BrowserWindow>,
    validator: Arc<dyn TokenValidator>,
    liveness: Arc<dyn LivenessWatcher>,
    auth_data: RwLock<Option<AuthData>>,
    state: RwLock<LoginState>,
}

impl Authenticator {
    /// Create an authenticator. The liveness watcher is chosen from
    /// `config.liveness`.
    pub fn new(
        client_id: impl Into<String>,
        config: AuthenticatorConfig,
        kv: Arc<dyn KeyValueStore>,
        window: Arc<dyn BrowserWindow>,
        validator: Arc<dyn TokenValidator>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        if client_id.trim().is_empty() {
            return Err(AuthError::Config("client_id must not be empty".into()));
        }

        let environment = parse_env(&config.environment);
        let store = AuthDataStore::new(Arc::clone(&kv), config.storage_key.clone())
            .with_persistence(config.persist);
        let liveness = watcher_for(config.liveness);

        debug!(
            client_id = %client_id,
            environment = %environment.domain,
            liveness = config.liveness.mode(),
            persist = config.persist,
            "Authenticator created"
        );

        Ok(Self {
            client_id,
            config,
            environment,
            store,
            kv,
            window,
            validator,
            liveness,
            auth_data: RwLock::new(None),
            state: RwLock::new(LoginState::Idle),
        })
    }

    /// Replace the liveness watcher selected from configuration.
    #[must_use]
    pub fn with_liveness_watcher(mut self, watcher: Arc<dyn LivenessWatcher>) -> Self {
        self.liveness = watcher;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Current in-memory auth data.
    pub fn auth_data(&self) -> Option<AuthData> {
        self.auth_data.read().clone()
    }

    pub fn state(&self) -> LoginState {
        *self.state.read()
    }

    /// Run the implicit grant login.
    ///
    /// `existing` takes the place of the current window's fragment as the
    /// incoming candidate. Resolves with validated auth data, or fails with
    /// [`AuthError::RoutingToLogin`] once the window has been sent to the
    /// login page.
    pub async fn login_implicit_grant(
        &self,
        options: LoginOptions,
        existing: Option<AuthData>,
    ) -> Result<AuthData> {
        let (org, provider) = self.resolve_org_provider(&options)?;
        let redirect_uri = non_empty(options.redirect_uri.as_deref());
        if !options.use_popup_auth && redirect_uri.is_none() {
            return Err(AuthError::Config(
                "redirect_uri must be provided for implicit grant authentication".into(),
            ));
        }

        self.set_state(LoginState::CheckingExisting);

        let incoming = existing.unwrap_or_else(|| parse_fragment(&self.window.location_hash()));
        let mut stored = self.store.read();
        if stored.is_expired_at(Utc::now()) {
            info!(key = %self.store.key(), "Stored token has expired, clearing it");
            self.store.clear()?;
            stored = AuthData::default();
        }

        match self.validate_auth_data(&incoming, &stored).await {
            Some(data) if data.has_error() => {
                self.write_auth_data(None)?;
                self.set_state(LoginState::Failed);
                return Err(data.as_error().unwrap_or_else(|| AuthError::oauth("unknown", None)));
            }
            Some(data) => {
                self.write_auth_data(Some(&data))?;
                self.set_state(LoginState::Authenticated);
                return Ok(data);
            }
            None => self.write_auth_data(None)?,
        }

        let mut params = AuthRequestParams::implicit(self.client_id.clone());
        params.redirect_uri = redirect_uri.map(str::to_string);
        params.state = options.state.clone().filter(has_app_state);
        params.org = org;
        params.provider = provider;

        if options.use_popup_auth {
            self.login_with_popup(params, &options).await
        } else {
            Err(self.redirect_to_login(&params))
        }
    }

    /// Clear persisted auth data and send the window to the logout page.
    ///
    /// The token is not revoked server-side.
    pub fn logout(&self, redirect_uri: Option<&str>) -> Result<String> {
        self.clear_auth_data()?;

        let url = build_auth_url(
            &self.environment.auth_base,
            LOGOUT_PATH,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri.unwrap_or_default()),
            ],
        );
        info!(url = %url, "Logging out");
        self.set_state(LoginState::Redirecting);
        self.window.navigate(&url);
        Ok(url)
    }

    /// Clear persisted auth data without logging out.
    pub fn clear_auth_data(&self) -> Result<()> {
        self.write_auth_data(None)?;
        self.set_state(LoginState::Idle);
        Ok(())
    }

    /// Use `token` as the current auth data.
    pub fn set_access_token(&self, token: &str) -> Result<()> {
        self.write_auth_data(Some(&AuthData::with_token(token)))
    }

    /// Check `token` against the validation endpoint.
    pub async fn test_access_token(&self, token: &str) -> Result<()> {
        self.validator.validate(token).await
    }

    /// Authorization URL for `params` on this environment's login host.
    pub fn build_authorize_url(&self, params: &AuthRequestParams) -> String {
        let pairs = params.query_pairs();
        let pairs: Vec<(&str, &str)> =
            pairs.iter().map(|(key, value)| (*key, value.as_ref())).collect();
        build_auth_url(&self.environment.auth_base, AUTHORIZE_PATH, &pairs)
    }

    /// Pick the auth data to adopt from the incoming and stored candidates.
    ///
    /// An error record is adopted as-is. Once any candidate's token validates
    /// the incoming record wins, unless it carries nothing at all.
    async fn validate_auth_data(&self, incoming: &AuthData, stored: &AuthData) -> Option<AuthData> {
        for (source, candidate) in [("incoming", incoming), ("storage", stored)] {
            if candidate.has_error() {
                debug!(source, "Candidate auth data carries an error");
                return Some(candidate.clone());
            }

            let Some(token) = non_empty(candidate.access_token.as_deref()) else {
                continue;
            };

            match self.validator.validate(token).await {
                Ok(()) => {
                    debug!(source, "Candidate token is valid");
                    let adopted = if incoming.is_empty() { candidate } else { incoming };
                    return Some(adopted.clone());
                }
                Err(err) => {
                    debug!(source, error_label = err.label(), "Candidate token failed validation");
                }
            }
        }
        None
    }

    fn redirect_to_login(&self, params: &AuthRequestParams) -> AuthError {
        let url = self.build_authorize_url(params);
        info!(url = %url, "Implicit grant: redirecting to login");
        self.set_state(LoginState::Redirecting);
        self.window.navigate(&url);
        AuthError::RoutingToLogin(url)
    }

    async fn login_with_popup(
        &self,
        params: AuthRequestParams,
        options: &LoginOptions,
    ) -> Result<AuthData> {
        let topic = format!("{TOPIC_KEY_PREFIX}{}", Uuid::new_v4());
        let metadata = AttemptMetadata::new(params.clone(), self.config.storage_key.clone())
            .with_debug(self.config.debug_mode)
            .with_delivery(DeliveryChannel::Messenger);
        let raw = serde_json::to_string(&metadata)
            .map_err(|e| AuthError::Internal(format!("failed to encode attempt metadata: {e}")))?;
        self.kv.set(&topic, &raw)?;

        let mut query = params;
        query.state = Some(Value::String(topic.clone()));
        let url = self.build_authorize_url(&query);

        let messenger = Messenger::open(topic.clone(), Arc::clone(&self.kv));
        let mut subscription = messenger.subscribe();
        let mut attempt = PopupAttempt { owner: self, messenger, popup: None, settled: false };

        let popup = match self.window.open_popup(&url, POPUP_WINDOW_FEATURES) {
            Ok(Some(popup)) => popup,
            Ok(None) => {
                warn!(topic = %topic, "Login popup was blocked");
                attempt.settle();
                self.set_state(LoginState::Failed);
                return Err(AuthError::PopupBlocked);
            }
            Err(err) => {
                attempt.settle();
                self.set_state(LoginState::Failed);
                return Err(err);
            }
        };
        attempt.popup = Some(Arc::clone(&popup));

        info!(topic = %topic, url = %url, "Awaiting popup login");
        self.set_state(LoginState::AwaitingPopup);

        let outcome = self
            .await_popup_outcome(&attempt.messenger, &mut subscription, popup, options)
            .await;
        attempt.settle();

        match outcome {
            Ok(data) => {
                self.write_auth_data(Some(&data))?;
                self.set_state(LoginState::Authenticated);
                info!(topic = %topic, "Popup login complete");
                Ok(data)
            }
            Err(err) => {
                warn!(topic = %topic, error_label = err.label(), error = %err, "Popup login failed");
                self.set_state(LoginState::Failed);
                Err(err)
            }
        }
    }

    /// Race the first terminal event against the liveness watcher.
    async fn await_popup_outcome(
        &self,
        messenger: &Messenger,
        subscription: &mut Subscription,
        popup: Arc<dyn PopupHandle>,
        options: &LoginOptions,
    ) -> Result<AuthData> {
        let watcher = self.watcher_for_attempt(options);

        let settled = tokio::select! {
            biased;
            event = subscription.next_terminal() => Ok(event),
            kind = watcher.watch(Arc::clone(&self.window), popup) => Err(kind),
        };

        let event = match settled {
            Ok(event) => event,
            Err(kind) => {
                // An event the other side wrote before liveness failed still wins.
                messenger.flush().await;
                match subscription.try_next_terminal() {
                    Some(event) => Some(event),
                    None => return Err(AuthError::from_failure(kind, kind.to_string())),
                }
            }
        };

        match event {
            Some(PubSubEvent::Complete(body)) => Ok(body.auth_data),
            Some(PubSubEvent::Failure(body)) => Err(AuthError::from_failure(body.kind, body.error)),
            Some(PubSubEvent::InProgress(_)) | None => {
                Err(AuthError::Internal("messenger closed before a terminal event".into()))
            }
        }
    }

    fn watcher_for_attempt(&self, options: &LoginOptions) -> Arc<dyn LivenessWatcher> {
        match (self.config.liveness, options.popup_timeout_ms) {
            (LivenessStrategy::Timeout { .. }, Some(timeout_ms)) => {
                Arc::new(TimeoutWatcher::new(Duration::from_millis(timeout_ms)))
            }
            _ => Arc::clone(&self.liveness),
        }
    }

    fn resolve_org_provider(
        &self,
        options: &LoginOptions,
    ) -> Result<(Option<String>, Option<String>)> {
        let org = non_empty(options.org.as_deref()).or_else(|| non_empty(Some(&self.config.org)));
        let provider = non_empty(options.provider.as_deref())
            .or_else(|| non_empty(Some(&self.config.provider)));

        match (org, provider) {
            (Some(_), None) => {
                Err(AuthError::Config("options.provider must be set if options.org is set".into()))
            }
            (None, Some(_)) => {
                Err(AuthError::Config("options.org must be set if options.provider is set".into()))
            }
            (org, provider) => Ok((org.map(str::to_string), provider.map(str::to_string))),
        }
    }

    fn write_auth_data(&self, data: Option<&AuthData>) -> Result<()> {
        self.store.write(data)?;
        *self.auth_data.write() = data.cloned();
        Ok(())
    }

    fn set_state(&self, next: LoginState) {
        let mut state = self.state.write();
        if *state != next {
            debug!(client_id = %self.client_id, from = %*state, to = %next, "Login state changed");
            *state = next;
        }
    }
}

/// One in-flight popup attempt
///
/// Dropping it closes the popup and the topic. An attempt dropped before
/// [`PopupAttempt::settle`] was cancelled with its future and leaves the
/// coordinator `Failed`.
struct PopupAttempt<'a> {
    owner: &'a Authenticator,
    messenger: Messenger,
    popup: Option<Arc<dyn PopupHandle>>,
    settled: bool,
}

impl PopupAttempt<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PopupAttempt<'_> {
    fn drop(&mut self) {
        if let Some(popup) = self.popup.take() {
            if !popup.is_closed() {
                popup.close();
            }
        }
        self.messenger.close();

        if !self.settled {
            warn!(topic = %self.messenger.key(), "Popup login cancelled");
            self.owner.set_state(LoginState::Failed);
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn has_app_state(state: &Value) -> bool {
    match state {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}
