//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ENVIRONMENT, DEFAULT_POPUP_POLL_INTERVAL_MS, DEFAULT_POPUP_TIMEOUT_MS,
    DEFAULT_STORAGE_KEY,
};
use crate::errors::{AuthError, Result};

/// Authenticator configuration
///
/// Every field has a default so partial JSON/TOML documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    /// Domain, optionally prefixed with a scheme or `api.`
    pub environment: String,
    /// Persist auth data to the key-value store. When false the record is
    /// kept in memory only.
    pub persist: bool,
    pub storage_key: String,
    pub debug_mode: bool,
    /// Default organization name, used together with `provider`.
    pub org: String,
    /// Default identity provider, used together with `org`.
    pub provider: String,
    pub liveness: LivenessStrategy,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            persist: true,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            debug_mode: false,
            org: String::new(),
            provider: String::new(),
            liveness: LivenessStrategy::default(),
        }
    }
}

impl AuthenticatorConfig {
    /// Reject values no authenticator can work with.
    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(AuthError::Config("storage_key must not be empty".into()));
        }
        match self.liveness {
            LivenessStrategy::Poll { interval_ms: 0 } => {
                Err(AuthError::Config("popup poll interval must be greater than zero".into()))
            }
            LivenessStrategy::Timeout { timeout_ms: 0 } => {
                Err(AuthError::Config("popup timeout must be greater than zero".into()))
            }
            _ => Ok(()),
        }
    }
}

/// How an open login popup is watched for abandonment
///
/// Exactly one strategy is active per configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LivenessStrategy {
    /// Check on a fixed interval whether the popup has been closed.
    Poll {
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
    },
    /// Give up after a single timer elapses.
    Timeout {
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Default for LivenessStrategy {
    fn default() -> Self {
        Self::Poll { interval_ms: DEFAULT_POPUP_POLL_INTERVAL_MS }
    }
}

impl LivenessStrategy {
    pub fn timeout(timeout_ms: u64) -> Self {
        Self::Timeout { timeout_ms }
    }

    pub fn poll(interval_ms: u64) -> Self {
        Self::Poll { interval_ms }
    }

    /// Label used in logs and environment configuration.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Poll { .. } => "poll",
            Self::Timeout { .. } => "timeout",
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_POPUP_POLL_INTERVAL_MS
}

fn default_timeout_ms() -> u64 {
    DEFAULT_POPUP_TIMEOUT_MS
}

/// Per-call login options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginOptions {
    /// Redirect URI registered for the client. Optional for popup login.
    pub redirect_uri: Option<String>,
    /// Application state to get back after login. Any JSON value.
    pub state: Option<serde_json::Value>,
    /// Organization name; only used together with `provider`.
    pub org: Option<String>,
    /// Identity provider (okta, adfs, ...); only used together with `org`.
    pub provider: Option<String>,
    pub use_popup_auth: bool,
    /// Overrides the configured duration when the timeout strategy is active.
    pub popup_timeout_ms: Option<u64>,
}

impl LoginOptions {
    /// Same-window redirect login returning to `redirect_uri`.
    pub fn redirect(redirect_uri: impl Into<String>) -> Self {
        Self { redirect_uri: Some(redirect_uri.into()), ..Self::default() }
    }

    /// Popup login.
    pub fn popup() -> Self {
        Self { use_popup_auth: true, ..Self::default() }
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<serde_json::Value>) -> Self {
        self.state = Some(state.into());
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    #[must_use]
    pub fn with_org_provider(mut self, org: impl Into<String>, provider: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn with_popup_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.popup_timeout_ms = Some(timeout_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_uses_defaults() {
        let config: AuthenticatorConfig =
            serde_json::from_str(r#"{ "storage_key": "app_auth" }"#).unwrap();
        assert_eq!(config.storage_key, "app_auth");
        assert_eq!(config.environment, DEFAULT_ENVIRONMENT);
        assert!(config.persist);
        assert_eq!(config.liveness, LivenessStrategy::poll(DEFAULT_POPUP_POLL_INTERVAL_MS));
    }

    #[test]
    fn validation_rejects_unusable_values() {
        assert!(AuthenticatorConfig::default().validate().is_ok());

        let empty_key = AuthenticatorConfig { storage_key: " ".into(), ..Default::default() };
        assert!(matches!(empty_key.validate(), Err(AuthError::Config(_))));

        let zero_poll =
            AuthenticatorConfig { liveness: LivenessStrategy::poll(0), ..Default::default() };
        assert!(zero_poll.validate().is_err());
    }

    #[test]
    fn liveness_is_tagged_by_mode() {
        let config: AuthenticatorConfig =
            serde_json::from_str(r#"{ "liveness": { "mode": "timeout" } }"#).unwrap();
        assert_eq!(config.liveness, LivenessStrategy::timeout(DEFAULT_POPUP_TIMEOUT_MS));
        assert_eq!(config.liveness.mode(), "timeout");
    }
}
