//! The token record
//!
//! `AuthData` is created by the fragment parser from a redirect response or
//! loaded from storage, and is only ever mutated by the login coordinator
//! after validation. Field names follow the JSON layout shared with the
//! landing page, so records written by one side can be read by the other.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AuthError;

/// Current authentication data
///
/// `error` and `access_token` are mutually exclusive within a single record
/// transition; a record carrying `error` is never authenticated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Expiry as epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiry_time: Option<i64>,

    /// ISO-8601 rendering of `token_expiry_time`; a cache, never a source of truth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiry_time_string: Option<String>,

    /// Opaque caller-supplied correlation value. Any JSON value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, rename = "error_description", skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl AuthData {
    /// Record holding only an access token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { access_token: Some(token.into()), ..Self::default() }
    }

    /// Record holding only an OAuth error.
    pub fn with_error(error: impl Into<String>, description: Option<String>) -> Self {
        Self { error: Some(error.into()), error_description: description, ..Self::default() }
    }

    /// Set `token_expiry_time` (and its ISO string) from an absolute instant.
    pub fn set_expiry(&mut self, expires_at_ms: i64) {
        self.token_expiry_time = Some(expires_at_ms);
        self.token_expiry_time_string = iso_from_millis(expires_at_ms);
    }

    /// Builder form of [`AuthData::set_expiry`].
    #[must_use]
    pub fn expiring_at(mut self, expires_at_ms: i64) -> Self {
        self.set_expiry(expires_at_ms);
        self
    }

    /// Builder form for the correlation state.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<Value>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// `state` when it is a JSON string.
    pub fn state_str(&self) -> Option<&str> {
        self.state.as_ref().and_then(Value::as_str)
    }

    /// `true` when the record carries a usable-looking token and no error.
    pub fn has_token(&self) -> bool {
        self.error.is_none() && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// `true` when an expiry is recorded and it is at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.token_expiry_time.is_some_and(|expiry| expiry <= now.timestamp_millis())
    }

    /// The error carried by this record, if any.
    pub fn as_error(&self) -> Option<AuthError> {
        self.error
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(|e| AuthError::oauth(e, self.error_description.as_deref()))
    }
}

/// ISO-8601 string with millisecond precision, e.g. `2021-06-25T09:00:00.000Z`.
pub fn iso_from_millis(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}
