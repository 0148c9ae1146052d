//! Cross-window events
//!
//! One login attempt owns one topic. Every value written to the topic key is
//! a JSON encoded [`PubSubEvent`] of the form `{ "event": ..., "body": ... }`.

use serde::{Deserialize, Serialize};

use super::auth_data::AuthData;
use crate::impl_label_conversions;

/// Event written under a per-attempt topic key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "body")]
pub enum PubSubEvent {
    /// The other context is alive and working.
    #[serde(rename = "IN_PROGRESS")]
    InProgress(InProgressBody),

    /// Terminal success carrying the resolved auth data.
    #[serde(rename = "COMPLETE")]
    Complete(CompleteBody),

    /// Terminal failure.
    #[serde(rename = "FAILURE")]
    Failure(FailureBody),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InProgressBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub auth_data: AuthData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    #[serde(rename = "type")]
    pub kind: FailureKind,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

/// Reason a login attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "BLOCKED")]
    Blocked,
    #[serde(rename = "CLOSED")]
    Closed,
    #[serde(rename = "OAUTH_ERROR")]
    OAuthError,
    #[serde(rename = "OTHER")]
    Other,
}

impl_label_conversions!(FailureKind {
    Timeout => "timeout",
    Blocked => "blocked",
    Closed => "closed",
    OAuthError => "oauth_error",
    Other => "other",
});

impl PubSubEvent {
    pub fn in_progress(href: Option<String>) -> Self {
        Self::InProgress(InProgressBody { href, state: None })
    }

    pub fn complete(auth_data: AuthData, href: Option<String>) -> Self {
        Self::Complete(CompleteBody { href, auth_data })
    }

    pub fn failure(kind: FailureKind, error: impl Into<String>) -> Self {
        Self::Failure(FailureBody { kind, error: error.into(), error_description: None })
    }

    /// `COMPLETE` and `FAILURE` end the messaging phase of an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failure(_))
    }

    /// Short label used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::InProgress(_) => "IN_PROGRESS",
            Self::Complete(_) => "COMPLETE",
            Self::Failure(_) => "FAILURE",
        }
    }

    /// Decode a raw storage value. Anything that is not a well-formed event
    /// (including attempt metadata sharing the same key) yields `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Encode for storage.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
