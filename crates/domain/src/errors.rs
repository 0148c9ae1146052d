//! Error types used throughout the coordinator

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::FailureKind;

/// Main error type for Handoff
///
/// Every public entry point rejects with one of these variants rather than
/// resolving with an ambiguous empty success.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum AuthError {
    /// Caller error detected before any network or storage activity.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The authorization server returned `error`/`error_description`.
    #[error("[{error}] {description}")]
    OAuth { error: String, description: String },

    /// A token was rejected by the validation endpoint.
    #[error("Token validation failed: {0}")]
    Validation(String),

    #[error("Login popup was blocked by the browser")]
    PopupBlocked,

    #[error("Login attempt timed out")]
    Timeout,

    #[error("Login popup was closed before authentication completed")]
    Closed,

    /// The current window is navigating to the login page.
    #[error("Routing to login: \"{0}\"")]
    RoutingToLogin(String),

    #[error("No access token provided.")]
    MissingAccessToken,

    #[error("No state param on redirect. Unable to determine location to save auth data.")]
    MissingState,

    #[error("Unable to parse information from storage: {0}")]
    AttemptMetadata(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Build an `OAuth` error from the raw fragment fields.
    pub fn oauth(error: impl Into<String>, description: Option<&str>) -> Self {
        Self::OAuth { error: error.into(), description: description.unwrap_or_default().to_string() }
    }

    /// Map a terminal `FAILURE` event onto the matching error variant.
    pub fn from_failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match kind {
            FailureKind::Timeout => Self::Timeout,
            FailureKind::Blocked => Self::PopupBlocked,
            FailureKind::Closed => Self::Closed,
            FailureKind::OAuthError => Self::OAuth { error: detail, description: String::new() },
            FailureKind::Other => Self::LoginFailed(detail),
        }
    }

    /// Stable label suitable for structured logs and localization lookups.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::OAuth { .. } => "oauth",
            Self::Validation(_) => "validation",
            Self::PopupBlocked => "popup_blocked",
            Self::Timeout => "timeout",
            Self::Closed => "closed",
            Self::RoutingToLogin(_) => "routing_to_login",
            Self::MissingAccessToken => "error_token",
            Self::MissingState => "error_state_param",
            Self::AttemptMetadata(_) => "error_parse",
            Self::Storage(_) => "storage",
            Self::Network(_) => "network",
            Self::LoginFailed(_) => "login_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether calling `login` again may succeed without user intervention
    /// beyond completing the login page.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Closed)
    }

    /// `true` when this error only signals that the window is leaving.
    pub fn is_routing_to_login(&self) -> bool {
        matches!(self, Self::RoutingToLogin(_))
    }
}

/// Result type alias for Handoff operations
pub type Result<T> = std::result::Result<T, AuthError>;
