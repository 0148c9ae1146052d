//! Login coordinator states

use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;

/// Where a coordinator currently is in the login state machine
///
/// `Idle -> CheckingExisting -> (Authenticated | Redirecting | AwaitingPopup)`,
/// and from `AwaitingPopup` on to `Authenticated` or `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginState {
    #[default]
    Idle,
    CheckingExisting,
    Authenticated,
    Redirecting,
    AwaitingPopup,
    Failed,
}

impl_label_conversions!(LoginState {
    Idle => "idle",
    CheckingExisting => "checking_existing",
    Authenticated => "authenticated",
    Redirecting => "redirecting",
    AwaitingPopup => "awaiting_popup",
    Failed => "failed",
});

impl LoginState {
    /// States an attempt cannot leave without a new `login` call.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Authenticated | Self::Failed | Self::Redirecting)
    }
}
