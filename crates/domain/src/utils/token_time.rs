//! Token timing helpers
//!
//! Lets callers decide whether a token was issued recently (for example to
//! avoid prompting again right after a login) from the expiry time alone.

use chrono::Utc;

use crate::constants::{DEFAULT_ISSUED_TIMEFRAME_MS, DEFAULT_TOKEN_LIFETIME_MS};

/// Epoch milliseconds at which a token with the given expiry and lifetime
/// was issued.
pub fn token_was_issued_at(expires_at_ms: i64, expires_in_ms: i64) -> i64 {
    expires_at_ms.saturating_sub(expires_in_ms)
}

/// Whether a token was issued within `timeframe_ms` before `start_ms`.
///
/// `None` arguments fall back to an 8 day lifetime, a 28 minute timeframe and
/// the current time respectively.
///
/// ```
/// use handoff_domain::is_issued_time_within_timeframe;
///
/// let expires_at = 1_624_611_600_000; // 2021-06-25T09:00:00Z
/// let lifetime = 86_400_000; // issued 2021-06-24T09:00:00Z
/// let one_minute_later = 1_624_525_260_000;
///
/// assert!(is_issued_time_within_timeframe(
///     expires_at,
///     Some(lifetime),
///     Some(600_000),
///     Some(one_minute_later),
/// ));
/// ```
pub fn is_issued_time_within_timeframe(
    expires_at_ms: i64,
    expires_in_ms: Option<i64>,
    timeframe_ms: Option<i64>,
    start_ms: Option<i64>,
) -> bool {
    let issued_at =
        token_was_issued_at(expires_at_ms, expires_in_ms.unwrap_or(DEFAULT_TOKEN_LIFETIME_MS));
    let start = start_ms.unwrap_or_else(|| Utc::now().timestamp_millis());

    start.saturating_sub(issued_at) < timeframe_ms.unwrap_or(DEFAULT_ISSUED_TIMEFRAME_MS)
}
