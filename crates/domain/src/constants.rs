//! Protocol constants
//!
//! Defaults and fixed names shared by the opener and the landing page. Both
//! sides must agree on these values, so they live in the domain crate.

/// Environment used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "mypurecloud.com";

/// Storage key holding the long-lived token record.
pub const DEFAULT_STORAGE_KEY: &str = "gc_client_auth_data";

/// Namespace prefix for per-attempt topic keys.
pub const TOPIC_KEY_PREFIX: &str = "gc-ca_";

/// Path of the "who am I" endpoint used to validate a token.
pub const TOKEN_VALIDATION_PATH: &str = "/api/v2/tokens/me";

/// Authorization endpoint path on the login host.
pub const AUTHORIZE_PATH: &str = "oauth/authorize";

/// Logout endpoint path on the login host.
pub const LOGOUT_PATH: &str = "logout";

/// OAuth response type for the implicit grant.
pub const RESPONSE_TYPE_TOKEN: &str = "token";

// Popup liveness
pub const DEFAULT_POPUP_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_POPUP_TIMEOUT_MS: u64 = 15_000;

/// Window features requested for the login popup.
pub const POPUP_WINDOW_FEATURES: &str = "width=500px, height=500px, resizable, scrollbars, status";

/// Number of recently published payloads a messenger remembers so that it can
/// ignore storage notifications echoing its own writes.
pub const SENT_MESSAGE_HISTORY: usize = 3;

// Token timing defaults
pub const DEFAULT_TOKEN_LIFETIME_MS: i64 = 691_199_000;
pub const DEFAULT_ISSUED_TIMEFRAME_MS: i64 = 1_680_000;
