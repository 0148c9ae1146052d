//! Login coordination
//!
//! The [`Authenticator`] decides whether an existing token is usable and,
//! when it is not, sends the user to the login page either by navigating the
//! current window or through a popup watched by the messenger protocol.

pub mod coordinator;
pub mod registry;
pub mod authorize_url;

pub use coordinator::Authenticator;
pub use registry::AuthenticatorRegistry;
pub use authorize_url::build_auth_url;
