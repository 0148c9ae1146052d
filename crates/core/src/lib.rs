//! # Handoff Core
//!
//! Coordinator logic - no platform or HTTP dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for storage, validation and windows
//! - Fragment parsing and the auth data store
//! - The cross-window messenger and popup liveness watchers
//! - The login coordinator, its registry and the redirect landing handler
//!
//! ## Architecture Principles
//! - Only depends on `handoff-domain`
//! - Every external effect goes through a port
//! - Timers and channels come from Tokio

pub mod fragment;
pub mod landing;
pub mod liveness;
pub mod login;
pub mod messenger;
pub mod ports;
pub mod store;

pub use fragment::{parse_fragment, parse_fragment_at, parse_query_params, QueryStrategy};
pub use landing::LandingHandler;
pub use liveness::{watcher_for, LivenessWatcher, PollingWatcher, TimeoutWatcher};
pub use login::{build_auth_url, Authenticator, AuthenticatorRegistry};
pub use messenger::{Messenger, Subscription, SubscriptionId};
pub use ports::{
    BrowserWindow, KeyValueStore, PopupHandle, StorageChange, TokenValidator, UnloadHook,
    UnloadHookGuard, UnloadHookId,
};
pub use store::AuthDataStore;
