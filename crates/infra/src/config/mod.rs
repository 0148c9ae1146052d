//! Configuration loading
//!
//! Builds an [`AuthenticatorConfig`](handoff_domain::AuthenticatorConfig)
//! from environment variables or JSON/TOML files.

pub mod loader;

// Re-export commonly used items
pub use loader::{config_from_vars, load, load_from_env, load_from_file, probe_config_paths};
