//! # Handoff Domain
//!
//! Data types shared by every layer of the implicit grant coordinator.
//!
//! This crate contains:
//! - The token record (`AuthData`) and the cross-window event model
//! - Per-attempt metadata persisted between the opener and the landing page
//! - Configuration structures and defaults
//! - The error taxonomy and Result alias
//! - Environment normalization and token timing helpers
//!
//! ## Architecture
//! - No dependencies on other Handoff crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::environment::{parse_env, Environment};
pub use utils::token_time::{is_issued_time_within_timeframe, token_was_issued_at};
