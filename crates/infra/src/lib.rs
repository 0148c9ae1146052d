//! # Handoff Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The HTTP token validator (reqwest)
//! - Shared origin storage with per-context change notifications
//! - A headless browser window and popup model
//! - Configuration loading from environment variables and files
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `handoff-core`
//! - Depends on `handoff-domain` and `handoff-core`
//! - Contains all "impure" code (I/O, network, global subscriber)

pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod storage;
pub mod window;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, HttpTokenValidator};
pub use logging::{init_tracing, init_tracing_with, LogFormat};
pub use storage::{SharedStorage, StorageContext};
pub use window::{SimulatedPopup, SimulatedWindow};
