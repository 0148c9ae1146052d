//! Key-value storage adapters

pub mod shared;

pub use shared::{SharedStorage, StorageContext};
