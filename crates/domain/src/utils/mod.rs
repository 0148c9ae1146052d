//! Pure helper functions shared across crates

pub mod environment;
pub mod token_time;
