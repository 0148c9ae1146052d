//! Browser window adapters

pub mod simulated;

pub use simulated::{SimulatedPopup, SimulatedWindow};
