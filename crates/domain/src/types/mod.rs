//! Domain types and models

pub mod attempt;
pub mod auth_data;
pub mod pubsub;
pub mod state;

pub use attempt::{AttemptMetadata, AuthRequestParams, DeliveryChannel};
pub use auth_data::{iso_from_millis, AuthData};
pub use pubsub::{CompleteBody, FailureBody, FailureKind, InProgressBody, PubSubEvent};
pub use state::LoginState;
