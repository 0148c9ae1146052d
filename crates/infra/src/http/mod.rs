//! HTTP adapters

pub mod client;
pub mod validator;

pub use client::{HttpClient, HttpClientBuilder};
pub use validator::HttpTokenValidator;
