//! Macro for implementing Display and FromStr for label enums
//!
//! Several protocol enums (failure kinds, coordinator states) need a stable
//! lowercase label for logs and configuration. This macro provides both
//! conversions from a single mapping.
//!
//! # Example
//!
//! ```rust
//! use handoff_domain::impl_label_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Mode {
//!     Poll,
//!     Timeout,
//! }
//!
//! impl_label_conversions!(Mode {
//!     Poll => "poll",
//!     Timeout => "timeout",
//! });
//!
//! assert_eq!(Mode::Poll.to_string(), "poll");
//! assert_eq!("TIMEOUT".parse::<Mode>(), Ok(Mode::Timeout));
//! ```

/// Implements Display and FromStr traits for label enums
///
/// - Display writes the mapped label verbatim
/// - FromStr parses case-insensitively (labels must be lowercase)
#[macro_export]
macro_rules! impl_label_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
