//! Tracing subscriber setup

use handoff_domain::{AuthError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Output format of the global subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Install the global subscriber with human-readable output.
///
/// `RUST_LOG` wins when set. Otherwise the filter is `debug` when `debug` is
/// true and `info` when it is not.
pub fn init_tracing(debug: bool) -> Result<()> {
    init_tracing_with(debug, LogFormat::Pretty)
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `AuthError::Internal` when a global subscriber is already set.
pub fn init_tracing_with(debug: bool, format: LogFormat) -> Result<()> {
    let layer = match format {
        LogFormat::Pretty => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(layer)
        .try_init()
        .map_err(|e| AuthError::Internal(format!("failed to install tracing subscriber: {e}")))
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(debug)))
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_mode_raises_default_level() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }

    #[test]
    fn second_install_is_an_error() {
        // Another test may have installed the subscriber first.
        let _ = init_tracing_with(false, LogFormat::Json);
        let err = init_tracing(true).unwrap_err();
        assert_eq!(err.label(), "internal");
    }
}
