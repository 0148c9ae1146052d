//! Environment normalization
//!
//! Callers may hand us `mypurecloud.ie`, `https://api.mypurecloud.ie/` or
//! anything in between. Everything is reduced to the bare domain before the
//! API and login hosts are derived from it.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_ENVIRONMENT;

/// Normalized environment and the hosts derived from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Bare domain, e.g. `mypurecloud.com`
    pub domain: String,
    /// `https://api.<domain>`
    pub api_base: String,
    /// `https://login.<domain>`
    pub auth_base: String,
}

/// Normalize `environment` and derive the API and login bases.
///
/// Strips trailing slashes, then an `https://` or `http://` scheme, then an
/// `api.` prefix. An empty value falls back to the default environment.
pub fn parse_env(environment: &str) -> Environment {
    let mut domain = environment.trim().trim_end_matches('/');
    if domain.is_empty() {
        domain = DEFAULT_ENVIRONMENT;
    }

    let domain = domain.strip_prefix("https://").unwrap_or(domain);
    let domain = domain.strip_prefix("http://").unwrap_or(domain);
    let domain = domain.strip_prefix("api.").unwrap_or(domain);

    Environment {
        domain: domain.to_string(),
        api_base: format!("https://api.{domain}"),
        auth_base: format!("https://login.{domain}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scheme_and_api_prefix() {
        for input in [
            "mypurecloud.ie",
            "api.mypurecloud.ie",
            "https://api.mypurecloud.ie",
            "http://mypurecloud.ie/",
            "https://mypurecloud.ie//",
        ] {
            let env = parse_env(input);
            assert_eq!(env.domain, "mypurecloud.ie", "input: {input}");
            assert_eq!(env.api_base, "https://api.mypurecloud.ie");
            assert_eq!(env.auth_base, "https://login.mypurecloud.ie");
        }
    }

    #[test]
    fn empty_environment_uses_default() {
        assert_eq!(parse_env("").domain, DEFAULT_ENVIRONMENT);
        assert_eq!(parse_env("  ").auth_base, format!("https://login.{DEFAULT_ENVIRONMENT}"));
    }
}
