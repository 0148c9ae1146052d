//! Configuration loader
//!
//! Loads authenticator configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If none are set, falls back to loading from file
//! 3. If no file exists either, uses the defaults
//!
//! ## Environment Variables
//! - `HANDOFF_ENVIRONMENT`: Login environment domain
//! - `HANDOFF_STORAGE_KEY`: Storage key of the token record
//! - `HANDOFF_PERSIST`: Persist the record to storage (true/false)
//! - `HANDOFF_DEBUG`: Keep popup windows and attempt entries (true/false)
//! - `HANDOFF_ORG` / `HANDOFF_PROVIDER`: Default organization and provider
//! - `HANDOFF_LIVENESS`: `poll` or `timeout`
//! - `HANDOFF_POPUP_INTERVAL_MS`: Poll interval
//! - `HANDOFF_POPUP_TIMEOUT_MS`: Popup timeout
//!
//! ## File Locations
//! The loader probes `handoff.{json,toml}` then `config.{json,toml}` in the
//! working directory, its two parents and the executable directory.

use std::path::{Path, PathBuf};

use handoff_domain::constants::{DEFAULT_POPUP_POLL_INTERVAL_MS, DEFAULT_POPUP_TIMEOUT_MS};
use handoff_domain::{AuthError, AuthenticatorConfig, LivenessStrategy, Result};

use crate::errors::InfraError;

const ENV_PREFIX: &str = "HANDOFF_";

const CONFIG_FILE_NAMES: [&str; 4] = ["handoff.json", "handoff.toml", "config.json", "config.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `AuthError::Config` if a source is present but invalid.
pub fn load() -> Result<AuthenticatorConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            return Ok(config);
        }
        Err(e) => tracing::debug!(error = %e, "No configuration in environment, trying file"),
    }

    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::debug!("No configuration file found, using defaults");
            Ok(AuthenticatorConfig::default())
        }
    }
}

/// Load configuration from `HANDOFF_*` environment variables
///
/// Unset variables keep their defaults, but at least one must be set.
///
/// # Errors
/// Returns `AuthError::Config` if no variable is set or a value is invalid.
pub fn load_from_env() -> Result<AuthenticatorConfig> {
    let any_set = std::env::vars().any(|(key, _)| key.starts_with(ENV_PREFIX));
    if !any_set {
        return Err(AuthError::Config("No HANDOFF_* environment variables set".into()));
    }
    config_from_vars(|key| std::env::var(key).ok())
}

/// Build a configuration from a variable lookup
///
/// Split out of [`load_from_env`] so callers can supply their own source.
pub fn config_from_vars<F>(lookup: F) -> Result<AuthenticatorConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = AuthenticatorConfig::default();

    if let Some(environment) = lookup("HANDOFF_ENVIRONMENT") {
        config.environment = environment;
    }
    if let Some(storage_key) = lookup("HANDOFF_STORAGE_KEY") {
        config.storage_key = storage_key;
    }
    if let Some(value) = lookup("HANDOFF_PERSIST") {
        config.persist = parse_bool("HANDOFF_PERSIST", &value)?;
    }
    if let Some(value) = lookup("HANDOFF_DEBUG") {
        config.debug_mode = parse_bool("HANDOFF_DEBUG", &value)?;
    }
    if let Some(org) = lookup("HANDOFF_ORG") {
        config.org = org;
    }
    if let Some(provider) = lookup("HANDOFF_PROVIDER") {
        config.provider = provider;
    }

    let interval_ms = parse_millis(&lookup, "HANDOFF_POPUP_INTERVAL_MS")?;
    let timeout_ms = parse_millis(&lookup, "HANDOFF_POPUP_TIMEOUT_MS")?;
    let mode = lookup("HANDOFF_LIVENESS").map(|m| m.trim().to_ascii_lowercase());

    config.liveness = match mode.as_deref() {
        None | Some("poll") => {
            LivenessStrategy::poll(interval_ms.unwrap_or(DEFAULT_POPUP_POLL_INTERVAL_MS))
        }
        Some("timeout") => {
            LivenessStrategy::timeout(timeout_ms.unwrap_or(DEFAULT_POPUP_TIMEOUT_MS))
        }
        Some(other) => {
            return Err(AuthError::Config(format!(
                "Invalid HANDOFF_LIVENESS: {other} (expected poll or timeout)"
            )))
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `AuthError::Config` if the file is missing, unreadable or invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<AuthenticatorConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(AuthError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            AuthError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path).map_err(InfraError::from)?;
    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

fn parse_config(contents: &str, path: &Path) -> Result<AuthenticatorConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => Ok(toml::from_str(contents).map_err(InfraError::from)?),
        "json" => Ok(serde_json::from_str(contents).map_err(InfraError::from)?),
        _ => Err(AuthError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a configuration file
///
/// Returns the first file found, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AuthError::Config(format!("Invalid boolean for {key}: {other}"))),
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| AuthError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::Builder;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        for value in ["1", "true", "YES", "on"] {
            assert!(parse_bool("K", value).unwrap());
        }
        for value in ["0", "False", "no", "off"] {
            assert!(!parse_bool("K", value).unwrap());
        }
        assert!(matches!(parse_bool("K", "maybe"), Err(AuthError::Config(_))));
    }

    #[test]
    fn vars_override_defaults() {
        let config = config_from_vars(vars(&[
            ("HANDOFF_ENVIRONMENT", "mypurecloud.ie"),
            ("HANDOFF_STORAGE_KEY", "app_auth"),
            ("HANDOFF_PERSIST", "false"),
            ("HANDOFF_DEBUG", "1"),
            ("HANDOFF_ORG", "acme"),
            ("HANDOFF_PROVIDER", "okta"),
            ("HANDOFF_LIVENESS", "timeout"),
            ("HANDOFF_POPUP_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();

        assert_eq!(config.environment, "mypurecloud.ie");
        assert_eq!(config.storage_key, "app_auth");
        assert!(!config.persist);
        assert!(config.debug_mode);
        assert_eq!((config.org.as_str(), config.provider.as_str()), ("acme", "okta"));
        assert_eq!(config.liveness, LivenessStrategy::timeout(2500));
    }

    #[test]
    fn poll_is_the_default_strategy() {
        let config = config_from_vars(vars(&[("HANDOFF_POPUP_INTERVAL_MS", "25")])).unwrap();
        assert_eq!(config.liveness, LivenessStrategy::poll(25));

        let config = config_from_vars(vars(&[])).unwrap();
        assert_eq!(config, AuthenticatorConfig::default());
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let bad_number = config_from_vars(vars(&[("HANDOFF_POPUP_TIMEOUT_MS", "soon")]));
        assert!(matches!(bad_number, Err(AuthError::Config(_))));

        let bad_mode = config_from_vars(vars(&[("HANDOFF_LIVENESS", "websocket")]));
        assert!(matches!(bad_mode, Err(AuthError::Config(ref m)) if m.contains("websocket")));

        let zero = config_from_vars(vars(&[("HANDOFF_POPUP_INTERVAL_MS", "0")]));
        assert!(zero.is_err());
    }

    #[test]
    fn file_format_follows_extension() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "storage_key = \"toml_auth\"\n\n[liveness]\nmode = \"timeout\"\ntimeout_ms = 900")
            .unwrap();

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.storage_key, "toml_auth");
        assert_eq!(config.liveness, LivenessStrategy::timeout(900));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let result = parse_config("storage_key: x", Path::new("handoff.yaml"));
        assert!(matches!(result, Err(AuthError::Config(ref m)) if m.contains("yaml")));
    }

    #[test]
    fn missing_file_is_config_error() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/handoff.json")));
        assert!(matches!(result, Err(AuthError::Config(_))));
    }
}
