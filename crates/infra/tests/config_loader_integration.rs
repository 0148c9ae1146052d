//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and the
//! environment.

use std::io::Write;
use std::sync::Mutex;

use handoff_domain::{AuthError, AuthenticatorConfig, LivenessStrategy};
use handoff_infra::config;
use tempfile::Builder;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const HANDOFF_VARS: [&str; 9] = [
    "HANDOFF_ENVIRONMENT",
    "HANDOFF_STORAGE_KEY",
    "HANDOFF_PERSIST",
    "HANDOFF_DEBUG",
    "HANDOFF_ORG",
    "HANDOFF_PROVIDER",
    "HANDOFF_LIVENESS",
    "HANDOFF_POPUP_INTERVAL_MS",
    "HANDOFF_POPUP_TIMEOUT_MS",
];

fn clear_handoff_vars() {
    for key in HANDOFF_VARS {
        std::env::remove_var(key);
    }
}

#[test]
fn load_config_from_json_file() {
    let json_content = r#"{
        "environment": "https://api.mypurecloud.de/",
        "storage_key": "app_auth",
        "persist": false,
        "debug_mode": true,
        "org": "acme",
        "provider": "okta",
        "liveness": { "mode": "poll", "interval_ms": 250 }
    }"#;

    let mut file = Builder::new().suffix(".json").tempfile().expect("create temp file");
    file.write_all(json_content.as_bytes()).expect("write temp file");

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();

    assert_eq!(config.environment, "https://api.mypurecloud.de/");
    assert_eq!(config.storage_key, "app_auth");
    assert!(!config.persist);
    assert!(config.debug_mode);
    assert_eq!(config.org, "acme");
    assert_eq!(config.provider, "okta");
    assert_eq!(config.liveness, LivenessStrategy::poll(250));
}

#[test]
fn partial_toml_file_keeps_defaults() {
    let mut file = Builder::new().suffix(".toml").tempfile().expect("create temp file");
    writeln!(file, "debug_mode = true").unwrap();

    let config = config::load_from_file(Some(file.path().to_path_buf())).unwrap();

    assert!(config.debug_mode);
    assert_eq!(
        config,
        AuthenticatorConfig { debug_mode: true, ..AuthenticatorConfig::default() }
    );
}

#[test]
fn invalid_file_contents_are_config_errors() {
    let mut json = Builder::new().suffix(".json").tempfile().unwrap();
    write!(json, r#"{{ "storage_key": "#).unwrap();
    let err = config::load_from_file(Some(json.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, AuthError::Config(ref m) if m.starts_with("Invalid JSON format")));

    let mut empty_key = Builder::new().suffix(".json").tempfile().unwrap();
    write!(empty_key, r#"{{ "storage_key": "" }}"#).unwrap();
    let err = config::load_from_file(Some(empty_key.path().to_path_buf())).unwrap_err();
    assert!(matches!(err, AuthError::Config(_)));
}

#[test]
fn environment_variables_take_precedence() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_handoff_vars();

    std::env::set_var("HANDOFF_STORAGE_KEY", "env_auth");
    std::env::set_var("HANDOFF_LIVENESS", "timeout");
    std::env::set_var("HANDOFF_POPUP_TIMEOUT_MS", "750");

    let config = config::load().unwrap();

    assert_eq!(config.storage_key, "env_auth");
    assert_eq!(config.liveness, LivenessStrategy::timeout(750));

    clear_handoff_vars();
}

#[test]
fn load_from_env_requires_a_variable() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    clear_handoff_vars();

    let err = config::load_from_env().unwrap_err();
    assert!(matches!(err, AuthError::Config(_)));
}
