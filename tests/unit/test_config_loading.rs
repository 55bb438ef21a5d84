use flowbridge::core::config::{ConfigLoader, FlowbridgeConfig};
use flowbridge::core::fallback;
use serial_test::serial;
use std::env;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn clear_flowbridge_env() {
    for v in &[
        "FLOWBRIDGE_FALLBACK_ENDPOINT",
        "FLOWBRIDGE_FALLBACK_MODEL",
        "FLOWBRIDGE_FALLBACK_TIMEOUT",
        "FLOWBRIDGE_BATCH_CONCURRENCY",
        "FLOWBRIDGE_TEST_KEY",
    ] {
        env::remove_var(v);
    }
}

/// Every section of flowbridge.toml is read and validated together.
#[test]
#[serial]
fn test_config_loading_integration() {
    clear_flowbridge_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flowbridge.toml");
    fs::write(
        &path,
        r#"
[fallback]
endpoint = "https://llm.internal.example/v1/complete"
model = "flow-large"
api_key_env = "FLOWBRIDGE_TEST_KEY"
timeout = "45s"
max_retries = 2

[batch]
concurrency = 8

[optimizer]
documentation_threshold = 25
pacing_interval = 5

[scoring]
blocker = 40.0
near_limit_ratio = 0.9

[logging]
default_level = "debug"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load(Some(&path)).unwrap();
    insta::assert_snapshot!(config.fallback.model, @"flow-large");
    assert_eq!(
        config.fallback.endpoint.as_deref(),
        Some("https://llm.internal.example/v1/complete")
    );
    assert_eq!(config.fallback.timeout_duration().unwrap(), Duration::from_secs(45));
    assert_eq!(config.fallback.max_retries, 2);
    assert_eq!(config.batch.concurrency, 8);
    assert_eq!(config.optimizer.documentation_threshold, 25);
    assert_eq!(config.optimizer.pacing_interval, 5);
    assert_eq!(config.optimizer.pacing_delay_seconds, 1);
    assert_eq!(config.scoring.blocker, 40.0);
    assert_eq!(config.scoring.warning, 10.0);
    assert_eq!(config.scoring.near_limit_ratio, 0.9);
}

#[test]
#[serial]
fn test_env_overrides_win_over_file() {
    clear_flowbridge_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flowbridge.toml");
    fs::write(&path, "[fallback]\nmodel = \"from-file\"\n\n[batch]\nconcurrency = 2\n").unwrap();

    env::set_var("FLOWBRIDGE_FALLBACK_MODEL", "from-env");
    env::set_var("FLOWBRIDGE_BATCH_CONCURRENCY", "6");
    let config = ConfigLoader::load(Some(&path));
    clear_flowbridge_env();

    let config = config.unwrap();
    assert_eq!(config.fallback.model, "from-env");
    assert_eq!(config.batch.concurrency, 6);
}

#[test]
#[serial]
fn test_invalid_env_override_is_rejected() {
    clear_flowbridge_env();
    env::set_var("FLOWBRIDGE_FALLBACK_TIMEOUT", "10m");
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flowbridge.toml");
    fs::write(&path, "").unwrap();
    let result = ConfigLoader::load(Some(&path));
    clear_flowbridge_env();

    let error = result.unwrap_err();
    assert_eq!(error.code, "FLOW-CONFIG-001");
    assert!(error.message.contains("fallback.timeout"));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_flowbridge_env();
    let temp_dir = TempDir::new().unwrap();
    let error = ConfigLoader::load(Some(&temp_dir.path().join("absent.toml"))).unwrap_err();
    assert_eq!(error.code, "FLOW-CONFIG-002");
}

#[test]
#[serial]
fn test_unparseable_file_is_an_error() {
    clear_flowbridge_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("flowbridge.toml");
    fs::write(&path, "[batch\nconcurrency = ").unwrap();
    let error = ConfigLoader::load(Some(&path)).unwrap_err();
    assert_eq!(error.code, "FLOW-CONFIG-001");
}

#[test]
#[serial]
fn test_defaults_disable_the_fallback() {
    clear_flowbridge_env();
    let config = FlowbridgeConfig::default();
    assert!(!config.fallback.is_enabled());
    let adapter = fallback::from_config(&config.fallback).unwrap();
    assert_eq!(adapter.name(), "disabled");
}

#[test]
#[serial]
fn test_api_key_is_read_from_named_variable() {
    clear_flowbridge_env();
    let mut config = FlowbridgeConfig::default();
    config.fallback.api_key_env = "FLOWBRIDGE_TEST_KEY".to_string();
    assert_eq!(config.fallback.api_key(), None);

    env::set_var("FLOWBRIDGE_TEST_KEY", "sk-test");
    assert_eq!(config.fallback.api_key().as_deref(), Some("sk-test"));
    clear_flowbridge_env();
}
