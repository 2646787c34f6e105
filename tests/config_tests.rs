// Tests for config module in src/config.rs

use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use ttth::config::{config_dir_path, load_config_from, CONFIG_DIR_ENV, DEFAULT_POLL_INTERVAL};

#[test]
#[serial]
fn test_config_dir_env_override() {
    std::env::set_var(CONFIG_DIR_ENV, "/tmp/ttth-test-config");
    assert_eq!(config_dir_path(), PathBuf::from("/tmp/ttth-test-config"));
    std::env::remove_var(CONFIG_DIR_ENV);
}

#[test]
#[serial]
fn test_empty_env_uses_platform_dir() {
    std::env::set_var(CONFIG_DIR_ENV, "");
    let dir = config_dir_path();
    std::env::remove_var(CONFIG_DIR_ENV);

    assert!(dir.ends_with("ttth"));
}

#[test]
fn test_invalid_values_fall_back() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("ttth.ini"),
        "[General]\npollIntervalMs = soon\nuserAgent = \n",
    )
    .unwrap();

    let cfg = load_config_from(dir.path().to_path_buf());

    assert_eq!(cfg.poll_interval, DEFAULT_POLL_INTERVAL);
    assert!(cfg.user_agent.contains("Chrome"));
}

#[test]
fn test_custom_user_agent_and_interval() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("ttth.ini"),
        "[General]\npollIntervalMs = 8000\nuserAgent = TestAgent/1.0\n",
    )
    .unwrap();

    let cfg = load_config_from(dir.path().to_path_buf());

    assert_eq!(cfg.poll_interval, Duration::from_millis(8000));
    assert_eq!(cfg.user_agent, "TestAgent/1.0");
}
