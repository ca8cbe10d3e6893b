//! Integration tests for ConfigManager
//!
//! Each test works in its own temporary directory and reads environment
//! overrides under its own prefix, so tests never see each other's settings.

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;
use ui_bridge::{BridgeConfig, ConfigManager, WindowSpec};

fn temp_dir() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
    (temp, path)
}

#[test]
fn test_save_then_load_round_trip() {
    let (_temp, dir) = temp_dir();
    let manager = ConfigManager::with_env_prefix(&dir, "UI_BRIDGE_IT_SAVE").unwrap();

    let config = BridgeConfig {
        ring_capacity: 64,
        max_create_attempts: 3,
        resize_debounce_ms: 50,
        create_window_on_start: true,
        window: WindowSpec::new(640, 480, "saved"),
        ..BridgeConfig::default()
    };
    manager.save(&config).unwrap();
    assert!(manager.config_path().exists());

    let loaded = manager.load().unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let (_temp, dir) = temp_dir();
    let manager = ConfigManager::with_env_prefix(&dir, "UI_BRIDGE_IT_PARTIAL").unwrap();
    fs::write(
        manager.config_path(),
        "watchdog_timeout_ms: 750\nwindow:\n  title: partial\n",
    )
    .unwrap();

    let config = manager.load().unwrap();
    assert_eq!(config.watchdog_timeout_ms, 750);
    assert_eq!(config.window.title, "partial");
    assert_eq!(config.window.width, 1024);
    assert_eq!(config.ring_capacity, 256);
}

#[test]
fn test_loaded_values_are_validated() {
    let (_temp, dir) = temp_dir();
    let manager = ConfigManager::with_env_prefix(&dir, "UI_BRIDGE_IT_CLAMP").unwrap();
    fs::write(
        manager.config_path(),
        "ring_capacity: 0\nmax_create_attempts: 0\ntarget_fps: 100000\n",
    )
    .unwrap();

    let config = manager.load().unwrap();
    assert_eq!(config.ring_capacity, 1);
    assert_eq!(config.max_create_attempts, 1);
    assert_eq!(config.target_fps, 1000);
}

#[test]
fn test_environment_overrides_file() {
    let (_temp, dir) = temp_dir();
    let manager = ConfigManager::with_env_prefix(&dir, "UI_BRIDGE_IT_ENV").unwrap();
    fs::write(manager.config_path(), "ring_capacity: 32\npump_interval_ms: 8\n").unwrap();

    // SAFETY: the variables use a prefix no other test reads
    unsafe {
        std::env::set_var("UI_BRIDGE_IT_ENV__RING_CAPACITY", "128");
        std::env::set_var("UI_BRIDGE_IT_ENV__WINDOW__TITLE", "from-env");
    }

    let config = manager.load().unwrap();
    assert_eq!(config.ring_capacity, 128);
    assert_eq!(config.pump_interval_ms, 8);
    assert_eq!(config.window.title, "from-env");

    unsafe {
        std::env::remove_var("UI_BRIDGE_IT_ENV__RING_CAPACITY");
        std::env::remove_var("UI_BRIDGE_IT_ENV__WINDOW__TITLE");
    }
}
