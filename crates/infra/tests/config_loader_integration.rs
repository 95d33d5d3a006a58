//! Integration tests for configuration loader
//!
//! Loads real files from disk and feeds the result to the runtime provider.

use std::path::PathBuf;

use outpost_core::ConfigurationProvider;
use outpost_infra::config::{self, RuntimeConfigProvider};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("config file written");
    path
}

#[test]
fn test_load_config_from_toml_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "outpost.toml",
        r#"
        [device]
        id = "watch-7"
        source = "wearable"

        [database]
        path = "/var/lib/outpost/queue.db"
        pool_size = 2

        [upload]
        base_url = "https://ingest.example.com/"
        interval_secs = 120
        batch_size = 25

        [[streams]]
        name = "heart_rate"
        interval_secs = 5

        [[streams]]
        name = "steps"
        enabled = false
        "#,
    );

    let config = config::load_from_file(Some(path)).expect("toml config loads");

    assert_eq!(config.device.id, "watch-7");
    assert_eq!(config.database.pool_size, 2);
    assert_eq!(config.upload.interval_secs, 120);
    assert_eq!(config.upload.batch_size, 25);
    // Untouched sections keep their defaults.
    assert_eq!(config.upload.auth_failure_threshold, 3);
    assert_eq!(config.health.interval_secs, 30);
    assert_eq!(config.streams.len(), 2);
    assert!(config::validate(&config).is_ok());

    let provider = RuntimeConfigProvider::new(config);
    assert!(provider.is_stream_enabled("heart_rate"));
    assert!(!provider.is_stream_enabled("steps"));
    assert_eq!(provider.source(), "wearable");
    assert_eq!(provider.credential(), None);
}

#[test]
fn test_load_config_from_json_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "outpost.json",
        r#"{
            "device": {"id": "laptop", "token": "secret"},
            "upload": {"base_url": "http://localhost:9000", "enabled": false},
            "streams": [{"name": "cpu"}]
        }"#,
    );

    let config = config::load_from_file(Some(path)).expect("json config loads");

    assert!(!config.upload.enabled);
    assert_eq!(config.device.token.as_deref(), Some("secret"));
    assert_eq!(config.streams[0].interval_secs, 10);
    assert_eq!(config.database.path, "outpost.db");
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = config::load_from_file(Some(dir.path().join("absent.toml")));
    assert!(result.is_err());
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "outpost.toml", "[upload\nbase_url = ");
    let err = config::load_from_file(Some(path)).unwrap_err();
    assert!(err.to_string().contains("Invalid TOML"));
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "outpost.yaml", "upload: {}");
    assert!(config::load_from_file(Some(path)).is_err());
}

#[test]
fn test_duplicate_streams_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "config.toml",
        r#"
        [[streams]]
        name = "cpu"

        [[streams]]
        name = "cpu"
        "#,
    );

    let config = config::load_from_file(Some(path)).expect("file parses");
    let err = config::validate(&config).unwrap_err();
    assert!(err.to_string().contains("duplicate stream"));
}
