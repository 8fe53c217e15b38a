//! Loading configuration files from disk

use postback::config::{Config, ProtectionMode};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config::load(Some(&dir.path().join("absent.toml")));
    assert!(config.persistence.enabled);
    assert_eq!(config.server.port, 3000);
}

#[test]
fn test_file_values_override_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[state]
protection = "mac"
mac-key = "abc"
id-separator = ":"

[server]
host = "0.0.0.0"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path));
    assert_eq!(config.persistence.protection, ProtectionMode::Mac);
    assert_eq!(config.persistence.id_separator, ':');
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn test_invalid_file_falls_back_to_defaults() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[state\nenabled = ").unwrap();

    let config = Config::load(Some(&path));
    assert!(config.persistence.event_validation);
    assert_eq!(config.persistence.protection, ProtectionMode::None);
}
