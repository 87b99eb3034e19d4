// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading and validation.

use parley_config::{load_config_from_path, load_config_from_str, ParleyConfig};

#[test]
fn defaults_load_without_any_file() {
    let config = load_config_from_str("").expect("empty config should load defaults");
    assert_eq!(config.service.name, "parley");
    assert_eq!(config.service.log_level, "info");
    assert_eq!(config.storage.database_path, "parley.db");
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.gateway.port, 8085);
    assert!(config.channel.verify_token.is_none());
    assert!(config.channel.app_secret.is_none());
}

#[test]
fn toml_overrides_defaults() {
    let config = load_config_from_str(
        r#"
        [service]
        name = "parley-staging"
        log_level = "debug"

        [storage]
        database_path = "/var/lib/parley/parley.db"

        [channel]
        verify_token = "shared-verify-token"
        app_secret = "shh"

        [gateway]
        host = "0.0.0.0"
        port = 9000
        "#,
    )
    .expect("valid config should load");

    assert_eq!(config.service.name, "parley-staging");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/var/lib/parley/parley.db");
    assert_eq!(config.channel.verify_token.as_deref(), Some("shared-verify-token"));
    assert_eq!(config.channel.app_secret.as_deref(), Some("shh"));
    assert_eq!(config.gateway.host, "0.0.0.0");
    assert_eq!(config.gateway.port, 9000);
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = load_config_from_str(
        r#"
        [gateway]
        port = 9999
        "#,
    )
    .expect("partial config should load");

    assert_eq!(config.gateway.port, 9999);
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.storage.database_path, "parley.db");
}

#[test]
fn unknown_keys_are_rejected() {
    let result = load_config_from_str(
        r#"
        [channel]
        verify_tokn = "typo"
        "#,
    );
    assert!(result.is_err(), "typo'd key should fail extraction");
}

#[test]
fn unknown_sections_are_rejected() {
    let result = load_config_from_str(
        r#"
        [presence]
        enabled = true
        "#,
    );
    assert!(result.is_err(), "unknown section should fail extraction");
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parley.toml");
    std::fs::write(
        &path,
        r#"
        [service]
        name = "from-file"
        "#,
    )
    .unwrap();

    let config = load_config_from_path(&path).expect("file config should load");
    assert_eq!(config.service.name, "from-file");
}

#[test]
fn config_serializes_back_to_toml() {
    let config = ParleyConfig::default();
    let rendered = toml::to_string(&config).expect("defaults should serialize");
    assert!(rendered.contains("[service]"));
    assert!(rendered.contains("[storage]"));
}
