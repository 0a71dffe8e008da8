// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Courier configuration system.

use courier_config::diagnostic::ConfigError;
use courier_config::model::CommitMode;
use courier_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_courier_config() {
    let toml = r#"
[storage]
database_path = "/tmp/queue.db"
wal_mode = false
busy_timeout_ms = 250

[queue]
batch_size = 50
commit_mode = "per-item"

[process]
memory_limit_bytes = 536870912
time_limit_secs = 60
db_caching = false

[sms]
default_session = "default-session"

[dispatch]
endpoint = "https://relay.internal"
timeout_secs = 5
api_key = "relay-token"

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.storage.database_path, "/tmp/queue.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.storage.busy_timeout_ms, 250);
    assert_eq!(config.queue.batch_size, 50);
    assert_eq!(config.queue.commit_mode, CommitMode::PerItem);
    assert_eq!(config.process.memory_limit_bytes, 536_870_912);
    assert_eq!(config.process.time_limit_secs, 60);
    assert!(!config.process.db_caching);
    assert_eq!(config.sms.default_session, "default-session");
    assert_eq!(config.dispatch.endpoint, "https://relay.internal");
    assert_eq!(config.dispatch.api_key.as_deref(), Some("relay-token"));
    assert_eq!(config.log.level, "debug");
}

/// Missing sections fall back to the worker defaults.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.queue.batch_size, 300);
    assert_eq!(config.queue.commit_mode, CommitMode::AllOrNothing);
    assert_eq!(config.process.memory_limit_bytes, 2_800_000_000);
    assert_eq!(config.process.time_limit_secs, 3400);
    assert!(config.process.db_caching);
    assert!(config.storage.wal_mode);
    assert!(config.sms.default_session.is_empty());
    assert!(config.dispatch.endpoint.is_empty());
    assert!(config.dispatch.api_key.is_none());
    assert_eq!(config.log.level, "info");
}

/// A misspelled key is rejected with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[queue]
bach_size = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "bach_size");
            assert_eq!(suggestion.as_deref(), Some("batch_size"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// An unknown commit mode is a type-level error, not a silent default.
#[test]
fn unknown_commit_mode_is_rejected() {
    let toml = r#"
[queue]
commit_mode = "eventually"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Wrong value types are reported as errors.
#[test]
fn wrong_type_is_rejected() {
    let toml = r#"
[queue]
batch_size = "lots"
"#;
    let errors = load_and_validate_str(toml).expect_err("string batch size should fail");
    assert!(!errors.is_empty());
}

/// Semantic validation runs after deserialization.
#[test]
fn validation_errors_surface_from_str_loader() {
    let toml = r#"
[queue]
batch_size = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero batch should fail validation");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

/// `COURIER_*` variables override file values, including underscore keys.
#[test]
fn env_vars_override_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "worker.toml",
            r#"
[queue]
batch_size = 25

[sms]
default_session = "from-file"
"#,
        )?;
        jail.set_env("COURIER_QUEUE_BATCH_SIZE", "75");
        jail.set_env("COURIER_SMS_DEFAULT_SESSION", "from-env");

        let config = load_and_validate_path(std::path::Path::new("worker.toml"))
            .map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.queue.batch_size, 75);
        assert_eq!(config.sms.default_session, "from-env");
        Ok(())
    });
}

/// An explicit config path that does not exist is an error, not defaults.
#[test]
fn missing_explicit_file_is_rejected() {
    figment::Jail::expect_with(|_jail| {
        let errors = load_and_validate_path(std::path::Path::new("absent.toml"))
            .expect_err("a named config file must exist");
        assert!(!errors.is_empty());
        assert!(matches!(errors[0], ConfigError::Other(_)));
        Ok(())
    });
}
