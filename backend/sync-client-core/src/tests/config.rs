use crate::config::SyncClientConfig;
use crate::error::ConfigError;
use crate::{ENGINE_HOSTNAME, SYNC_SERVICE_CLASS, SYNC_SERVICE_PACKAGE};

use std::fs;

use tempfile::TempDir;

/// **VALUE**: Verifies that a missing config file yields defaults instead of an error.
///
/// **WHY THIS MATTERS**: First run has no config file; the client must still bind to the
/// standard sync service on localhost.
///
/// **BUG THIS CATCHES**: Would catch `load()` returning a read error for a missing file.
#[test]
fn given_missing_file_when_load_then_returns_defaults() {
    // GIVEN: An empty config directory
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Loading config
    let config = SyncClientConfig::load(dir.path()).expect("load should succeed");

    // THEN: Defaults point at the standard service
    assert_eq!(config, SyncClientConfig::default());
    assert_eq!(config.service.package, SYNC_SERVICE_PACKAGE);
    assert_eq!(config.service.class_name, SYNC_SERVICE_CLASS);
    assert_eq!(config.engine.host, ENGINE_HOSTNAME);
    assert!(config.engine.auto_create);
    assert_eq!(config.engine.port, None);
}

/// **VALUE**: Verifies that saved config loads back unchanged and leaves no temp file.
///
/// **WHY THIS MATTERS**: Save goes through a temp file and rename; a leftover temp file
/// means the rename step was skipped and the real file may be stale.
///
/// **BUG THIS CATCHES**: Would catch field renames that break serde round trips, or
/// writing to the wrong file name.
#[test]
fn given_saved_config_when_load_then_matches_and_temp_file_removed() {
    // GIVEN: A customized config saved to disk
    let dir = TempDir::new().expect("temp dir");
    let mut config = SyncClientConfig::default();
    config.engine.port = Some(52011);
    config.engine.auth_token = Some("secret".to_string());
    config.engine.auto_create = false;
    config.save(dir.path()).expect("save should succeed");

    // WHEN: Loading it back
    let loaded = SyncClientConfig::load(dir.path()).expect("load should succeed");

    // THEN: Same values, no temp file
    assert_eq!(loaded, config);
    assert!(dir.path().join("sync_client.json").exists());
    assert!(!dir.path().join("sync_client.json.tmp").exists());
}

/// **VALUE**: Verifies that partial JSON fills the missing fields with defaults.
///
/// **WHY THIS MATTERS**: Users hand-edit the file and usually only set the engine port.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` that turns a
/// one-line config into a parse error.
#[test]
fn given_partial_json_when_load_then_missing_fields_defaulted() {
    // GIVEN: A config file that only sets the port
    let dir = TempDir::new().expect("temp dir");
    fs::write(
        dir.path().join("sync_client.json"),
        r#"{ "engine": { "port": 4100 } }"#,
    )
    .expect("write config");

    // WHEN: Loading
    let config = SyncClientConfig::load(dir.path()).expect("load should succeed");

    // THEN: Port is taken from the file, everything else defaulted
    assert_eq!(config.engine.port, Some(4100));
    assert_eq!(config.engine.host, ENGINE_HOSTNAME);
    assert_eq!(config.version, 1);
    assert_eq!(config.service.package, SYNC_SERVICE_PACKAGE);
}

/// **VALUE**: Verifies that malformed JSON is reported as a parse error.
///
/// **WHY THIS MATTERS**: Silently falling back to defaults would hide a broken config and
/// connect to the wrong engine.
///
/// **BUG THIS CATCHES**: Would catch parse failures being swallowed.
#[test]
fn given_malformed_json_when_load_then_returns_parse_error() {
    // GIVEN: A corrupted config file
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("sync_client.json"), "{ not json").expect("write config");

    // WHEN: Loading
    let result = SyncClientConfig::load(dir.path());

    // THEN: Parse error
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

/// **VALUE**: Verifies each validation rule rejects its invalid value.
///
/// **WHY THIS MATTERS**: An empty package, port 0 or zero timeout can only produce binds
/// that never connect; failing at load time gives the user a clear message instead.
///
/// **BUG THIS CATCHES**: Would catch a validation rule that was removed or inverted.
#[test]
fn given_invalid_values_when_validate_then_returns_validation_error() {
    // GIVEN: Configs with one invalid value each
    let mut cases: Vec<(&str, SyncClientConfig)> = Vec::new();

    let mut config = SyncClientConfig::default();
    config.version = 0;
    cases.push(("version 0", config));

    let mut config = SyncClientConfig::default();
    config.service.package = "  ".to_string();
    cases.push(("blank package", config));

    let mut config = SyncClientConfig::default();
    config.service.class_name = String::new();
    cases.push(("empty class name", config));

    let mut config = SyncClientConfig::default();
    config.engine.port = Some(0);
    cases.push(("port 0", config));

    let mut config = SyncClientConfig::default();
    config.engine.auth_token = Some(String::new());
    cases.push(("empty token", config));

    let mut config = SyncClientConfig::default();
    config.engine.connect_timeout_secs = 0;
    cases.push(("zero timeout", config));

    let mut config = SyncClientConfig::default();
    config.engine.connect_timeout_secs = 301;
    cases.push(("timeout too long", config));

    // WHEN/THEN: Each one fails validation
    for (name, config) in cases {
        assert!(
            matches!(config.validate(), Err(ConfigError::Validation { .. })),
            "Should reject {name}"
        );
    }
}

/// **VALUE**: Verifies that save refuses an invalid config and writes nothing.
///
/// **BUG THIS CATCHES**: Would catch validation running after the write.
#[test]
fn given_invalid_config_when_save_then_no_file_written() {
    // GIVEN: An invalid config
    let dir = TempDir::new().expect("temp dir");
    let mut config = SyncClientConfig::default();
    config.engine.host = String::new();

    // WHEN: Saving
    let result = config.save(dir.path());

    // THEN: Validation error and no file
    assert!(matches!(result, Err(ConfigError::Validation { .. })));
    assert!(!dir.path().join("sync_client.json").exists());
}

/// **VALUE**: Verifies the bind request mirrors the configured service and auto-create flag.
#[test]
fn given_config_when_bind_request_then_copies_service_identity() {
    // GIVEN: A config with a custom service and auto-create off
    let mut config = SyncClientConfig::default();
    config.service.package = "org.example.sync".to_string();
    config.engine.auto_create = false;

    // WHEN: Building the bind request
    let request = config.bind_request();

    // THEN: Fields are copied over
    assert_eq!(request.package, "org.example.sync");
    assert_eq!(request.class_name, SYNC_SERVICE_CLASS);
    assert!(!request.auto_create);
}
