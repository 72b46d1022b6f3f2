// Unit tests for CliError conversions, serialization and exit codes

use crate::error::CliError;

use common::{CommonError, ErrorLocation};
use sync_client_core::error::{ConfigError, ProxyError, RemoteError};

use std::panic::Location;

/// **VALUE**: Errors serialize with their variant name for `--json` output.
///
/// **BUG THIS CATCHES**: Would catch removal of `#[derive(Serialize)]` or a
/// change to the tag layout that scripts parse.
#[test]
fn given_cli_error_when_serialized_then_contains_type_and_message() {
    // GIVEN: A NotConnected error
    let err = CliError::NotConnected {
        message: String::from("engine unreachable"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json: serde_json::Value = serde_json::to_value(&err).unwrap();

    // THEN: The tag and message are present
    assert_eq!(json["type"], "NotConnected");
    assert_eq!(json["data"]["message"], "engine unreachable");
    assert!(json["data"]["location"].is_object());
}

/// **VALUE**: Proxy errors keep their category when crossing into the CLI.
///
/// **WHY THIS MATTERS**: Exit codes are derived from the category. A bad
/// namespace must not look like an engine failure to a calling script.
#[test]
fn given_proxy_errors_when_converted_then_categories_are_preserved() {
    let invalid = ProxyError::from(CommonError::InvalidArgument {
        message: "empty app name".to_string(),
        location: ErrorLocation::from(Location::caller()),
    });
    let not_connected = ProxyError::NotConnected {
        message: "Unbound".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };
    let communication = ProxyError::Communication {
        operation: "get_sync_status",
        source: RemoteError::Disconnected {
            message: "socket closed".to_string(),
            location: ErrorLocation::from(Location::caller()),
        },
    };

    assert!(matches!(CliError::from(invalid), CliError::InvalidArgument { .. }));
    assert!(matches!(CliError::from(not_connected), CliError::NotConnected { .. }));
    match CliError::from(communication) {
        CliError::Core { message, .. } => assert!(message.contains("get_sync_status")),
        other => panic!("Expected Core, got {other:?}"),
    }
}

#[test]
fn given_each_variant_when_exit_code_requested_then_codes_are_distinct() {
    let location = ErrorLocation::from(Location::caller());
    let message = String::new();

    let codes = [
        CliError::Cli { message: message.clone(), location }.exit_code(),
        CliError::InvalidArgument { message: message.clone(), location }.exit_code(),
        CliError::NotConnected { message: message.clone(), location }.exit_code(),
        CliError::Config { message, location }.exit_code(),
    ];

    assert_eq!(codes, [1, 2, 3, 4]);
}

#[test]
fn given_config_error_when_converted_then_message_is_kept() {
    let err = CliError::from(ConfigError::DirectoryNotFound {
        location: ErrorLocation::from(Location::caller()),
    });

    match err {
        CliError::Config { message, .. } => assert!(!message.is_empty()),
        other => panic!("Expected Config, got {other:?}"),
    }
}
