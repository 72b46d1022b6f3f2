use crate::error::{ProxyError, RemoteError};
use crate::proto::EngineErrorCode;

use common::{AppName, ErrorLocation};

use std::panic::Location;

/// **VALUE**: Verifies that an invalid namespace converts into `ProxyError::InvalidArgument`
/// with the original message and location.
///
/// **WHY THIS MATTERS**: Callers match on the proxy error kind to decide whether to retry;
/// a validation failure must never look like a connection problem.
///
/// **BUG THIS CATCHES**: Would catch the `From<CommonError>` impl mapping to the wrong
/// variant or dropping the call-site location.
#[test]
fn given_empty_app_name_when_converted_then_invalid_argument_keeps_location() {
    // GIVEN: A validation failure
    let common = AppName::parse("").expect_err("empty name must fail");
    let expected = common.to_string();

    // WHEN: Converting into a proxy error
    let error = ProxyError::from(common);

    // THEN: Same message and location, InvalidArgument kind
    match &error {
        ProxyError::InvalidArgument { message, .. } => {
            assert_eq!(message, "App name cannot be empty");
        }
        other => panic!("Expected InvalidArgument, got {other:?}"),
    }
    assert!(expected.starts_with("Invalid Argument Error: App name cannot be empty"));
    assert_eq!(error.to_string(), expected);
}

/// **VALUE**: Verifies that a communication error exposes the engine failure untouched.
///
/// **WHY THIS MATTERS**: The engine's error code and message are what a user needs to
/// diagnose a failed sync. Wrapping must not rewrite them.
///
/// **BUG THIS CATCHES**: Would catch `remote()` returning `None` for communication errors
/// or the display dropping the engine message.
#[test]
fn given_engine_failure_when_wrapped_then_remote_returns_identical_error() {
    // GIVEN: An engine failure
    let remote = RemoteError::Engine {
        code: EngineErrorCode::EngineFailure,
        message: "server unreachable".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Wrapped as a communication error
    let error = ProxyError::Communication {
        operation: "get_sync_status",
        source: remote.clone(),
    };

    // THEN: The inner error is identical and visible in the display
    assert_eq!(error.remote(), Some(&remote));
    let display = error.to_string();
    assert!(display.contains("get_sync_status"));
    assert!(display.contains("[engine_failure] server unreachable"));
}

/// **VALUE**: Verifies non-communication errors carry no remote failure.
#[test]
fn given_not_connected_error_when_remote_then_none() {
    // GIVEN: A not-connected error
    let error = ProxyError::NotConnected {
        message: "unbound".to_string(),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN/THEN: No remote error attached
    assert!(error.remote().is_none());
    assert!(error.to_string().starts_with("Not Connected Error: unbound"));
}
