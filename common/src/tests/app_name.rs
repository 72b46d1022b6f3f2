use crate::{AppName, CommonError};

/// **VALUE**: Verifies that an empty namespace is rejected as an invalid argument.
///
/// **WHY THIS MATTERS**: Every proxy operation validates the namespace before touching the
/// connection. If empty names slipped through, the engine would receive calls it cannot scope.
///
/// **BUG THIS CATCHES**: Would catch if the emptiness check is removed or inverted.
#[test]
fn given_empty_name_when_parsing_app_name_then_returns_invalid_argument() {
    // GIVEN: Empty and whitespace-only names
    for name in ["", "   ", "\t"] {
        // WHEN: Parsing
        let result = AppName::parse(name);

        // THEN: InvalidArgument
        match result {
            Err(CommonError::InvalidArgument { message, .. }) => {
                assert_eq!(message, "App name cannot be empty");
            }
            Ok(app_name) => panic!("Expected InvalidArgument, got {app_name}"),
        }
    }
}

/// **VALUE**: Verifies that a valid namespace round-trips through `as_str` and Display.
///
/// **WHY THIS MATTERS**: The validated name is forwarded verbatim to the engine.
///
/// **BUG THIS CATCHES**: Would catch trimming or case folding sneaking into the newtype.
#[test]
fn given_valid_name_when_parsing_app_name_then_preserves_value() {
    // GIVEN: A namespace with mixed case
    let name = "Default_App";

    // WHEN: Parsing
    let app_name = AppName::parse(name).unwrap();

    // THEN: Value is untouched
    assert_eq!(app_name.as_str(), name);
    assert_eq!(app_name.to_string(), name);
}

/// **VALUE**: Verifies the per-namespace log target.
///
/// **WHY THIS MATTERS**: Remote failures are logged against the namespace; log filters
/// and file routing depend on this prefix.
///
/// **BUG THIS CATCHES**: Would catch a changed or missing target prefix.
#[test]
fn given_app_name_when_building_log_target_then_prefixes_namespace() {
    // GIVEN: A namespace
    let app_name = AppName::parse("survey").unwrap();

    // WHEN/THEN: Target is prefixed
    assert_eq!(app_name.log_target(), "odk_sync::survey");
}
