use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures the caller's file and line.
///
/// **WHY THIS MATTERS**: Every error in the sync client embeds an ErrorLocation. When a
/// bind or remote call fails in the field, this is the only pointer back to the code path.
///
/// **BUG THIS CATCHES**: Would catch if `Location::caller()` stops being propagated or if
/// the file/line fields are swapped or dropped.
#[test]
fn given_caller_location_when_error_location_created_then_captures_position() {
    // GIVEN: A helper that records its caller
    #[track_caller]
    fn capture() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Capturing from two consecutive lines
    let first = capture();
    let second = capture();

    // THEN: Same file, consecutive lines, real column
    assert!(first.file.ends_with("error_location.rs"));
    assert_eq!(first.line + 1, second.line, "Lines should be sequential");
    assert!(first.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies the bracketed `[file:line:column]` Display format.
///
/// **WHY THIS MATTERS**: Error messages are written to the per-namespace diagnostic log and
/// the CLI output. Operators grep for this format.
///
/// **BUG THIS CATCHES**: Would catch a Display change that drops brackets or a component.
#[test]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/proxy/mod.rs",
        line: 42,
        column: 7,
    };

    // WHEN: Formatting
    let formatted = location.to_string();

    // THEN: Exact bracketed form
    assert_eq!(formatted, "[src/proxy/mod.rs:42:7]");
}

/// **VALUE**: Verifies ErrorLocation serializes as a plain object.
///
/// **WHY THIS MATTERS**: The CLI prints errors as JSON with `--json`; locations must survive.
///
/// **BUG THIS CATCHES**: Would catch removal of the Serialize derive or renamed fields.
#[test]
fn given_error_location_when_serialized_then_contains_all_fields() {
    // GIVEN: A location
    let location = ErrorLocation {
        file: "lib.rs",
        line: 3,
        column: 9,
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_string(&location).unwrap();

    // THEN: All fields present
    assert_eq!(json, r#"{"file":"lib.rs","line":3,"column":9}"#);
}
