// Unit tests for launcher private functions
// The launch flow itself is exercised through the WebSocket binder in integration_tests/ipc.rs

use crate::ENGINE_BINARY;
use crate::launcher::{build_launch_command, engine_url_regex, parse_announced_endpoint};

/// **VALUE**: Verifies that `build_launch_command()` runs the configured executable in serve mode.
///
/// **WHY THIS MATTERS**: The engine only announces its endpoint when started with `serve`,
/// an auto-selected port and the token the client will present.
///
/// **BUG THIS CATCHES**: Would catch a dropped `--token` argument, which makes every
/// launched engine reject the client that launched it.
#[test]
fn given_executable_when_build_launch_command_called_then_passes_serve_arguments() {
    // GIVEN: Launch parameters
    let token = "launch-token";

    // WHEN: Building the launch command
    let cmd = build_launch_command(ENGINE_BINARY, "127.0.0.1", token);

    // THEN: Program and arguments match the engine's serve contract
    let std_cmd = cmd.as_std();
    assert_eq!(std_cmd.get_program(), ENGINE_BINARY);
    let args: Vec<_> = std_cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        args,
        vec![
            "serve",
            "--port",
            "0",
            "--hostname",
            "127.0.0.1",
            "--token",
            token
        ]
    );
}

/// **VALUE**: Tests that an announced `ws://host:port` line yields host and port.
///
/// **WHY THIS MATTERS**: Without the announced port the client has nowhere to connect
/// after launching the engine.
///
/// **BUG THIS CATCHES**: Would catch a regex change that breaks the `host`/`port` capture
/// groups or stops matching lines with surrounding text.
#[test]
fn given_announcement_line_when_parsed_then_extracts_host_and_port() {
    // GIVEN: Engine output announcing its endpoint
    let re = engine_url_regex().expect("pattern should compile");
    let line = "odk-sync-engine listening on ws://127.0.0.1:52011 (pid 42)";

    // WHEN: Parsing the line
    let endpoint = parse_announced_endpoint(re, line).expect("parse should not fail");

    // THEN: Host and port are extracted
    assert_eq!(endpoint, Some(("127.0.0.1".to_string(), 52011)));
}

/// **VALUE**: Tests that unrelated or malformed output is skipped rather than misread.
///
/// **WHY THIS MATTERS**: Engines print banners and log lines before announcing. Matching
/// any of those would send the client to a wrong endpoint.
///
/// **BUG THIS CATCHES**: Would catch a regex that matches `http://` URLs, URLs without a
/// port, or ports that overflow `u16`.
#[test]
fn given_non_announcement_lines_when_parsed_then_returns_none() {
    // GIVEN: Lines that are not valid announcements
    let re = engine_url_regex().expect("pattern should compile");
    let lines = [
        "starting sync engine",
        "http://127.0.0.1:8080",
        "ws://localhost",
        "127.0.0.1:8080",
        "ws://127.0.0.1:70000",
    ];

    // WHEN/THEN: None of them yields an endpoint
    for line in lines {
        let endpoint = parse_announced_endpoint(re, line).expect("parse should not fail");
        assert_eq!(endpoint, None, "Should not parse: {line}");
    }
}
