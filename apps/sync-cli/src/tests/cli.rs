// Unit tests for command-line parsing

use crate::cli::{Cli, Command, ConfigCommand};

use models::SyncAttachmentState;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};

#[test]
fn given_cli_definition_when_debug_asserted_then_is_consistent() {
    Cli::command().debug_assert();
}

/// **VALUE**: `sync` defaults match the engine's default attachment policy.
///
/// **BUG THIS CATCHES**: Would catch a default that silently skips attachments.
#[test]
fn given_sync_without_options_when_parsed_then_uses_defaults() {
    // WHEN: Parsing a bare sync command
    let cli = Cli::try_parse_from(["odk-sync", "sync", "default"]).unwrap();

    // THEN: Attachments sync, no waiting, one second polling
    match cli.command {
        Command::Sync {
            app_name,
            attachments,
            wait,
            poll_ms,
        } => {
            assert_eq!(app_name, "default");
            assert_eq!(attachments, SyncAttachmentState::Sync);
            assert!(!wait);
            assert_eq!(poll_ms, 1000);
        }
        other => panic!("Expected Sync, got {other:?}"),
    }
    assert!(!cli.json);
    assert!(cli.config_dir.is_none());
}

#[test]
fn given_global_flags_after_subcommand_when_parsed_then_are_applied() {
    let cli = Cli::try_parse_from([
        "odk-sync",
        "reset",
        "survey",
        "--attachments",
        "NONE",
        "--json",
        "--config-dir",
        "/tmp/odk",
        "-v",
    ])
    .unwrap();

    assert!(cli.json);
    assert!(cli.verbose);
    assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/odk")));
    assert!(matches!(
        cli.command,
        Command::Reset {
            attachments: SyncAttachmentState::None,
            ..
        }
    ));
}

/// **VALUE**: Unknown attachment policies are rejected at parse time.
///
/// **BUG THIS CATCHES**: Would catch an unvalidated string reaching the engine
/// as an out-of-range enum value.
#[test]
fn given_unknown_attachment_policy_when_parsed_then_fails() {
    let result = Cli::try_parse_from(["odk-sync", "sync", "default", "--attachments", "some"]);

    assert!(result.is_err());
}

#[test]
fn given_zero_poll_interval_when_parsed_then_fails() {
    let result = Cli::try_parse_from(["odk-sync", "sync", "default", "--wait", "--poll-ms", "0"]);

    assert!(result.is_err());
}

#[test]
fn given_config_commands_when_parsed_then_do_not_need_engine() {
    let init = Cli::try_parse_from(["odk-sync", "config", "init", "--force"]).unwrap();
    let status = Cli::try_parse_from(["odk-sync", "status", "default"]).unwrap();

    assert!(matches!(
        init.command,
        Command::Config(ConfigCommand::Init { force: true })
    ));
    assert!(!init.command.needs_engine());
    assert!(status.command.needs_engine());
}
