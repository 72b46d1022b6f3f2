// Unit tests for command output rendering

use crate::output::CommandOutput;

use models::{
    SyncAttachmentState, SyncOutcome, SyncOverallResult, SyncStatus, TableLevelResultBuilder,
    TableSyncCounters,
};
use sync_client_core::config::SyncClientConfig;

use std::path::PathBuf;

fn sample_result() -> SyncOverallResult {
    let mut result = SyncOverallResult::new();
    result.set_app_outcome(SyncOutcome::Failure);
    let failed = TableLevelResultBuilder::default()
        .with_table_id("visits")
        .with_outcome(SyncOutcome::TableContainsConflicts)
        .with_message("2 rows in conflict")
        .with_counters(TableSyncCounters {
            rows_pulled: 10,
            rows_pushed: 3,
            rows_conflicted: 2,
            rows_skipped: 0,
        })
        .build()
        .unwrap();
    result.set_table_result("visits", failed).unwrap();
    result
        .fetch_or_create("households")
        .set_sync_outcome(SyncOutcome::Success);
    result
}

/// **VALUE**: The result table lists tables in id order with their outcomes.
///
/// **BUG THIS CATCHES**: Would catch rendering from the unordered map, which
/// makes output differ between runs.
#[test]
fn given_result_output_when_displayed_then_tables_are_sorted() {
    // GIVEN: A result with two tables inserted out of order
    let output = CommandOutput::Result {
        app_name: "default".to_string(),
        result: sample_result(),
    };

    // WHEN: Rendering for humans
    let text = output.render(false).unwrap();

    // THEN: Outcome header, then households before visits
    assert!(text.starts_with("default:\noutcome: failure"));
    let households = text.find("households").unwrap();
    let visits = text.find("visits").unwrap();
    assert!(households < visits);
    assert!(text.contains("table_contains_conflicts"));
    assert!(text.contains("2 rows in conflict"));
}

#[test]
fn given_empty_result_when_displayed_then_says_no_tables() {
    let output = CommandOutput::Result {
        app_name: "default".to_string(),
        result: SyncOverallResult::new(),
    };

    let text = output.to_string();

    assert!(text.contains("outcome: working"));
    assert!(text.ends_with("(no tables)"));
}

/// **VALUE**: JSON output is tagged with the command and uses snake_case enums.
///
/// **WHY THIS MATTERS**: Scripts consume `--json`; the tag tells them which
/// shape to expect.
#[test]
fn given_status_output_when_rendered_as_json_then_is_tagged() {
    let output = CommandOutput::Status {
        app_name: "default".to_string(),
        status: SyncStatus::SyncCompletePendingAttachments,
    };

    let json: serde_json::Value = serde_json::from_str(&output.render(true).unwrap()).unwrap();

    assert_eq!(json["command"], "status");
    assert_eq!(json["app_name"], "default");
    assert_eq!(json["status"], "sync_complete_pending_attachments");
}

#[test]
fn given_sync_without_wait_when_rendered_as_json_then_result_is_omitted() {
    let output = CommandOutput::Sync {
        app_name: "default".to_string(),
        attachments: SyncAttachmentState::Upload,
        accepted: false,
        result: None,
    };

    let json: serde_json::Value = serde_json::from_str(&output.render(true).unwrap()).unwrap();

    assert_eq!(json["command"], "sync");
    assert_eq!(json["accepted"], false);
    assert_eq!(json["attachments"], "upload");
    assert!(json.get("result").is_none());
    assert_eq!(
        output.to_string(),
        "default: sync refused (attachments: upload)"
    );
}

#[test]
fn given_sync_with_result_when_rendered_as_json_then_tables_are_listed() {
    let output = CommandOutput::Sync {
        app_name: "default".to_string(),
        attachments: SyncAttachmentState::Sync,
        accepted: true,
        result: Some(sample_result()),
    };

    let json: serde_json::Value = serde_json::from_str(&output.render(true).unwrap()).unwrap();

    assert_eq!(json["result"]["app_outcome"], "failure");
    assert_eq!(json["result"]["tables"][0]["table_id"], "households");
    assert_eq!(json["result"]["tables"][1]["counters"]["rows_pulled"], 10);
}

/// **VALUE**: Printing the config never shows the engine token.
///
/// **BUG THIS CATCHES**: Would catch `config show` leaking the shared secret
/// into terminals and logs.
#[test]
fn given_config_with_token_when_rendered_then_token_is_redacted() {
    let mut config = SyncClientConfig::default();
    config.engine.auth_token = Some("super-secret".to_string());

    let output = CommandOutput::config(PathBuf::from("/tmp/sync_client.json"), config);

    let text = output.to_string();
    let json = output.render(true).unwrap();
    assert!(!text.contains("super-secret"));
    assert!(!json.contains("super-secret"));
    assert!(text.starts_with("# /tmp/sync_client.json"));
}

#[test]
fn given_empty_update_message_when_displayed_then_placeholder_is_shown() {
    let output = CommandOutput::Message {
        app_name: "default".to_string(),
        message: String::new(),
    };

    assert_eq!(output.to_string(), "default: (no message)");
}
