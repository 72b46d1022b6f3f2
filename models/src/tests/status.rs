use crate::{ModelError, SyncAttachmentState, SyncOutcome, SyncProgressState, SyncStatus};

/// **VALUE**: Verifies that attachment policies parse case-insensitively.
///
/// **WHY THIS MATTERS**: The CLI accepts the policy as a free-form argument.
///
/// **BUG THIS CATCHES**: Would catch a parser that only accepts exact lowercase.
#[test]
fn given_policy_names_when_parsed_then_map_to_variants() {
    // GIVEN/WHEN/THEN: Each name maps to its variant
    assert_eq!("sync".parse::<SyncAttachmentState>().unwrap(), SyncAttachmentState::Sync);
    assert_eq!("UPLOAD".parse::<SyncAttachmentState>().unwrap(), SyncAttachmentState::Upload);
    assert_eq!("Download".parse::<SyncAttachmentState>().unwrap(), SyncAttachmentState::Download);
    assert_eq!("none".parse::<SyncAttachmentState>().unwrap(), SyncAttachmentState::None);
}

/// **VALUE**: Verifies that an unknown policy name is a validation error.
///
/// **WHY THIS MATTERS**: Silently defaulting would sync attachments the user meant to skip.
///
/// **BUG THIS CATCHES**: Would catch a catch-all arm that returns a default policy.
#[test]
fn given_unknown_policy_when_parsed_then_validation_error() {
    // GIVEN: A misspelled policy
    let result = "everything".parse::<SyncAttachmentState>();

    // THEN: Validation error naming the input
    match result {
        Err(ModelError::Validation { message, .. }) => assert!(message.contains("everything")),
        other => panic!("Expected Validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies the defaults of the prost-backed enums.
///
/// **WHY THIS MATTERS**: Default values are what a missing wire field decodes to.
///
/// **BUG THIS CATCHES**: Would catch reordered variants shifting the zero value.
#[test]
fn given_enums_when_defaulted_then_first_variant() {
    // GIVEN/WHEN/THEN
    assert_eq!(SyncOutcome::default(), SyncOutcome::Working);
    assert_eq!(SyncStatus::default(), SyncStatus::Init);
    assert_eq!(SyncProgressState::default(), SyncProgressState::Inactive);
    assert_eq!(SyncAttachmentState::default(), SyncAttachmentState::Sync);
}

/// **VALUE**: Verifies which statuses count as an active session.
///
/// **WHY THIS MATTERS**: `odk-sync sync --wait` polls until the status is no longer active.
///
/// **BUG THIS CATCHES**: Would catch a completed status classified as active (infinite wait).
#[test]
fn given_statuses_when_checking_active_then_only_syncing() {
    // GIVEN/WHEN/THEN
    assert!(!SyncStatus::Init.is_active());
    assert!(SyncStatus::Syncing.is_active());
    assert!(!SyncStatus::SyncComplete.is_active());
    assert!(!SyncStatus::NetworkError.is_active());
}
