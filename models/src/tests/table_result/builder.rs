use crate::{ModelError, SyncOutcome, TableLevelResultBuilder, TableSyncCounters};

/// **VALUE**: Verifies that the builder rejects a record without a table id.
///
/// **WHY THIS MATTERS**: The table id is the aggregate's lookup key. A record without one
/// cannot be stored or listed deterministically.
///
/// **BUG THIS CATCHES**: Would catch if the required-field check is removed.
#[test]
fn given_missing_table_id_when_building_then_returns_validation_error() {
    // GIVEN: Builder without a table id
    let builder = TableLevelResultBuilder::default().with_outcome(SyncOutcome::Success);

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Table id is required");
        }
        other => panic!("Expected Validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that the builder rejects an empty table id.
///
/// **WHY THIS MATTERS**: The wire decoder builds records through this builder; an empty id
/// from a misbehaving engine must not enter the aggregate.
///
/// **BUG THIS CATCHES**: Would catch if emptiness validation is dropped during refactoring.
#[test]
fn given_empty_table_id_when_building_then_returns_validation_error() {
    // GIVEN: Builder with an empty table id
    let builder = TableLevelResultBuilder::default().with_table_id("");

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Validation error
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Table id cannot be empty");
        }
        other => panic!("Expected Validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that every supplied field lands in the built record.
///
/// **WHY THIS MATTERS**: Engines report diagnostics and counters through the builder.
///
/// **BUG THIS CATCHES**: Would catch a field silently dropped by `build()`.
#[test]
fn given_all_fields_when_building_then_record_carries_them() {
    // GIVEN: Fully populated builder
    let counters = TableSyncCounters {
        rows_pulled: 12,
        rows_pushed: 3,
        rows_conflicted: 1,
        rows_skipped: 0,
    };
    let builder = TableLevelResultBuilder::default()
        .with_table_id("households")
        .with_outcome(SyncOutcome::TableContainsConflicts)
        .with_message("1 row needs resolution")
        .with_counters(counters);

    // WHEN: Building
    let result = builder.build().unwrap();

    // THEN: All fields preserved
    assert_eq!(result.table_id(), "households");
    assert_eq!(result.sync_outcome(), SyncOutcome::TableContainsConflicts);
    assert_eq!(result.message(), Some("1 row needs resolution"));
    assert_eq!(result.counters(), &counters);
}

/// **VALUE**: Verifies that the outcome defaults to the in-progress marker.
///
/// **WHY THIS MATTERS**: A table record the engine has not finished must not read as Success.
///
/// **BUG THIS CATCHES**: Would catch a default outcome other than Working.
#[test]
fn given_no_outcome_when_building_then_defaults_to_working() {
    // GIVEN: Builder with only a table id
    let builder = TableLevelResultBuilder::default().with_table_id("visits");

    // WHEN: Building
    let result = builder.build().unwrap();

    // THEN: Working, no message
    assert_eq!(result.sync_outcome(), SyncOutcome::Working);
    assert_eq!(result.message(), None);
}
