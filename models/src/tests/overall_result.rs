use crate::{ModelError, SyncOutcome, SyncOverallResult, TableLevelResult};

/// **VALUE**: Verifies that a new aggregate starts in progress with no tables.
///
/// **WHY THIS MATTERS**: The engine creates the aggregate at session start. Reading it before
/// the engine records anything must not look like a finished session.
///
/// **BUG THIS CATCHES**: Would catch a changed default app outcome.
#[test]
fn given_new_aggregate_when_reading_then_working_and_empty() {
    // GIVEN/WHEN: A fresh aggregate
    let result = SyncOverallResult::new();

    // THEN: In progress, no tables
    assert_eq!(result.app_outcome(), SyncOutcome::Working);
    assert!(result.is_empty());
    assert!(result.table_level_results().is_empty());
}

/// **VALUE**: Verifies the app-level accessor pair.
///
/// **WHY THIS MATTERS**: The app outcome decides whether callers look at table results at all.
///
/// **BUG THIS CATCHES**: Would catch a setter that writes to the wrong field.
#[test]
fn given_app_outcome_set_when_reading_then_returns_it() {
    // GIVEN: An aggregate
    let mut result = SyncOverallResult::new();

    // WHEN: Setting the outcome
    result.set_app_outcome(SyncOutcome::AccessDenied);

    // THEN: Reads back
    assert_eq!(result.app_outcome(), SyncOutcome::AccessDenied);
}

/// **VALUE**: Verifies get-or-create idempotence.
///
/// **WHY THIS MATTERS**: The engine calls `fetch_or_create` from many places during a session.
/// A second call must return the same record, not a fresh one that discards earlier updates.
///
/// **BUG THIS CATCHES**: Would catch if `fetch_or_create` inserts unconditionally.
#[test]
fn given_same_table_id_when_fetching_twice_then_returns_same_record() {
    // GIVEN: An aggregate with one fetched and modified record
    let mut result = SyncOverallResult::new();
    result
        .fetch_or_create("census")
        .set_sync_outcome(SyncOutcome::Success);
    let first = result.fetch_or_create("census").clone();

    // WHEN: Fetching again
    let second = result.fetch_or_create("census").clone();

    // THEN: Identical records, only one stored
    assert_eq!(first, second);
    assert_eq!(second.sync_outcome(), SyncOutcome::Success);
    assert_eq!(result.table_count(), 1);
}

/// **VALUE**: Verifies that a created record is seeded with its key and a neutral outcome.
///
/// **WHY THIS MATTERS**: The embedded id must match the key; the outcome must not claim success.
///
/// **BUG THIS CATCHES**: Would catch records created with an empty id or a non-neutral outcome.
#[test]
fn given_unknown_table_id_when_fetching_then_creates_seeded_record() {
    // GIVEN: Empty aggregate
    let mut result = SyncOverallResult::new();

    // WHEN: Fetching an unknown table
    let record = result.fetch_or_create("plots");

    // THEN: Seeded with the id and Working
    assert_eq!(record.table_id(), "plots");
    assert_eq!(record.sync_outcome(), SyncOutcome::Working);
    assert_eq!(record.message(), None);
}

/// **VALUE**: Verifies that listing is sorted regardless of insertion order.
///
/// **WHY THIS MATTERS**: Callers display and compare results table by table; the order must be
/// deterministic even though storage is an unordered map.
///
/// **BUG THIS CATCHES**: Would catch a listing that leaks hash order.
#[test]
fn given_tables_inserted_out_of_order_when_listing_then_sorted_by_table_id() {
    // GIVEN: Tables inserted zebra, apple, mango
    let mut result = SyncOverallResult::new();
    for table_id in ["zebra", "apple", "mango"] {
        result.fetch_or_create(table_id);
    }

    // WHEN: Listing
    let listed: Vec<String> = result
        .table_level_results()
        .iter()
        .map(|table| table.table_id().to_string())
        .collect();

    // THEN: Ordinal order
    assert_eq!(listed, vec!["apple", "mango", "zebra"]);
}

/// **VALUE**: Verifies ordinal (byte-wise) comparison, not case-insensitive collation.
///
/// **WHY THIS MATTERS**: The engine and every client must agree on one ordering.
///
/// **BUG THIS CATCHES**: Would catch a switch to locale or case-folded sorting.
#[test]
fn given_mixed_case_table_ids_when_listing_then_uses_ordinal_order() {
    // GIVEN: Upper and lower case ids
    let mut result = SyncOverallResult::new();
    for table_id in ["beta", "Alpha", "alpha"] {
        result.fetch_or_create(table_id);
    }

    // WHEN: Listing
    let listed: Vec<String> = result
        .table_level_results()
        .iter()
        .map(|table| table.table_id().to_string())
        .collect();

    // THEN: Uppercase sorts first
    assert_eq!(listed, vec!["Alpha", "alpha", "beta"]);
}

/// **VALUE**: Verifies that the listing is a copy.
///
/// **WHY THIS MATTERS**: Callers treat the listing as a snapshot; editing it must not leak back.
///
/// **BUG THIS CATCHES**: Would catch a listing that hands out references into storage.
#[test]
fn given_listing_when_mutated_then_aggregate_unchanged() {
    // GIVEN: One table
    let mut result = SyncOverallResult::new();
    result.fetch_or_create("t1");

    // WHEN: Mutating the snapshot
    let mut listed = result.table_level_results();
    listed[0].set_sync_outcome(SyncOutcome::Failure);
    listed.clear();

    // THEN: Aggregate untouched
    assert_eq!(result.table_count(), 1);
    assert_eq!(
        result.table_result("t1").unwrap().sync_outcome(),
        SyncOutcome::Working
    );
}

/// **VALUE**: Verifies that `set_table_result` overwrites an existing record.
///
/// **WHY THIS MATTERS**: Engines replace provisional records with final ones.
///
/// **BUG THIS CATCHES**: Would catch an insert-if-absent implementation.
#[test]
fn given_existing_record_when_setting_table_result_then_overwrites() {
    // GIVEN: A provisional record
    let mut result = SyncOverallResult::new();
    result.fetch_or_create("t1").set_message("provisional");

    // WHEN: Setting a final record
    let mut replacement = TableLevelResult::new("t1");
    replacement.set_sync_outcome(SyncOutcome::Success);
    result.set_table_result("t1", replacement).unwrap();

    // THEN: Replaced entirely
    let stored = result.table_result("t1").unwrap();
    assert_eq!(stored.sync_outcome(), SyncOutcome::Success);
    assert_eq!(stored.message(), None);
}

/// **VALUE**: Verifies the identity guard between key and embedded table id.
///
/// **WHY THIS MATTERS**: A record stored under a foreign key would list under one name and
/// describe another table.
///
/// **BUG THIS CATCHES**: Would catch removal of the mismatch check.
#[test]
fn given_mismatched_table_id_when_setting_table_result_then_rejected() {
    // GIVEN: A record for t2
    let mut result = SyncOverallResult::new();
    let record = TableLevelResult::new("t2");

    // WHEN: Storing it under t1
    let outcome = result.set_table_result("t1", record);

    // THEN: Rejected and aggregate unchanged
    match outcome {
        Err(ModelError::TableIdMismatch { key, embedded, .. }) => {
            assert_eq!(key, "t1");
            assert_eq!(embedded, "t2");
        }
        other => panic!("Expected TableIdMismatch, got {other:?}"),
    }
    assert!(result.is_empty());
}

/// **VALUE**: Verifies JSON rendering lists tables sorted under `tables`.
///
/// **WHY THIS MATTERS**: The CLI prints results as JSON; consumers rely on stable ordering.
///
/// **BUG THIS CATCHES**: Would catch serialization of the raw map (unordered).
#[test]
fn given_aggregate_when_serialized_then_tables_are_sorted() {
    // GIVEN: Two tables inserted in reverse order
    let mut result = SyncOverallResult::new();
    result.set_app_outcome(SyncOutcome::Success);
    result.fetch_or_create("b");
    result.fetch_or_create("a");

    // WHEN: Serializing
    let json = serde_json::to_value(&result).unwrap();

    // THEN: Sorted list with snake_case outcome
    assert_eq!(json["app_outcome"], "success");
    assert_eq!(json["tables"][0]["table_id"], "a");
    assert_eq!(json["tables"][1]["table_id"], "b");
}
