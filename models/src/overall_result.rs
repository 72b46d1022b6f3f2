//! Aggregate outcome of one sync session.
//!
//! Holds the app-level [`SyncOutcome`] and one [`TableLevelResult`] per table the
//! engine touched. Records are stored unordered; every listing is sorted by table
//! id at read time so enumeration never depends on insertion order.
//!
//! The engine owns and mutates the aggregate while a session runs, then ships it
//! across the process boundary (see [`crate::wire`]). The receiving side treats
//! it as a snapshot.

use crate::error::model_error::ModelError;
use crate::{SyncOutcome, TableLevelResult};

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOverallResult {
    app_outcome: SyncOutcome,
    tables: HashMap<String, TableLevelResult>,
}

impl SyncOverallResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// App-level outcome; [`SyncOutcome::Working`] until set.
    pub fn app_outcome(&self) -> SyncOutcome {
        self.app_outcome
    }

    /// Record the app-level outcome.
    ///
    /// Anything other than [`SyncOutcome::Success`] usually means the engine
    /// abandoned the session before taking table-level actions.
    pub fn set_app_outcome(&mut self, outcome: SyncOutcome) {
        self.app_outcome = outcome;
    }

    /// Get the record for `table_id`, creating it on first access.
    ///
    /// A created record carries `table_id` and the in-progress outcome.
    pub fn fetch_or_create(&mut self, table_id: &str) -> &mut TableLevelResult {
        self.tables
            .entry(table_id.to_string())
            .or_insert_with(|| TableLevelResult::new(table_id))
    }

    /// Store `result` under `table_id`, replacing any existing record.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::TableIdMismatch`] if the record's own table id differs
    /// from `table_id`; the aggregate is left unchanged.
    #[track_caller]
    pub fn set_table_result(
        &mut self,
        table_id: &str,
        result: TableLevelResult,
    ) -> Result<(), ModelError> {
        if result.table_id() != table_id {
            return Err(ModelError::TableIdMismatch {
                key: table_id.to_string(),
                embedded: result.table_id().to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.tables.insert(table_id.to_string(), result);
        Ok(())
    }

    pub fn table_result(&self, table_id: &str) -> Option<&TableLevelResult> {
        self.tables.get(table_id)
    }

    /// Snapshot of all table records sorted by table id.
    ///
    /// This may not cover every table on the server if the session aborted early.
    pub fn table_level_results(&self) -> Vec<TableLevelResult> {
        let mut results: Vec<TableLevelResult> = self.tables.values().cloned().collect();
        results.sort_by(|lhs, rhs| lhs.table_id().cmp(rhs.table_id()));
        results
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[derive(Serialize)]
struct SyncOverallResultView {
    app_outcome: SyncOutcome,
    tables: Vec<TableLevelResult>,
}

impl Serialize for SyncOverallResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SyncOverallResultView {
            app_outcome: self.app_outcome,
            tables: self.table_level_results(),
        }
        .serialize(serializer)
    }
}
