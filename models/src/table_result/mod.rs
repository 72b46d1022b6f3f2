//! Per-table outcome of a sync session.

pub mod builder;

use crate::SyncOutcome;

use serde::Serialize;

/// Row counters the engine accumulates for one table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableSyncCounters {
    pub rows_pulled: u64,
    pub rows_pushed: u64,
    pub rows_conflicted: u64,
    pub rows_skipped: u64,
}

/// Outcome for exactly one table within a sync session.
///
/// The table id is fixed at construction. It doubles as the lookup key inside
/// [`SyncOverallResult`](crate::SyncOverallResult), which refuses to store a
/// record under any other key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLevelResult {
    table_id: String,
    sync_outcome: SyncOutcome,
    message: Option<String>,
    counters: TableSyncCounters,
}

impl TableLevelResult {
    /// Fresh record for `table_id` carrying the in-progress outcome.
    pub fn new(table_id: impl Into<String>) -> Self {
        Self {
            table_id: table_id.into(),
            sync_outcome: SyncOutcome::default(),
            message: None,
            counters: TableSyncCounters::default(),
        }
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    pub fn sync_outcome(&self) -> SyncOutcome {
        self.sync_outcome
    }

    pub fn set_sync_outcome(&mut self, outcome: SyncOutcome) {
        self.sync_outcome = outcome;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    pub fn counters(&self) -> &TableSyncCounters {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut TableSyncCounters {
        &mut self.counters
    }
}
