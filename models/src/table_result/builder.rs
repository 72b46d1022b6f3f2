use crate::error::model_error::ModelError;
use crate::{SyncOutcome, TableLevelResult, TableSyncCounters};

use common::ErrorLocation;

use std::panic::Location;

/// Builder for creating validated TableLevelResult instances.
///
/// Used by engines that assemble a finished table record in one go, and by the
/// wire decoder, which must reject records that arrive without an identifier.
#[derive(Debug, Default)]
pub struct TableLevelResultBuilder {
    table_id: Option<String>,
    sync_outcome: Option<SyncOutcome>,
    message: Option<String>,
    counters: TableSyncCounters,
}

impl TableLevelResultBuilder {
    pub fn with_table_id(mut self, table_id: impl Into<String>) -> Self {
        self.table_id = Some(table_id.into());
        self
    }

    pub fn with_outcome(mut self, outcome: SyncOutcome) -> Self {
        self.sync_outcome = Some(outcome);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_counters(mut self, counters: TableSyncCounters) -> Self {
        self.counters = counters;
        self
    }

    /// Build the TableLevelResult with validation.
    ///
    /// The outcome defaults to [`SyncOutcome::Working`] when not provided.
    #[track_caller]
    pub fn build(self) -> Result<TableLevelResult, ModelError> {
        let table_id = self.table_id.ok_or_else(|| ModelError::Validation {
            message: String::from("Table id is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if table_id.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Table id cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut result = TableLevelResult::new(table_id);
        result.set_sync_outcome(self.sync_outcome.unwrap_or_default());
        if let Some(message) = self.message {
            result.set_message(message);
        }
        *result.counters_mut() = self.counters;

        Ok(result)
    }
}
