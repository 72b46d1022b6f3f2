//! Protobuf wire forms of the sync models.
//!
//! The aggregate travels as `[app_outcome][table_count][(table_id, record) x N]`.
//! `table_count` is written explicitly so a truncated or padded payload is caught
//! as a format error instead of silently producing a partial result.

use crate::error::model_error::ModelError;
use crate::{
    SyncOutcome, SyncOverallResult, TableLevelResult, TableLevelResultBuilder, TableSyncCounters,
};

use common::ErrorLocation;

use std::collections::HashSet;
use std::panic::Location;

use prost::Message as ProstMessage;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireTableLevelResult {
    #[prost(string, tag = "1")]
    pub table_id: String,
    #[prost(enumeration = "SyncOutcome", tag = "2")]
    pub sync_outcome: i32,
    #[prost(string, optional, tag = "3")]
    pub message: Option<String>,
    #[prost(uint64, tag = "4")]
    pub rows_pulled: u64,
    #[prost(uint64, tag = "5")]
    pub rows_pushed: u64,
    #[prost(uint64, tag = "6")]
    pub rows_conflicted: u64,
    #[prost(uint64, tag = "7")]
    pub rows_skipped: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireTableEntry {
    #[prost(string, tag = "1")]
    pub table_id: String,
    #[prost(message, optional, tag = "2")]
    pub result: Option<WireTableLevelResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WireSyncOverallResult {
    #[prost(enumeration = "SyncOutcome", tag = "1")]
    pub app_outcome: i32,
    #[prost(uint64, tag = "2")]
    pub table_count: u64,
    #[prost(message, repeated, tag = "3")]
    pub tables: Vec<WireTableEntry>,
}

/// Convert a raw protobuf enum value into its typed form.
///
/// # Errors
///
/// Returns [`ModelError::Format`] naming `kind` when the value is unknown.
#[track_caller]
pub fn enum_from_wire<T>(value: i32, kind: &str) -> Result<T, ModelError>
where
    T: TryFrom<i32, Error = prost::UnknownEnumValue>,
{
    T::try_from(value).map_err(|e| ModelError::Format {
        message: format!("Invalid {kind} value: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

impl From<&TableLevelResult> for WireTableLevelResult {
    fn from(result: &TableLevelResult) -> Self {
        let counters = result.counters();
        Self {
            table_id: result.table_id().to_string(),
            sync_outcome: result.sync_outcome().into(),
            message: result.message().map(str::to_string),
            rows_pulled: counters.rows_pulled,
            rows_pushed: counters.rows_pushed,
            rows_conflicted: counters.rows_conflicted,
            rows_skipped: counters.rows_skipped,
        }
    }
}

impl TryFrom<WireTableLevelResult> for TableLevelResult {
    type Error = ModelError;

    #[track_caller]
    fn try_from(wire: WireTableLevelResult) -> Result<Self, Self::Error> {
        let outcome: SyncOutcome = enum_from_wire(wire.sync_outcome, "table sync outcome")?;

        let mut builder = TableLevelResultBuilder::default()
            .with_table_id(wire.table_id)
            .with_outcome(outcome)
            .with_counters(TableSyncCounters {
                rows_pulled: wire.rows_pulled,
                rows_pushed: wire.rows_pushed,
                rows_conflicted: wire.rows_conflicted,
                rows_skipped: wire.rows_skipped,
            });

        if let Some(message) = wire.message {
            builder = builder.with_message(message);
        }

        builder.build()
    }
}

impl From<&SyncOverallResult> for WireSyncOverallResult {
    fn from(result: &SyncOverallResult) -> Self {
        let tables: Vec<WireTableEntry> = result
            .table_level_results()
            .iter()
            .map(|table| WireTableEntry {
                table_id: table.table_id().to_string(),
                result: Some(WireTableLevelResult::from(table)),
            })
            .collect();

        Self {
            app_outcome: result.app_outcome().into(),
            // usize is at most 64 bits on every supported target.
            table_count: tables.len() as u64,
            tables,
        }
    }
}

impl TryFrom<WireSyncOverallResult> for SyncOverallResult {
    type Error = ModelError;

    #[track_caller]
    fn try_from(wire: WireSyncOverallResult) -> Result<Self, Self::Error> {
        if usize::try_from(wire.table_count).ok() != Some(wire.tables.len()) {
            return Err(ModelError::Format {
                message: format!(
                    "Declared {} table results but payload carries {}",
                    wire.table_count,
                    wire.tables.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut result = SyncOverallResult::new();
        result.set_app_outcome(enum_from_wire(wire.app_outcome, "app sync outcome")?);

        let mut seen = HashSet::with_capacity(wire.tables.len());
        for entry in wire.tables {
            if !seen.insert(entry.table_id.clone()) {
                return Err(ModelError::Format {
                    message: format!("Duplicate table id '{}'", entry.table_id),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            let record = entry.result.ok_or_else(|| ModelError::Format {
                message: format!("Missing record for table id '{}'", entry.table_id),
                location: ErrorLocation::from(Location::caller()),
            })?;

            result.set_table_result(&entry.table_id, TableLevelResult::try_from(record)?)?;
        }

        Ok(result)
    }
}

impl SyncOverallResult {
    /// Encode for transport across the process boundary.
    ///
    /// Tables are written in table id order so equal aggregates encode to equal bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        WireSyncOverallResult::from(self).encode_to_vec()
    }

    /// Decode an aggregate produced by [`SyncOverallResult::to_bytes`].
    ///
    /// # Errors
    ///
    /// - [`ModelError::ProtobufDecode`] - bytes are not a valid message
    /// - [`ModelError::Format`] - table count mismatch, duplicate or missing records,
    ///   unknown outcome values
    /// - [`ModelError::TableIdMismatch`] - a record is keyed under a foreign table id
    #[track_caller]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let wire = WireSyncOverallResult::decode(bytes)?;
        Self::try_from(wire)
    }
}
