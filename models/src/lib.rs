//! Sync domain models.
//!
//! This crate contains the data the sync engine reports back across the process
//! boundary. Models have no connection logic - they are plain values that the
//! engine populates and the client reads.
//!
//! ## Architecture
//!
//! - **common**: Error locations and the validated application namespace
//! - **models** (this crate): Outcomes, statuses and the per-session result aggregate
//! - **sync-client-core**: Connection lifecycle and delegation to the engine
//!
//! The [`wire`] module holds the protobuf forms used on the IPC channel. Domain
//! types never carry raw protobuf integers; conversion validates enum values.

pub mod error;
pub mod outcome;
pub mod overall_result;
pub mod status;
pub mod table_result;
pub mod wire;

pub use error::model_error::ModelError;
pub use outcome::SyncOutcome;
pub use overall_result::SyncOverallResult;
pub use status::{SyncAttachmentState, SyncProgressState, SyncStatus};
pub use table_result::builder::TableLevelResultBuilder;
pub use table_result::{TableLevelResult, TableSyncCounters};

#[cfg(test)]
mod tests;
