//! Outcome classification for a sync session and for each table in it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result classification reported by the sync engine.
///
/// The same classification is used at app level and at table level. The first
/// variant, [`SyncOutcome::Working`], is the in-progress marker and the default
/// for freshly created results.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    prost::Enumeration,
)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum SyncOutcome {
    Working = 0,
    Success = 1,
    Failure = 2,
    ExceptionBeforeSuccess = 3,
    AccessDenied = 4,
    AuthenticationError = 5,
    NetworkFailure = 6,
    IncompatibleServerVersion = 7,
    ServerInternalError = 8,
    AppNameDoesNotExistOnServer = 9,
    TableDoesNotExistOnServer = 10,
    LocalDatabaseException = 11,
    TableContainsConflicts = 12,
    TablePendingAttachments = 13,
    Cancelled = 14,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Working => "working",
            SyncOutcome::Success => "success",
            SyncOutcome::Failure => "failure",
            SyncOutcome::ExceptionBeforeSuccess => "exception_before_success",
            SyncOutcome::AccessDenied => "access_denied",
            SyncOutcome::AuthenticationError => "authentication_error",
            SyncOutcome::NetworkFailure => "network_failure",
            SyncOutcome::IncompatibleServerVersion => "incompatible_server_version",
            SyncOutcome::ServerInternalError => "server_internal_error",
            SyncOutcome::AppNameDoesNotExistOnServer => "app_name_does_not_exist_on_server",
            SyncOutcome::TableDoesNotExistOnServer => "table_does_not_exist_on_server",
            SyncOutcome::LocalDatabaseException => "local_database_exception",
            SyncOutcome::TableContainsConflicts => "table_contains_conflicts",
            SyncOutcome::TablePendingAttachments => "table_pending_attachments",
            SyncOutcome::Cancelled => "cancelled",
        }
    }

    /// True while the session (or table) has not reached a final classification.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, SyncOutcome::Working)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
