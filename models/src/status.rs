//! Engine-reported status values for a sync session.

use crate::ModelError;

use common::ErrorLocation;

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Overall status of the sync engine for one application namespace.
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
pub enum SyncStatus {
    Init = 0,
    Syncing = 1,
    NetworkError = 2,
    FileError = 3,
    AuthenticationError = 4,
    ServerIsNotOdkServer = 5,
    RequestOrProtocolError = 6,
    DeviceError = 7,
    ServerInternalError = 8,
    ConflictResolution = 9,
    SyncComplete = 10,
    SyncCompletePendingAttachments = 11,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Init => "init",
            SyncStatus::Syncing => "syncing",
            SyncStatus::NetworkError => "network_error",
            SyncStatus::FileError => "file_error",
            SyncStatus::AuthenticationError => "authentication_error",
            SyncStatus::ServerIsNotOdkServer => "server_is_not_odk_server",
            SyncStatus::RequestOrProtocolError => "request_or_protocol_error",
            SyncStatus::DeviceError => "device_error",
            SyncStatus::ServerInternalError => "server_internal_error",
            SyncStatus::ConflictResolution => "conflict_resolution",
            SyncStatus::SyncComplete => "sync_complete",
            SyncStatus::SyncCompletePendingAttachments => "sync_complete_pending_attachments",
        }
    }

    /// True while a session is still running on the engine.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of the sync session currently executing.
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
pub enum SyncProgressState {
    Inactive = 0,
    Starting = 1,
    AppFiles = 2,
    TableFiles = 3,
    Rows = 4,
    Finished = 5,
}

impl SyncProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncProgressState::Inactive => "inactive",
            SyncProgressState::Starting => "starting",
            SyncProgressState::AppFiles => "app_files",
            SyncProgressState::TableFiles => "table_files",
            SyncProgressState::Rows => "rows",
            SyncProgressState::Finished => "finished",
        }
    }
}

impl fmt::Display for SyncProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for binary attachments during sync or server reset.
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
pub enum SyncAttachmentState {
    /// Upload and download attachments.
    Sync = 0,
    Upload = 1,
    Download = 2,
    /// Skip attachments entirely.
    None = 3,
}

impl SyncAttachmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAttachmentState::Sync => "sync",
            SyncAttachmentState::Upload => "upload",
            SyncAttachmentState::Download => "download",
            SyncAttachmentState::None => "none",
        }
    }
}

impl fmt::Display for SyncAttachmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAttachmentState {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sync" => Ok(SyncAttachmentState::Sync),
            "upload" => Ok(SyncAttachmentState::Upload),
            "download" => Ok(SyncAttachmentState::Download),
            "none" => Ok(SyncAttachmentState::None),
            other => Err(ModelError::Validation {
                message: format!(
                    "Unknown attachment policy '{other}' (expected sync, upload, download or none)"
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
