//! Call surface of the remote sync engine.

use crate::error::RemoteError;

use models::{SyncAttachmentState, SyncOverallResult, SyncProgressState, SyncStatus};

/// Operations a sync engine exposes to its clients.
///
/// Every call is scoped to an application namespace and blocks until the engine
/// answers or the call fails. Implementations must be shareable across threads;
/// the proxy calls into them from whichever thread its caller runs on.
pub trait SyncEngineInterface: Send + Sync {
    fn get_sync_status(&self, app_name: &str) -> Result<SyncStatus, RemoteError>;

    /// Ask the engine to reset the server copy of `app_name` from local data.
    ///
    /// Returns whether the engine accepted the request.
    fn reset_server(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, RemoteError>;

    /// Ask the engine to start a sync session for `app_name`.
    ///
    /// Returns whether the engine accepted the request.
    fn synchronize_with_server(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, RemoteError>;

    fn get_sync_progress(&self, app_name: &str) -> Result<SyncProgressState, RemoteError>;

    fn get_sync_update_message(&self, app_name: &str) -> Result<String, RemoteError>;

    /// Snapshot of the most recent session's result.
    fn get_sync_result(&self, app_name: &str) -> Result<SyncOverallResult, RemoteError>;
}
