//! Connection lifecycle and call delegation for the sync engine.
//!
//! ```text
//! Unbound --request_bind--> BindRequested --on_connected--> Bound
//!    ^                                                        |
//!    +------------------ on_disconnected / shutdown ----------+
//! ```
//!
//! Operations validate their namespace first, then require `Bound`, then call the
//! engine on the caller's thread. The state lock is only held long enough to clone
//! the engine handle.

mod binder;
mod connection_state;

pub use binder::{BindRequest, ServiceBinder, ServiceConnection};
pub use connection_state::{ConnectionState, ConnectionStatus, RemoteEngineHandle};

use crate::diagnostics::{DiagnosticSink, LogDiagnosticSink};
use crate::engine::SyncEngineInterface;
use crate::error::{ProxyError, RemoteError};

use common::{AppName, ErrorLocation};
use models::{SyncAttachmentState, SyncOverallResult, SyncProgressState, SyncStatus};

use std::panic::Location;
use std::sync::Arc;

use log::{debug, info, warn};

/// Client-side proxy for the out-of-process sync engine.
pub struct SyncServiceProxy {
    binder: Arc<dyn ServiceBinder>,
    diagnostics: Arc<dyn DiagnosticSink>,
    bind_request: BindRequest,
    connection: ServiceConnection,
}

impl SyncServiceProxy {
    /// Create an unbound proxy that binds through `binder` with the default
    /// [`BindRequest`] and logs remote failures with [`LogDiagnosticSink`].
    pub fn new(binder: Arc<dyn ServiceBinder>) -> Self {
        Self {
            binder,
            diagnostics: Arc::new(LogDiagnosticSink),
            bind_request: BindRequest::default(),
            connection: ServiceConnection::new(),
        }
    }

    pub fn with_bind_request(mut self, bind_request: BindRequest) -> Self {
        self.bind_request = bind_request;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Ask the binder to connect to the engine. Returns immediately; the outcome
    /// arrives through [`on_connected`](Self::on_connected) or
    /// [`on_disconnected`](Self::on_disconnected).
    ///
    /// Does nothing if a bind is already requested or established.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Bind`] if the binder refuses the request. The proxy is
    /// left `Unbound` and the bind may be requested again.
    #[track_caller]
    pub fn request_bind(&self) -> Result<(), ProxyError> {
        if !self.connection.begin_bind() {
            return Ok(());
        }

        info!(
            "Requesting bind to {}/{}",
            self.bind_request.package, self.bind_request.class_name
        );

        if let Err(source) = self
            .binder
            .bind(self.bind_request.clone(), self.connection.clone())
        {
            self.connection.abort_bind();
            return Err(ProxyError::Bind {
                message: format!(
                    "Bind to {}/{} was rejected",
                    self.bind_request.package, self.bind_request.class_name
                ),
                location: ErrorLocation::from(Location::caller()),
                source,
            });
        }

        Ok(())
    }

    pub fn on_connected(&self, handle: RemoteEngineHandle) {
        self.connection.on_connected(handle);
    }

    pub fn on_disconnected(&self) {
        self.connection.on_disconnected();
    }

    /// Release the binding. No-op when already unbound; unbind failures are logged.
    pub fn shutdown(&self) {
        let status = self.connection.status();
        if status == ConnectionStatus::Unbound {
            debug!("Shutdown skipped, sync service not bound");
            return;
        }

        if let Err(e) = self.binder.unbind(&self.connection) {
            warn!("Failed to release sync service binding: {e}");
        }

        self.connection.reset();
        info!("Sync service binding released (was {status})");
    }

    pub fn is_connected(&self) -> bool {
        self.connection.status() == ConnectionStatus::Bound
    }

    pub fn state(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// The callback intake shared with the binder.
    pub fn connection(&self) -> &ServiceConnection {
        &self.connection
    }

    #[track_caller]
    pub fn start_sync(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, ProxyError> {
        self.delegate(app_name, "synchronize_with_server", |engine, app| {
            engine.synchronize_with_server(app.as_str(), attachment_state)
        })
    }

    #[track_caller]
    pub fn reset_server(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, ProxyError> {
        self.delegate(app_name, "reset_server", |engine, app| {
            engine.reset_server(app.as_str(), attachment_state)
        })
    }

    #[track_caller]
    pub fn get_status(&self, app_name: &str) -> Result<SyncStatus, ProxyError> {
        self.delegate(app_name, "get_sync_status", |engine, app| {
            engine.get_sync_status(app.as_str())
        })
    }

    #[track_caller]
    pub fn get_progress(&self, app_name: &str) -> Result<SyncProgressState, ProxyError> {
        self.delegate(app_name, "get_sync_progress", |engine, app| {
            engine.get_sync_progress(app.as_str())
        })
    }

    #[track_caller]
    pub fn get_update_message(&self, app_name: &str) -> Result<String, ProxyError> {
        self.delegate(app_name, "get_sync_update_message", |engine, app| {
            engine.get_sync_update_message(app.as_str())
        })
    }

    #[track_caller]
    pub fn get_sync_result(&self, app_name: &str) -> Result<SyncOverallResult, ProxyError> {
        self.delegate(app_name, "get_sync_result", |engine, app| {
            engine.get_sync_result(app.as_str())
        })
    }

    #[track_caller]
    fn delegate<T>(
        &self,
        app_name: &str,
        operation: &'static str,
        call: impl FnOnce(&dyn SyncEngineInterface, &AppName) -> Result<T, RemoteError>,
    ) -> Result<T, ProxyError> {
        let app_name = AppName::parse(app_name)?;

        let Some(handle) = self.connection.bound_handle() else {
            return Err(ProxyError::NotConnected {
                message: format!(
                    "Cannot {operation} for {app_name}: sync service is {}",
                    self.connection.status()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        call(handle.engine(), &app_name).map_err(|source| {
            self.diagnostics
                .report_remote_failure(&app_name, operation, &source);
            ProxyError::Communication { operation, source }
        })
    }
}
