//! Engine connection for one CLI invocation.

use crate::error::CliError;

use common::ErrorLocation;
use sync_client_core::config::SyncClientConfig;
use sync_client_core::ipc::WsServiceBinder;
use sync_client_core::proxy::{ConnectionStatus, SyncServiceProxy};

use std::ops::Deref;
use std::panic::Location;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::runtime::{Builder, Runtime};

/// Extra time on top of the configured connect timeout for the handshake.
const CONNECT_SLACK: Duration = Duration::from_secs(5);

const CONNECT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A bound proxy plus the runtime that drives its IPC session.
///
/// Dropping the session releases the binding before the runtime stops.
pub struct EngineSession {
    proxy: SyncServiceProxy,
    _runtime: Runtime,
}

impl EngineSession {
    /// Bind to the engine described by `config` and wait until the proxy is
    /// connected.
    ///
    /// # Errors
    ///
    /// - [`CliError::Cli`] if the runtime cannot be built
    /// - [`CliError::Core`] if the binder rejects the request
    /// - [`CliError::NotConnected`] if the engine never answers
    #[track_caller]
    pub fn connect(config: &SyncClientConfig) -> Result<Self, CliError> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::Cli {
                message: format!("Failed to start async runtime: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let binder = Arc::new(WsServiceBinder::new(
            runtime.handle().clone(),
            config.engine.clone(),
        ));
        let proxy = SyncServiceProxy::new(binder).with_bind_request(config.bind_request());

        proxy.request_bind()?;

        let session = Self {
            proxy,
            _runtime: runtime,
        };
        session.wait_until_connected(config.engine.connect_timeout() + CONNECT_SLACK)?;

        Ok(session)
    }

    #[track_caller]
    fn wait_until_connected(&self, timeout: Duration) -> Result<(), CliError> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.proxy.state() {
                ConnectionStatus::Bound => {
                    info!("Connected to sync engine");
                    return Ok(());
                }
                ConnectionStatus::Unbound => {
                    return Err(CliError::NotConnected {
                        message: "Sync engine could not be reached".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                ConnectionStatus::BindRequested if Instant::now() >= deadline => {
                    return Err(CliError::NotConnected {
                        message: format!(
                            "Sync engine did not connect within {}s",
                            timeout.as_secs()
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                ConnectionStatus::BindRequested => sleep(CONNECT_POLL_INTERVAL),
            }
        }
    }
}

impl Deref for EngineSession {
    type Target = SyncServiceProxy;

    fn deref(&self) -> &Self::Target {
        &self.proxy
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        debug!("Releasing sync engine session");
        self.proxy.shutdown();
    }
}
