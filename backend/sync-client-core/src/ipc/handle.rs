//! Engine host handle type.

use log::info;
use tokio::sync::oneshot;

/// Handle to a running engine host.
///
/// Returned by [`start_engine_host`](crate::ipc::start_engine_host). The host keeps
/// accepting connections until [`shutdown`](Self::shutdown) is called or the handle
/// is dropped. Connections already authenticated are served until their peer leaves.
#[derive(Debug)]
pub struct EngineHostHandle {
    port: u16,
    token: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl EngineHostHandle {
    pub(crate) fn new(port: u16, token: String, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            port,
            token,
            shutdown: Some(shutdown),
        }
    }

    /// Port the host is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Token clients must present in their auth handshake.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// `ws://` URL clients connect to.
    pub fn url(&self) -> String {
        format!("{}:{}", crate::ENGINE_BASE_URL, self.port)
    }

    /// Stop accepting new connections.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
            info!("Engine host on port {} shutting down", self.port);
        }
    }
}

impl Drop for EngineHostHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
