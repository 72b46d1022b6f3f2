//! [`ServiceBinder`] over the WebSocket engine protocol.

use crate::config::EngineConfig;
use crate::error::{BindError, CoreError, IpcError};
use crate::ipc::client::{
    ClientStream, SessionEnd, WsEngineClient, authenticate, connect_with_backoff, run_session,
    try_connect,
};
use crate::launcher::launch_engine;
use crate::proxy::{BindRequest, RemoteEngineHandle, ServiceBinder, ServiceConnection};

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::{mpsc, oneshot};
use url::Url;
use uuid::Uuid;

struct Session {
    serial: u64,
    release: oneshot::Sender<()>,
}

type Sessions = Arc<Mutex<HashMap<u64, Session>>>;

/// Binds proxies to a sync engine reachable over WebSocket.
///
/// Each bind runs on the given tokio runtime: connect to the configured endpoint
/// (launching the engine first when allowed), authenticate, then deliver
/// `on_connected` with a [`WsEngineClient`]. A bind that fails, or a session the
/// engine drops, is delivered as `on_disconnected`. After `unbind` the session is
/// closed and no further callbacks are delivered for it.
pub struct WsServiceBinder {
    runtime: RuntimeHandle,
    engine: EngineConfig,
    sessions: Sessions,
    next_serial: AtomicU64,
}

impl WsServiceBinder {
    pub fn new(runtime: RuntimeHandle, engine: EngineConfig) -> Self {
        Self {
            runtime,
            engine,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_serial: AtomicU64::new(1),
        }
    }

    /// Number of binds in progress or established.
    pub fn active_sessions(&self) -> usize {
        lock(&self.sessions).len()
    }
}

impl ServiceBinder for WsServiceBinder {
    fn bind(&self, request: BindRequest, connection: ServiceConnection) -> Result<(), BindError> {
        if self.engine.port.is_none() && !request.auto_create {
            return Err(BindError::Rejected {
                message: "No engine port configured and auto-create is disabled".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let (release, released) = oneshot::channel();

        {
            let mut sessions = lock(&self.sessions);
            if sessions.contains_key(&connection.id()) {
                return Err(BindError::Rejected {
                    message: format!("Connection {} already has a session", connection.id()),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            sessions.insert(connection.id(), Session { serial, release });
        }

        debug!(
            "Starting bind session {serial} for connection {}",
            connection.id()
        );

        let engine = self.engine.clone();
        let sessions = Arc::clone(&self.sessions);

        self.runtime.spawn(async move {
            match establish(&engine, &request).await {
                Ok(stream) => serve(stream, connection, serial, sessions, released).await,
                Err(e) => {
                    error!("Bind to {}/{} failed: {e}", request.package, request.class_name);
                    finish(&sessions, &connection, serial, true);
                }
            }
        });

        Ok(())
    }

    fn unbind(&self, connection: &ServiceConnection) -> Result<(), BindError> {
        match lock(&self.sessions).remove(&connection.id()) {
            Some(session) => {
                // The session task may already be gone, in which case there is nothing to close.
                let _ = session.release.send(());
                info!(
                    "Released bind session {} for connection {}",
                    session.serial,
                    connection.id()
                );
            }
            None => debug!("Unbind for connection {} without a session", connection.id()),
        }
        Ok(())
    }
}

async fn establish(engine: &EngineConfig, request: &BindRequest) -> Result<ClientStream, CoreError> {
    let timeout = engine.connect_timeout();

    if let Some(port) = engine.port {
        let url = endpoint_url(&engine.host, port)?;
        let token = engine.auth_token.clone().unwrap_or_default();

        let stream = if request.auto_create {
            try_connect(&url).await
        } else {
            Some(connect_with_backoff(&url, timeout).await?)
        };

        if let Some(mut stream) = stream {
            authenticate(&mut stream, &token, request, timeout).await?;
            return Ok(stream);
        }

        info!("No sync engine at {url}, launching {}", engine.executable);
    }

    let token = engine
        .auth_token
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let launched = launch_engine(&engine.executable, &engine.host, &token).await?;
    let url = endpoint_url(&engine.host, launched.port)?;

    let mut stream = connect_with_backoff(&url, timeout).await?;
    authenticate(&mut stream, &token, request, timeout).await?;

    // The engine outlives this client; dropping the child handle does not stop it.
    drop(launched.child);

    Ok(stream)
}

#[track_caller]
fn endpoint_url(host: &str, port: u16) -> Result<String, IpcError> {
    let url = Url::parse(&format!("ws://{host}:{port}")).map_err(|e| IpcError::Connect {
        message: format!("Invalid engine endpoint {host}:{port}: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;
    Ok(url.to_string())
}

async fn serve(
    stream: ClientStream,
    connection: ServiceConnection,
    serial: u64,
    sessions: Sessions,
    released: oneshot::Receiver<()>,
) {
    let (calls, receiver) = mpsc::unbounded_channel();

    {
        let sessions = lock(&sessions);
        if !owns_session(&sessions, &connection, serial) {
            debug!("Bind session {serial} released before it connected");
            return;
        }
        connection.on_connected(RemoteEngineHandle::new(WsEngineClient::new(calls)));
    }

    let end = run_session(stream, receiver, released).await;
    finish(&sessions, &connection, serial, end == SessionEnd::Lost);
}

/// Drop the session record and, if it is still current, report the disconnect.
fn finish(sessions: &Sessions, connection: &ServiceConnection, serial: u64, lost: bool) {
    let mut sessions = lock(sessions);
    if !owns_session(&sessions, connection, serial) {
        return;
    }

    sessions.remove(&connection.id());
    if lost {
        warn!("Bind session {serial} for connection {} lost", connection.id());
        connection.on_disconnected();
    }
}

fn owns_session(
    sessions: &HashMap<u64, Session>,
    connection: &ServiceConnection,
    serial: u64,
) -> bool {
    sessions
        .get(&connection.id())
        .is_some_and(|session| session.serial == serial)
}

fn lock(sessions: &Sessions) -> MutexGuard<'_, HashMap<u64, Session>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}
