//! Test doubles shared by the integration tests.
//!
//! - [`MockEngine`]: scripted [`SyncEngineInterface`] that records every call
//! - [`MockBinder`]: [`ServiceBinder`] that records requests and can connect synchronously
//! - [`RecordingSink`]: [`DiagnosticSink`] that keeps every reported failure
//! - [`spawn_misbehaving_host`]: engine host that authenticates, then breaks the protocol

use sync_client_core::diagnostics::DiagnosticSink;
use sync_client_core::engine::SyncEngineInterface;
use sync_client_core::error::{BindError, RemoteError};
use sync_client_core::proto::{
    AUTH_HANDSHAKE_REQUEST_ID, AuthHandshake, AuthHandshakeResponse, EngineRequest,
    EngineResponse, engine_request, engine_response,
};
use sync_client_core::proxy::{BindRequest, RemoteEngineHandle, ServiceBinder, ServiceConnection};

use common::{AppName, ErrorLocation};
use models::{
    SyncAttachmentState, SyncOutcome, SyncOverallResult, SyncProgressState, SyncStatus,
    TableLevelResultBuilder,
};

use std::panic::Location;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use prost::Message as ProstMessage;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, accept_async, connect_async, tungstenite::Message,
};

pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

// ============================================
// ENGINE
// ============================================

pub struct MockEngine {
    calls: Mutex<Vec<String>>,
    failure: Mutex<Option<RemoteError>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        })
    }

    pub fn failing(error: RemoteError) -> Arc<Self> {
        let engine = Self::new();
        engine.fail_with(error);
        engine
    }

    pub fn fail_with(&self, error: RemoteError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn handle(self: &Arc<Self>) -> RemoteEngineHandle {
        RemoteEngineHandle::from_arc(Arc::clone(self) as Arc<dyn SyncEngineInterface>)
    }

    fn record(&self, call: String) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Result the mock engine reports for every namespace.
pub fn sample_result() -> SyncOverallResult {
    let mut result = SyncOverallResult::new();
    result.set_app_outcome(SyncOutcome::Success);
    result.fetch_or_create("t1").set_sync_outcome(SyncOutcome::Success);
    let failed = TableLevelResultBuilder::default()
        .with_table_id("t2")
        .with_outcome(SyncOutcome::Failure)
        .with_message("conflict on row 7")
        .build()
        .unwrap();
    result.set_table_result("t2", failed).unwrap();
    result
}

impl SyncEngineInterface for MockEngine {
    fn get_sync_status(&self, app_name: &str) -> Result<SyncStatus, RemoteError> {
        self.record(format!("get_sync_status:{app_name}"))?;
        Ok(SyncStatus::Syncing)
    }

    fn reset_server(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, RemoteError> {
        self.record(format!("reset_server:{app_name}:{attachment_state}"))?;
        Ok(true)
    }

    fn synchronize_with_server(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, RemoteError> {
        self.record(format!("synchronize_with_server:{app_name}:{attachment_state}"))?;
        Ok(true)
    }

    fn get_sync_progress(&self, app_name: &str) -> Result<SyncProgressState, RemoteError> {
        self.record(format!("get_sync_progress:{app_name}"))?;
        Ok(SyncProgressState::Rows)
    }

    fn get_sync_update_message(&self, app_name: &str) -> Result<String, RemoteError> {
        self.record(format!("get_sync_update_message:{app_name}"))?;
        Ok(format!("Syncing {app_name}: 3 of 5 tables"))
    }

    fn get_sync_result(&self, app_name: &str) -> Result<SyncOverallResult, RemoteError> {
        self.record(format!("get_sync_result:{app_name}"))?;
        Ok(sample_result())
    }
}

pub fn transport_error(message: &str) -> RemoteError {
    RemoteError::Transport {
        message: message.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

// ============================================
// BINDER
// ============================================

#[derive(Default)]
pub struct MockBinder {
    pub binds: Mutex<Vec<BindRequest>>,
    pub unbinds: Mutex<usize>,
    pub connections: Mutex<Vec<ServiceConnection>>,
    /// Delivered synchronously from `bind` when set.
    pub connect_with: Mutex<Option<RemoteEngineHandle>>,
    pub reject_bind: Mutex<bool>,
    pub fail_unbind: Mutex<bool>,
}

impl MockBinder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn bind_count(&self) -> usize {
        self.binds.lock().unwrap().len()
    }

    pub fn unbind_count(&self) -> usize {
        *self.unbinds.lock().unwrap()
    }

    pub fn last_connection(&self) -> ServiceConnection {
        self.connections
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("bind was never called")
    }
}

impl ServiceBinder for MockBinder {
    fn bind(&self, request: BindRequest, connection: ServiceConnection) -> Result<(), BindError> {
        if *self.reject_bind.lock().unwrap() {
            return Err(BindError::Rejected {
                message: "service not installed".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        self.binds.lock().unwrap().push(request);
        self.connections.lock().unwrap().push(connection.clone());

        if let Some(handle) = self.connect_with.lock().unwrap().clone() {
            connection.on_connected(handle);
        }
        Ok(())
    }

    fn unbind(&self, _connection: &ServiceConnection) -> Result<(), BindError> {
        *self.unbinds.lock().unwrap() += 1;
        if *self.fail_unbind.lock().unwrap() {
            return Err(BindError::Unbind {
                message: "service already gone".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(())
    }
}

// ============================================
// DIAGNOSTICS
// ============================================

#[derive(Default)]
pub struct RecordingSink {
    pub reports: Mutex<Vec<(String, String, RemoteError)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<(String, String, RemoteError)> {
        self.reports.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report_remote_failure(&self, app_name: &AppName, operation: &str, error: &RemoteError) {
        self.reports.lock().unwrap().push((
            app_name.to_string(),
            operation.to_string(),
            error.clone(),
        ));
    }
}

// ============================================
// WEBSOCKET
// ============================================

pub type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn connect_to_host(port: u16) -> TestSocket {
    let url = format!("ws://127.0.0.1:{port}");
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to engine host");
    ws_stream
}

pub async fn send_protobuf<T: ProstMessage>(ws: &mut TestSocket, message: &T) {
    let mut buf = Vec::new();
    message.encode(&mut buf).expect("Failed to encode protobuf");
    ws.send(Message::Binary(buf.into()))
        .await
        .expect("Failed to send message");
}

pub async fn receive_response(ws: &mut TestSocket) -> EngineResponse {
    let msg = ws
        .next()
        .await
        .expect("No message received")
        .expect("Error receiving message");

    EngineResponse::decode(&msg.into_data()[..]).expect("Failed to decode protobuf")
}

pub async fn authenticate(ws: &mut TestSocket, token: &str) -> AuthHandshakeResponse {
    let handshake = EngineRequest {
        request_id: AUTH_HANDSHAKE_REQUEST_ID,
        payload: Some(engine_request::Payload::AuthHandshake(AuthHandshake {
            token: token.to_string(),
            package: sync_client_core::SYNC_SERVICE_PACKAGE.to_string(),
            class_name: sync_client_core::SYNC_SERVICE_CLASS.to_string(),
        })),
    };

    send_protobuf(ws, &handshake).await;

    match receive_response(ws).await.payload {
        Some(engine_response::Payload::AuthHandshakeResponse(resp)) => resp,
        other => panic!("Expected AuthHandshakeResponse, got {other:?}"),
    }
}

pub async fn is_connection_closed(ws: &mut TestSocket) -> bool {
    match tokio::time::timeout(Duration::from_millis(500), ws.next()).await {
        Err(_) => false,
        Ok(None) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Ok(Some(Err(_))) => true,
    }
}

// ============================================
// MISBEHAVING HOST
// ============================================

/// What [`spawn_misbehaving_host`] does with requests after the handshake.
#[derive(Debug, Clone, Copy)]
pub enum HostFault {
    /// Answer every request with bytes that are not a protobuf message.
    Garbage,
    /// Read one request without answering, then drop the TCP connection.
    HangUp,
}

/// Accept one client, approve any handshake, then misbehave as `fault` says.
///
/// Returns the port the host listens on.
pub async fn spawn_misbehaving_host(fault: HostFault) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind misbehaving host");
    let port = listener.local_addr().expect("local addr").port();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("Failed to accept client");
        let mut ws = accept_async(stream).await.expect("WebSocket handshake failed");

        let _handshake = ws.next().await;
        let approval = EngineResponse {
            request_id: AUTH_HANDSHAKE_REQUEST_ID,
            payload: Some(engine_response::Payload::AuthHandshakeResponse(
                AuthHandshakeResponse {
                    success: true,
                    error: None,
                },
            )),
        };
        ws.send(Message::Binary(approval.encode_to_vec().into()))
            .await
            .expect("Failed to send auth approval");

        while let Some(Ok(frame)) = ws.next().await {
            if !frame.is_binary() {
                continue;
            }
            match fault {
                HostFault::Garbage => {
                    let _ = ws.send(Message::Binary(vec![0xFF, 0xFF, 0xFF].into())).await;
                }
                HostFault::HangUp => {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    return;
                }
            }
        }
    });

    port
}

/// Async form of [`wait_for`] for tests running on a tokio worker.
pub async fn wait_for_async(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// A localhost port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr").port()
}
