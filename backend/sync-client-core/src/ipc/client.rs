//! Client half of the engine protocol.
//!
//! A session task owns the socket. [`WsEngineClient`] is a cheap front that hands
//! calls to that task over a channel and blocks on a oneshot for the answer, so the
//! proxy's synchronous API can be served by an async transport.

use crate::engine::SyncEngineInterface;
use crate::error::{IpcError, RemoteError};
use crate::ipc::encode_frame;
use crate::proto::{
    AUTH_HANDSHAKE_REQUEST_ID, AppRequest, AuthHandshake, EngineErrorCode, EngineRequest,
    EngineResponse, SyncRequest, engine_request, engine_response,
};
use crate::proxy::BindRequest;

use common::ErrorLocation;
use models::wire::enum_from_wire;
use models::{SyncAttachmentState, SyncOverallResult, SyncProgressState, SyncStatus};

use std::collections::HashMap;
use std::panic::Location;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use prost::Message as ProstMessage;
use tokio::net::TcpStream;
use tokio::runtime::{Handle as RuntimeHandle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};
use tokio::task::block_in_place;
use tokio::time::sleep as TokioSleep;
use tokio::time::timeout as TokioTimeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub(crate) type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type CallResult = Result<engine_response::Payload, RemoteError>;

pub(crate) struct PendingCall {
    payload: engine_request::Payload,
    reply: oneshot::Sender<CallResult>,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// Released locally, by unbind or because every client was dropped.
    Released,
    /// The engine closed the socket or the transport failed.
    Lost,
}

/// Engine handle backed by a WebSocket session.
///
/// Calls block the current thread. Inside a multi-thread tokio runtime the wait
/// goes through `block_in_place`; a current-thread runtime cannot block, so
/// calls made there fail with [`RemoteError::Transport`].
#[derive(Debug, Clone)]
pub struct WsEngineClient {
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl WsEngineClient {
    pub(crate) fn new(calls: mpsc::UnboundedSender<PendingCall>) -> Self {
        Self { calls }
    }

    fn call(&self, operation: &str, payload: engine_request::Payload) -> CallResult {
        let in_runtime = match RuntimeHandle::try_current() {
            Err(_) => false,
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => true,
            Ok(_) => {
                return Err(RemoteError::Transport {
                    message: format!(
                        "Cannot {operation} from a current-thread async runtime; \
                         call it from spawn_blocking or a plain thread"
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        let (reply, response) = oneshot::channel();

        self.calls
            .send(PendingCall { payload, reply })
            .map_err(|_| RemoteError::Disconnected {
                message: format!("Cannot {operation}: engine session has ended"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        // A multi-thread worker may block once it hands its other tasks off.
        let answer = if in_runtime {
            block_in_place(|| response.blocking_recv())
        } else {
            response.blocking_recv()
        };

        answer.map_err(|_| RemoteError::Disconnected {
            message: format!("Engine session ended before {operation} completed"),
            location: ErrorLocation::from(Location::caller()),
        })?
    }
}

impl SyncEngineInterface for WsEngineClient {
    fn get_sync_status(&self, app_name: &str) -> Result<SyncStatus, RemoteError> {
        let operation = "get_sync_status";
        match self.call(operation, engine_request::Payload::GetSyncStatus(app_request(app_name)))? {
            engine_response::Payload::SyncStatus(response) => {
                enum_from_wire(response.status, "sync status").map_err(protocol_error)
            }
            other => Err(unexpected_response(operation, &other)),
        }
    }

    fn reset_server(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, RemoteError> {
        let operation = "reset_server";
        let payload =
            engine_request::Payload::ResetServer(sync_request(app_name, attachment_state));
        match self.call(operation, payload)? {
            engine_response::Payload::Accepted(response) => Ok(response.accepted),
            other => Err(unexpected_response(operation, &other)),
        }
    }

    fn synchronize_with_server(
        &self,
        app_name: &str,
        attachment_state: SyncAttachmentState,
    ) -> Result<bool, RemoteError> {
        let operation = "synchronize_with_server";
        let payload = engine_request::Payload::SynchronizeWithServer(sync_request(
            app_name,
            attachment_state,
        ));
        match self.call(operation, payload)? {
            engine_response::Payload::Accepted(response) => Ok(response.accepted),
            other => Err(unexpected_response(operation, &other)),
        }
    }

    fn get_sync_progress(&self, app_name: &str) -> Result<SyncProgressState, RemoteError> {
        let operation = "get_sync_progress";
        let payload = engine_request::Payload::GetSyncProgress(app_request(app_name));
        match self.call(operation, payload)? {
            engine_response::Payload::SyncProgress(response) => {
                enum_from_wire(response.progress, "sync progress").map_err(protocol_error)
            }
            other => Err(unexpected_response(operation, &other)),
        }
    }

    fn get_sync_update_message(&self, app_name: &str) -> Result<String, RemoteError> {
        let operation = "get_sync_update_message";
        let payload = engine_request::Payload::GetSyncUpdateMessage(app_request(app_name));
        match self.call(operation, payload)? {
            engine_response::Payload::UpdateMessage(response) => Ok(response.message),
            other => Err(unexpected_response(operation, &other)),
        }
    }

    fn get_sync_result(&self, app_name: &str) -> Result<SyncOverallResult, RemoteError> {
        let operation = "get_sync_result";
        let payload = engine_request::Payload::GetSyncResult(app_request(app_name));
        match self.call(operation, payload)? {
            engine_response::Payload::SyncResult(wire) => {
                SyncOverallResult::try_from(wire).map_err(protocol_error)
            }
            other => Err(unexpected_response(operation, &other)),
        }
    }
}

fn app_request(app_name: &str) -> AppRequest {
    AppRequest {
        app_name: app_name.to_string(),
    }
}

fn sync_request(app_name: &str, attachment_state: SyncAttachmentState) -> SyncRequest {
    SyncRequest {
        app_name: app_name.to_string(),
        attachment_state: attachment_state.into(),
    }
}

fn protocol_error(error: models::ModelError) -> RemoteError {
    RemoteError::Protocol {
        message: error.to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

fn unexpected_response(operation: &str, payload: &engine_response::Payload) -> RemoteError {
    RemoteError::Protocol {
        message: format!(
            "Unexpected {} response to {operation}",
            response_kind(payload)
        ),
        location: ErrorLocation::from(Location::caller()),
    }
}

pub(crate) fn response_kind(payload: &engine_response::Payload) -> &'static str {
    use engine_response::Payload;

    match payload {
        Payload::AuthHandshakeResponse(_) => "auth_handshake",
        Payload::SyncStatus(_) => "sync_status",
        Payload::Accepted(_) => "accepted",
        Payload::SyncProgress(_) => "sync_progress",
        Payload::UpdateMessage(_) => "update_message",
        Payload::SyncResult(_) => "sync_result",
        Payload::Error(_) => "error",
    }
}

/// Connect to `url`, retrying with exponential backoff until `max_elapsed` passes.
pub(crate) async fn connect_with_backoff(
    url: &str,
    max_elapsed: Duration,
) -> Result<ClientStream, IpcError> {
    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(max_elapsed),
        ..Default::default()
    };

    debug!("Connecting to sync engine at {url}");

    loop {
        match connect_async(url).await {
            Ok((stream, _)) => {
                info!("Connected to sync engine at {url}");
                return Ok(stream);
            }
            Err(e) => match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Sync engine not reachable ({e}), retrying after {duration:?}");
                    TokioSleep(duration).await;
                }
                None => {
                    return Err(IpcError::Connect {
                        message: format!(
                            "Sync engine at {url} not reachable within {max_elapsed:?}: {e}"
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            },
        }
    }
}

/// Single connection attempt, used to probe for an already running engine.
pub(crate) async fn try_connect(url: &str) -> Option<ClientStream> {
    match connect_async(url).await {
        Ok((stream, _)) => Some(stream),
        Err(e) => {
            debug!("No sync engine at {url}: {e}");
            None
        }
    }
}

/// Send the auth handshake and wait for the host to accept it.
///
/// # Errors
///
/// - [`IpcError::Auth`] - the host rejected the token or closed the socket
/// - [`IpcError::Handshake`] - the host answered with something other than a handshake response
pub(crate) async fn authenticate(
    stream: &mut ClientStream,
    token: &str,
    request: &BindRequest,
    wait: Duration,
) -> Result<(), IpcError> {
    let handshake = EngineRequest {
        request_id: AUTH_HANDSHAKE_REQUEST_ID,
        payload: Some(engine_request::Payload::AuthHandshake(AuthHandshake {
            token: token.to_string(),
            package: request.package.clone(),
            class_name: request.class_name.clone(),
        })),
    };

    stream
        .send(encode_frame(&handshake)?)
        .await
        .map_err(|e| IpcError::Send {
            message: format!("Failed to send auth handshake: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let response = TokioTimeout(wait, read_handshake_response(stream))
        .await
        .map_err(|_| IpcError::Auth {
            message: format!("No auth handshake response within {wait:?}"),
            location: ErrorLocation::from(Location::caller()),
        })??;

    match response.payload {
        Some(engine_response::Payload::AuthHandshakeResponse(auth)) if auth.success => {
            info!("Authenticated with sync engine");
            Ok(())
        }
        Some(engine_response::Payload::AuthHandshakeResponse(auth)) => Err(IpcError::Auth {
            message: auth
                .error
                .unwrap_or_else(|| "Authentication rejected".to_string()),
            location: ErrorLocation::from(Location::caller()),
        }),
        Some(other) => Err(IpcError::Handshake {
            message: format!(
                "Expected auth handshake response, got {}",
                response_kind(&other)
            ),
            location: ErrorLocation::from(Location::caller()),
        }),
        None => Err(IpcError::Handshake {
            message: "Auth handshake response has no payload".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

async fn read_handshake_response(stream: &mut ClientStream) -> Result<EngineResponse, IpcError> {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Binary(data)) => return Ok(EngineResponse::decode(&data[..])?),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                return Err(IpcError::Read {
                    message: format!("Error reading auth handshake response: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }

    Err(IpcError::Auth {
        message: "Sync engine closed the connection during authentication".to_string(),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Drive an authenticated session until it is released or lost.
///
/// Every call still waiting for an answer when the session ends fails with
/// [`RemoteError::Disconnected`]. A response frame that does not decode cannot be
/// matched to its call, so it ends the session as lost and the waiting calls fail
/// with [`RemoteError::Protocol`].
pub(crate) async fn run_session(
    stream: ClientStream,
    mut calls: mpsc::UnboundedReceiver<PendingCall>,
    mut release: oneshot::Receiver<()>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();
    let mut pending: HashMap<u64, oneshot::Sender<CallResult>> = HashMap::new();
    let mut next_request_id = AUTH_HANDSHAKE_REQUEST_ID + 1;
    let mut fault: Option<String> = None;

    let end = loop {
        tokio::select! {
            _ = &mut release => {
                let _ = write.send(Message::Close(None)).await;
                break SessionEnd::Released;
            }
            call = calls.recv() => {
                let Some(call) = call else {
                    debug!("All engine clients dropped, closing session");
                    let _ = write.send(Message::Close(None)).await;
                    break SessionEnd::Released;
                };

                let request_id = next_request_id;
                next_request_id += 1;

                let request = EngineRequest {
                    request_id,
                    payload: Some(call.payload),
                };

                let frame = match encode_frame(&request) {
                    Ok(frame) => frame,
                    Err(e) => {
                        let _ = call.reply.send(Err(RemoteError::Protocol {
                            message: e.to_string(),
                            location: ErrorLocation::from(Location::caller()),
                        }));
                        continue;
                    }
                };

                if let Err(e) = write.send(frame).await {
                    warn!("Failed to send request {request_id} to sync engine: {e}");
                    let _ = call.reply.send(Err(RemoteError::Transport {
                        message: format!("Failed to send request: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    }));
                    break SessionEnd::Lost;
                }

                pending.insert(request_id, call.reply);
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Binary(data))) => {
                    if let Err(e) = complete_call(&data, &mut pending) {
                        warn!("Undecodable response from sync engine, ending session: {e}");
                        fault = Some(format!("Undecodable response from sync engine: {e}"));
                        break SessionEnd::Lost;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Sync engine closed the session");
                    break SessionEnd::Lost;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Error reading from sync engine: {e}");
                    break SessionEnd::Lost;
                }
            },
        }
    };

    for (request_id, reply) in pending.drain() {
        let error = match &fault {
            Some(message) => RemoteError::Protocol {
                message: message.clone(),
                location: ErrorLocation::from(Location::caller()),
            },
            None => RemoteError::Disconnected {
                message: format!("Engine session ended before request {request_id} completed"),
                location: ErrorLocation::from(Location::caller()),
            },
        };
        let _ = reply.send(Err(error));
    }

    end
}

fn complete_call(
    data: &[u8],
    pending: &mut HashMap<u64, oneshot::Sender<CallResult>>,
) -> Result<(), prost::DecodeError> {
    let response = EngineResponse::decode(data)?;

    let Some(reply) = pending.remove(&response.request_id) else {
        warn!(
            "Response for unknown request {} from sync engine",
            response.request_id
        );
        return Ok(());
    };

    let result = match response.payload {
        Some(engine_response::Payload::Error(error)) => Err(RemoteError::Engine {
            code: EngineErrorCode::try_from(error.code).unwrap_or(EngineErrorCode::Internal),
            message: error.message,
            location: ErrorLocation::from(Location::caller()),
        }),
        Some(payload) => Ok(payload),
        None => Err(RemoteError::Protocol {
            message: format!("Response to request {} has no payload", response.request_id),
            location: ErrorLocation::from(Location::caller()),
        }),
    };

    let _ = reply.send(result);
    Ok(())
}
