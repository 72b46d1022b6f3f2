//! Engine host: serves a [`SyncEngineInterface`] over the WebSocket protocol.
//!
//! - Listens on `127.0.0.1` only
//! - Requires an auth handshake as the first frame of every connection
//! - Runs engine calls on the blocking pool, one request at a time per connection

use crate::ENGINE_HOSTNAME;
use crate::engine::SyncEngineInterface;
use crate::error::{IpcError, RemoteError};
use crate::ipc::client::response_kind;
use crate::ipc::encode_frame;
use crate::ipc::handle::EngineHostHandle;
use crate::ipc::peer_auth::PeerAuth;
use crate::proto::EngineErrorCode::{
    AuthError, EngineFailure, Internal, InvalidArgument, InvalidMessage,
};
use crate::proto::{
    AUTH_HANDSHAKE_REQUEST_ID, AcceptedResponse, AuthHandshakeResponse, EngineErrorCode,
    EngineRequest, EngineResponse, ErrorResponse, SyncProgressResponse, SyncStatusResponse,
    UpdateMessageResponse, engine_request, engine_response,
};

use common::{AppName, ErrorLocation};
use models::SyncAttachmentState;
use models::wire::{WireSyncOverallResult, enum_from_wire};

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use prost::Message as ProstMessage;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::oneshot;
use tokio::task::spawn_blocking;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use uuid::Uuid;

type HostSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type EngineRef = Arc<dyn SyncEngineInterface>;

/// Start serving `engine` on `127.0.0.1:<port>`.
///
/// Pass port `0` to let the OS pick one; the chosen port is on the returned handle.
/// When `auth_token` is `None` a random token is generated.
///
/// # Errors
///
/// Returns [`IpcError::Io`] if the port cannot be bound.
pub async fn start_engine_host(
    port: u16,
    auth_token: Option<String>,
    engine: EngineRef,
) -> Result<EngineHostHandle, IpcError> {
    let auth_token = auth_token.unwrap_or_else(|| {
        let token = Uuid::new_v4().to_string();
        debug!("Generated engine host auth token");
        token
    });

    let listener = TcpListener::bind((ENGINE_HOSTNAME, port)).await?;
    let address = listener.local_addr()?;

    info!("Engine host listening on {address}");

    let (shutdown, mut stop) = oneshot::channel::<()>();
    let token = auth_token.clone();

    TokioSpawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("Engine host on {address} stopped accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("Client connecting from {addr}");
                        let token = token.clone();
                        let engine = Arc::clone(&engine);
                        TokioSpawn(async move {
                            if let Err(e) = handle_connection(stream, addr, token, engine).await {
                                warn!("Connection from {addr} ended with error: {e}");
                            }
                        });
                    }
                    Err(e) => {
                        error!("Engine host accept failed: {e}");
                        break;
                    }
                },
            }
        }
    });

    Ok(EngineHostHandle::new(address.port(), auth_token, shutdown))
}

/// Serve one connection: loopback check, auth handshake, then the request loop.
///
/// Returns `Ok(())` when the peer disconnects or is turned away.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    auth_token: String,
    engine: EngineRef,
) -> Result<(), IpcError> {
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {addr}");
        return Ok(());
    }

    let ws_stream = accept_async(stream).await.map_err(|e| IpcError::Handshake {
        message: format!("WebSocket handshake failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let (mut write, mut read) = ws_stream.split();
    let mut auth = PeerAuth::new(auth_token);

    match read.next().await {
        Some(Ok(Message::Binary(data))) => {
            let request = EngineRequest::decode(&data[..])?;

            match request.payload {
                Some(engine_request::Payload::AuthHandshake(handshake)) => {
                    if handshake.package.is_empty() || handshake.class_name.is_empty() {
                        warn!("Client {addr} auth failed: missing service identity");
                        send_auth_response(&mut write, false, Some("Missing service identity"))
                            .await?;
                        return Ok(());
                    }

                    if !auth.validate_token(&handshake.token) {
                        warn!("Client {addr} auth failed: invalid token");
                        send_auth_response(
                            &mut write,
                            false,
                            Some("Invalid authentication token"),
                        )
                        .await?;
                        return Ok(());
                    }

                    info!(
                        "Client {addr} authenticated for {}/{}",
                        handshake.package, handshake.class_name
                    );
                    send_auth_response(&mut write, true, None).await?;
                }
                _ => {
                    warn!("Client {addr} auth failed: first message was not auth handshake");
                    return Ok(());
                }
            }
        }
        Some(Ok(_)) => {
            warn!("Client {addr} sent non-binary first message");
            return Ok(());
        }
        Some(Err(e)) => {
            return Err(IpcError::Read {
                message: format!("Error reading first message: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        None => {
            debug!("Client {addr} disconnected before sending auth");
            return Ok(());
        }
    }

    debug_assert!(auth.is_authenticated());

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Binary(data)) => {
                let request = match EngineRequest::decode(&data[..]) {
                    Ok(request) => request,
                    Err(e) => {
                        // No request id to answer under; the client cannot match a reply.
                        error!("Failed to decode request from {addr}, closing connection: {e}");
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(());
                    }
                };

                let request_id = request.request_id;
                let payload = match request.payload {
                    Some(payload) => handle_request(payload, &engine).await,
                    None => {
                        warn!("Client {addr} sent request {request_id} with no payload");
                        error_payload(InvalidMessage, "No payload in request")
                    }
                };

                if let engine_response::Payload::Error(ref e) = payload {
                    debug!("Request {request_id} from {addr} failed: {}", e.message);
                } else {
                    debug!(
                        "Request {request_id} from {addr} answered with {}",
                        response_kind(&payload)
                    );
                }

                send_response(&mut write, request_id, payload).await?;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(IpcError::Read {
                    message: format!("Error reading message: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }
    }

    info!("Client {addr} disconnected");
    Ok(())
}

async fn handle_request(
    payload: engine_request::Payload,
    engine: &EngineRef,
) -> engine_response::Payload {
    use engine_request::Payload;
    use engine_response::Payload as Response;

    let result = match payload {
        Payload::AuthHandshake(_) => Err(ErrorResponse {
            code: AuthError.into(),
            message: "Auth handshake already completed".to_string(),
        }),
        Payload::GetSyncStatus(req) => {
            run_engine_call(engine, req.app_name, |engine, app| engine.get_sync_status(app))
                .await
                .map(|status| {
                    Response::SyncStatus(SyncStatusResponse {
                        status: status.into(),
                    })
                })
        }
        Payload::ResetServer(req) => match attachment_state(req.attachment_state) {
            Ok(state) => run_engine_call(engine, req.app_name, move |engine, app| {
                engine.reset_server(app, state)
            })
            .await
            .map(|accepted| Response::Accepted(AcceptedResponse { accepted })),
            Err(e) => Err(e),
        },
        Payload::SynchronizeWithServer(req) => match attachment_state(req.attachment_state) {
            Ok(state) => run_engine_call(engine, req.app_name, move |engine, app| {
                engine.synchronize_with_server(app, state)
            })
            .await
            .map(|accepted| Response::Accepted(AcceptedResponse { accepted })),
            Err(e) => Err(e),
        },
        Payload::GetSyncProgress(req) => {
            run_engine_call(engine, req.app_name, |engine, app| engine.get_sync_progress(app))
                .await
                .map(|progress| {
                    Response::SyncProgress(SyncProgressResponse {
                        progress: progress.into(),
                    })
                })
        }
        Payload::GetSyncUpdateMessage(req) => run_engine_call(engine, req.app_name, |engine, app| {
            engine.get_sync_update_message(app)
        })
        .await
        .map(|message| Response::UpdateMessage(UpdateMessageResponse { message })),
        Payload::GetSyncResult(req) => {
            run_engine_call(engine, req.app_name, |engine, app| engine.get_sync_result(app))
                .await
                .map(|result| Response::SyncResult(WireSyncOverallResult::from(&result)))
        }
    };

    result.unwrap_or_else(Response::Error)
}

fn attachment_state(value: i32) -> Result<SyncAttachmentState, ErrorResponse> {
    enum_from_wire(value, "attachment state").map_err(|e| ErrorResponse {
        code: InvalidMessage.into(),
        message: e.to_string(),
    })
}

/// Validate the namespace, then run `call` on the blocking pool.
async fn run_engine_call<T, F>(
    engine: &EngineRef,
    app_name: String,
    call: F,
) -> Result<T, ErrorResponse>
where
    T: Send + 'static,
    F: FnOnce(&dyn SyncEngineInterface, &str) -> Result<T, RemoteError> + Send + 'static,
{
    let app_name = AppName::parse(&app_name).map_err(|e| ErrorResponse {
        code: InvalidArgument.into(),
        message: e.to_string(),
    })?;

    let engine = Arc::clone(engine);
    match spawn_blocking(move || call(engine.as_ref(), app_name.as_str())).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(error_from_remote(&e)),
        Err(e) => {
            error!("Engine call panicked or was cancelled: {e}");
            Err(ErrorResponse {
                code: Internal.into(),
                message: format!("Engine call did not complete: {e}"),
            })
        }
    }
}

fn error_from_remote(error: &RemoteError) -> ErrorResponse {
    match error {
        RemoteError::Engine { code, message, .. } => ErrorResponse {
            code: (*code).into(),
            message: message.clone(),
        },
        other => ErrorResponse {
            code: EngineFailure.into(),
            message: other.to_string(),
        },
    }
}

fn error_payload(code: EngineErrorCode, message: &str) -> engine_response::Payload {
    engine_response::Payload::Error(ErrorResponse {
        code: code.into(),
        message: message.to_string(),
    })
}

async fn send_auth_response(
    write: &mut HostSink,
    success: bool,
    error: Option<&str>,
) -> Result<(), IpcError> {
    let payload = engine_response::Payload::AuthHandshakeResponse(AuthHandshakeResponse {
        success,
        error: error.map(|s| s.to_string()),
    });

    send_response(write, AUTH_HANDSHAKE_REQUEST_ID, payload).await
}

async fn send_response(
    write: &mut HostSink,
    request_id: u64,
    payload: engine_response::Payload,
) -> Result<(), IpcError> {
    let response = EngineResponse {
        request_id,
        payload: Some(payload),
    };

    write
        .send(encode_frame(&response)?)
        .await
        .map_err(|e| IpcError::Send {
            message: format!("Failed to send response {request_id}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
