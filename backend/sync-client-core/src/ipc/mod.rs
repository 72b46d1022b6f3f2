//! WebSocket transport between the sync client and the sync engine.
//!
//! - [`WsServiceBinder`]: a [`ServiceBinder`](crate::proxy::ServiceBinder) that connects
//!   to (and optionally launches) the engine, then hands the proxy a [`WsEngineClient`]
//! - [`start_engine_host`]: serves any [`SyncEngineInterface`](crate::engine::SyncEngineInterface)
//!   to those clients
//!
//! # Protocol
//!
//! Binary protobuf frames, see [`crate::proto`]. The client's first frame must be an
//! auth handshake; the host closes the socket on anything else.
//!
//! # Security
//!
//! - The host binds to `127.0.0.1` only and rejects non-loopback peers
//! - A token is required before any engine call is served

mod binder;
mod client;
mod handle;
pub(crate) mod peer_auth;
mod server;

pub use binder::WsServiceBinder;
pub use client::WsEngineClient;
pub use handle::EngineHostHandle;
pub use server::start_engine_host;

use crate::error::IpcError;

use common::ErrorLocation;

use std::panic::Location;

use prost::Message as ProstMessage;
use tokio_tungstenite::tungstenite::Message;

/// Encode a protobuf message as one binary WebSocket frame.
#[track_caller]
pub(crate) fn encode_frame<T: ProstMessage>(message: &T) -> Result<Message, IpcError> {
    let mut buf = Vec::with_capacity(message.encoded_len());
    message
        .encode(&mut buf)
        .map_err(|e| IpcError::ProtobufEncode {
            message: format!("Failed to encode frame: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;
    Ok(Message::Binary(buf.into()))
}
