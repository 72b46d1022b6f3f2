//! Messages exchanged between a [`WsEngineClient`](crate::ipc::WsEngineClient) and
//! an engine host.
//!
//! Every frame is a binary WebSocket message holding one [`EngineRequest`] or
//! [`EngineResponse`]. The first client frame is always an [`AuthHandshake`]
//! carrying [`AUTH_HANDSHAKE_REQUEST_ID`]; later requests are matched to their
//! responses by `request_id`.

use std::fmt;

pub const AUTH_HANDSHAKE_REQUEST_ID: u64 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EngineRequest {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(oneof = "engine_request::Payload", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub payload: Option<engine_request::Payload>,
}

pub mod engine_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        AuthHandshake(super::AuthHandshake),
        #[prost(message, tag = "3")]
        GetSyncStatus(super::AppRequest),
        #[prost(message, tag = "4")]
        ResetServer(super::SyncRequest),
        #[prost(message, tag = "5")]
        SynchronizeWithServer(super::SyncRequest),
        #[prost(message, tag = "6")]
        GetSyncProgress(super::AppRequest),
        #[prost(message, tag = "7")]
        GetSyncUpdateMessage(super::AppRequest),
        #[prost(message, tag = "8")]
        GetSyncResult(super::AppRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthHandshake {
    #[prost(string, tag = "1")]
    pub token: String,
    #[prost(string, tag = "2")]
    pub package: String,
    #[prost(string, tag = "3")]
    pub class_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AppRequest {
    #[prost(string, tag = "1")]
    pub app_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncRequest {
    #[prost(string, tag = "1")]
    pub app_name: String,
    #[prost(enumeration = "models::SyncAttachmentState", tag = "2")]
    pub attachment_state: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EngineResponse {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(oneof = "engine_response::Payload", tags = "2, 3, 4, 5, 6, 7, 8")]
    pub payload: Option<engine_response::Payload>,
}

pub mod engine_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "2")]
        AuthHandshakeResponse(super::AuthHandshakeResponse),
        #[prost(message, tag = "3")]
        SyncStatus(super::SyncStatusResponse),
        #[prost(message, tag = "4")]
        Accepted(super::AcceptedResponse),
        #[prost(message, tag = "5")]
        SyncProgress(super::SyncProgressResponse),
        #[prost(message, tag = "6")]
        UpdateMessage(super::UpdateMessageResponse),
        #[prost(message, tag = "7")]
        SyncResult(::models::wire::WireSyncOverallResult),
        #[prost(message, tag = "8")]
        Error(super::ErrorResponse),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthHandshakeResponse {
    #[prost(bool, tag = "1")]
    pub success: bool,
    #[prost(string, optional, tag = "2")]
    pub error: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncStatusResponse {
    #[prost(enumeration = "models::SyncStatus", tag = "1")]
    pub status: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AcceptedResponse {
    #[prost(bool, tag = "1")]
    pub accepted: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncProgressResponse {
    #[prost(enumeration = "models::SyncProgressState", tag = "1")]
    pub progress: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateMessageResponse {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ErrorResponse {
    #[prost(enumeration = "EngineErrorCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EngineErrorCode {
    Internal = 0,
    InvalidMessage = 1,
    AuthError = 2,
    NotImplemented = 3,
    InvalidArgument = 4,
    EngineFailure = 5,
}

impl EngineErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineErrorCode::Internal => "internal",
            EngineErrorCode::InvalidMessage => "invalid_message",
            EngineErrorCode::AuthError => "auth_error",
            EngineErrorCode::NotImplemented => "not_implemented",
            EngineErrorCode::InvalidArgument => "invalid_argument",
            EngineErrorCode::EngineFailure => "engine_failure",
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
