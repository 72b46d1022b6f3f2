//! Client side of the ODK sync service.
//!
//! [`proxy::SyncServiceProxy`] owns the asynchronous binding to an out-of-process
//! sync engine and forwards typed, blocking calls to it once bound. The binding
//! itself is performed by a [`proxy::ServiceBinder`]; [`ipc::WsServiceBinder`]
//! is the WebSocket implementation, and [`ipc::start_engine_host`] serves any
//! [`engine::SyncEngineInterface`] over the same protocol.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod launcher;
pub mod proto;
pub mod proxy;

#[cfg(test)]
mod tests;

pub const SYNC_SERVICE_PACKAGE: &str = "org.opendatakit.sync";
pub const SYNC_SERVICE_CLASS: &str = "org.opendatakit.sync.service.OdkSyncService";
pub const ENGINE_BINARY: &str = "odk-sync-engine";
pub const ENGINE_HOSTNAME: &str = "127.0.0.1";
pub const ENGINE_BASE_URL: &str = const_format::concatcp!("ws://", ENGINE_HOSTNAME);
