use crate::proto::EngineErrorCode;

use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Communication failure of a call into the sync engine.
///
/// Produced by engine handles and by engine implementations themselves. The proxy
/// hands these back to callers exactly as received.
#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum RemoteError {
    /// The transport failed while sending or receiving the call.
    #[error("Transport Error: {message} {location}")]
    Transport {
        message: String,
        location: ErrorLocation,
    },

    /// The engine answered with something that does not fit the call.
    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },

    /// The engine processed the call and reported a failure.
    #[error("Engine Error: [{code}] {message} {location}")]
    Engine {
        code: EngineErrorCode,
        message: String,
        location: ErrorLocation,
    },

    /// The engine went away before the call completed.
    #[error("Disconnected Error: {message} {location}")]
    Disconnected {
        message: String,
        location: ErrorLocation,
    },
}
