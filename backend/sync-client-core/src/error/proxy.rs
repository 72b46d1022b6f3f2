use crate::error::{BindError, RemoteError};

use common::{CommonError, ErrorLocation};

use thiserror::Error as ThisError;

/// Errors returned by [`SyncServiceProxy`](crate::proxy::SyncServiceProxy) operations.
///
/// Callers can tell a missing connection ([`ProxyError::NotConnected`], rebind and retry)
/// apart from a call that reached the transport and failed ([`ProxyError::Communication`]).
#[derive(Debug, ThisError)]
pub enum ProxyError {
    #[error("Invalid Argument Error: {message} {location}")]
    InvalidArgument {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Communication Error: {operation} failed: {source}")]
    Communication {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    #[error("Bind Error: {message} {location}")]
    Bind {
        message: String,
        location: ErrorLocation,
        #[source]
        source: BindError,
    },
}

impl ProxyError {
    /// The engine failure carried by a communication error.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            ProxyError::Communication { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<CommonError> for ProxyError {
    fn from(error: CommonError) -> Self {
        match error {
            CommonError::InvalidArgument { message, location } => {
                ProxyError::InvalidArgument { message, location }
            }
        }
    }
}
