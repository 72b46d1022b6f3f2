use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Failures raised by a [`ServiceBinder`](crate::proxy::ServiceBinder).
#[derive(Debug, ThisError)]
pub enum BindError {
    /// The host refused to start a bind.
    #[error("Bind Rejected Error: {message} {location}")]
    Rejected {
        message: String,
        location: ErrorLocation,
    },

    /// Releasing an existing binding failed.
    #[error("Unbind Error: {message} {location}")]
    Unbind {
        message: String,
        location: ErrorLocation,
    },
}
