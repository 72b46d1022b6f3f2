use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Table Id Mismatch Error: record '{embedded}' stored under '{key}' {location}")]
    TableIdMismatch {
        key: String,
        embedded: String,
        location: ErrorLocation,
    },

    #[error("Format Error: {message} {location}")]
    Format {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protobuf Decode Error: {message} {location}")]
    ProtobufDecode {
        message: String,
        location: ErrorLocation,
    },
}

impl From<prost::DecodeError> for ModelError {
    #[track_caller]
    fn from(error: prost::DecodeError) -> Self {
        ModelError::ProtobufDecode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
