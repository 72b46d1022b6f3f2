use crate::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CommonError {
    #[error("Invalid Argument Error: {message} {location}")]
    InvalidArgument {
        message: String,
        location: ErrorLocation,
    },
}
