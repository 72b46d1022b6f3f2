use common::{CommonError, ErrorLocation};
use sync_client_core::error::{ConfigError, ProxyError};

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors reported by the `odk-sync` command line.
///
/// With `--json` these are printed as structured JSON, so every variant keeps
/// its message and location rather than a preformatted string.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum CliError {
    /// Error from the CLI itself (runtime, logger, output)
    #[error("Cli Error: {message} {location}")]
    Cli {
        message: String,
        location: ErrorLocation,
    },

    /// Invalid command-line input
    #[error("Invalid Argument Error: {message} {location}")]
    InvalidArgument {
        message: String,
        location: ErrorLocation,
    },

    /// Config file could not be loaded or saved
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The sync engine never became reachable
    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    /// A call reached the engine and failed
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for CliError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        CliError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CommonError> for CliError {
    fn from(error: CommonError) -> Self {
        match error {
            CommonError::InvalidArgument { message, location } => {
                CliError::InvalidArgument { message, location }
            }
        }
    }
}

impl From<ProxyError> for CliError {
    #[track_caller]
    fn from(error: ProxyError) -> Self {
        match error {
            ProxyError::InvalidArgument { message, location } => {
                CliError::InvalidArgument { message, location }
            }
            ProxyError::NotConnected { message, location } => {
                CliError::NotConnected { message, location }
            }
            other => CliError::Core {
                message: other.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidArgument { .. } => 2,
            CliError::NotConnected { .. } => 3,
            CliError::Config { .. } => 4,
            CliError::Core { .. } | CliError::Cli { .. } => 1,
        }
    }
}
