//! Application namespace identifier.
//!
//! Every sync operation is scoped to one application namespace. The sync engine
//! keys its sessions, progress and diagnostic logs by this name, so an empty
//! value is never meaningful and is rejected before anything leaves the process.

use crate::{CommonError, ErrorLocation};

use std::fmt;
use std::panic::Location;

use serde::Serialize;

/// Prefix of the `log` target used for per-namespace diagnostics.
const LOG_TARGET_PREFIX: &str = "odk_sync::";

/// A non-empty application namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
    /// Validate and wrap an application namespace.
    ///
    /// # Errors
    ///
    /// Returns [`CommonError::InvalidArgument`] if `name` is empty or only whitespace.
    #[track_caller]
    pub fn parse(name: &str) -> Result<Self, CommonError> {
        if name.trim().is_empty() {
            return Err(CommonError::InvalidArgument {
                message: String::from("App name cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self(name.to_string()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `log` target that routes diagnostics to this namespace's log.
    pub fn log_target(&self) -> String {
        format!("{LOG_TARGET_PREFIX}{}", self.0)
    }
}

impl AsRef<str> for AppName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
