//! Shared building blocks for the ODK sync client.
//!
//! Everything in here is used by more than one crate in the workspace:
//!
//! - [`ErrorLocation`]: call-site capture embedded in every error variant
//! - [`AppName`]: the validated application namespace that scopes a sync session
//! - [`CommonError`]: failures raised while validating shared types

pub mod app_name;
pub mod error;

pub use app_name::AppName;
pub use error::common_error::CommonError;
pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
