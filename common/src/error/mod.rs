pub mod common_error;
pub mod error_location;
