mod app_name;
mod error_location;
