//! HTTP protocol layer module
//!
//! Response builders and CORS handling, decoupled from the upload handlers.

pub mod cors;
pub mod response;

// Re-export commonly used types
pub use response::{build_error_response, build_health_response, build_options_response, json_response};
