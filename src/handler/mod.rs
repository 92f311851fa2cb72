//! Request handler module
//!
//! Routes requests to the upload, file status and analysis handlers.

pub mod files;
pub mod router;
pub mod upload;

#[cfg(test)]
pub mod test_support;

// Re-export main entry point
pub use router::handle_request;
