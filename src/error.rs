//! API error type
//!
//! Every handler failure is one of these variants; the router turns them
//! into `{"detail": ...}` JSON responses.

use hyper::StatusCode;
use thiserror::Error as ThisError;

use crate::storage::Category;

#[derive(ThisError, Debug)]
pub enum ApiError {
    /// Uploaded filename does not carry an accepted extension
    #[error("{}", .category.invalid_type_message())]
    InvalidFileType { category: Category },

    /// Malformed request (bad multipart body, missing boundary, ...)
    #[error("{message}")]
    BadRequest { message: String },

    /// Declared or streamed body exceeds the configured limit
    #[error("Request body too large (max: {limit} bytes)")]
    PayloadTooLarge { limit: u64 },

    /// Identifier did not match any stored file
    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    /// No route for this path
    #[error("Not Found")]
    RouteNotFound,

    /// Route exists but not for this method
    #[error("Method Not Allowed")]
    MethodNotAllowed { allow: &'static str },

    /// Filesystem failure while reading or writing uploads
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFileType { .. } | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound { .. } | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client
    pub fn detail(&self) -> String {
        match self {
            Self::Storage(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<multer::Error> for ApiError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit }
            | multer::Error::FieldSizeExceeded { limit, .. } => Self::PayloadTooLarge { limit },
            other => Self::BadRequest {
                message: format!("Failed to parse multipart data: {other}"),
            },
        }
    }
}
