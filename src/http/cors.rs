//! CORS header handling
//!
//! Browser clients (the upload frontend) are allowed per configured origin,
//! with credentials, any method and any request header.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderValue};
use hyper::Response;

use crate::config::HttpConfig;

/// Return the request `Origin` if it is allowed by configuration
pub fn allowed_origin(headers: &HeaderMap, http: &HttpConfig) -> Option<HeaderValue> {
    let origin = headers.get(hyper::header::ORIGIN)?;
    let origin_str = origin.to_str().ok()?;
    http.is_origin_allowed(origin_str).then(|| origin.clone())
}

/// Add CORS response headers for an allowed origin
pub fn apply_cors_headers(
    response: &mut Response<Full<Bytes>>,
    origin: HeaderValue,
    request_headers: Option<&HeaderValue>,
) {
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", origin);
    headers.insert(
        "Access-Control-Allow-Credentials",
        HeaderValue::from_static("true"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, PATCH, DELETE, OPTIONS"),
    );
    // Echo requested headers back, which is how "allow any header" works with credentials
    let allow_headers = request_headers
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("Content-Type"));
    headers.insert("Access-Control-Allow-Headers", allow_headers);
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("600"));
    headers.append(hyper::header::VARY, HeaderValue::from_static("Origin"));
}
