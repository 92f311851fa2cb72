//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: body size check, CORS preflight,
//! route matching, error rendering and access logging.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ACCESS_CONTROL_REQUEST_HEADERS, REFERER, SERVER, USER_AGENT};
use hyper::{Method, Request, Response};
use std::borrow::Cow;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use super::{files, upload};
use crate::config::AppState;
use crate::error::ApiError;
use crate::http::{self, cors};
use crate::logger::{self, AccessLogEntry};

/// Resolved API route
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Root,
    Health,
    Upload,
    FileStatus(Cow<'a, str>),
    Analyze(Cow<'a, str>),
}

impl Route<'_> {
    const fn allowed_method(&self) -> &'static str {
        match self {
            Self::Root | Self::Health | Self::FileStatus(_) => "GET",
            Self::Upload | Self::Analyze(_) => "POST",
        }
    }
}

fn resolve_route(path: &str) -> Option<Route<'_>> {
    match path {
        "/" => Some(Route::Root),
        "/healthz" | "/readyz" => Some(Route::Health),
        "/api/upload" => Some(Route::Upload),
        _ => {
            if let Some(id) = path_param(path, "/api/files/") {
                Some(Route::FileStatus(id))
            } else {
                path_param(path, "/api/analyze/").map(Route::Analyze)
            }
        }
    }
}

/// Single non-empty, percent-decoded path segment following `prefix`
fn path_param<'a>(path: &'a str, prefix: &str) -> Option<Cow<'a, str>> {
    let raw = path.strip_prefix(prefix).filter(|raw| !raw.contains('/'))?;
    urlencoding::decode(raw)
        .ok()
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let started = Instant::now();

    let mut entry = state.access_log_enabled().then(|| {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            req.method().to_string(),
            req.uri().path().to_string(),
        );
        entry.query = req.uri().query().map(ToString::to_string);
        entry.http_version = http_version(req.version()).to_string();
        entry.referer = header_string(&req, REFERER);
        entry.user_agent = header_string(&req, USER_AGENT);
        entry
    });

    let origin = cors::allowed_origin(req.headers(), &state.config.http);
    let requested_headers = req.headers().get(ACCESS_CONTROL_REQUEST_HEADERS).cloned();

    let mut response = match dispatch(req, &state).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ApiError::Storage(e) => logger::log_error(&format!("Storage failure: {e}")),
                other => logger::log_debug(&format!("Request failed: {other}")),
            }
            http::build_error_response(&err)
        }
    };

    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }
    if let Some(origin) = origin {
        cors::apply_cors_headers(&mut response, origin, requested_headers.as_ref());
    }

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: &AppState) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    if req.method() == Method::OPTIONS {
        return Ok(http::build_options_response());
    }

    check_body_size(&req, state.config.http.max_body_size)?;

    let path = req.uri().path().to_string();
    let route = resolve_route(&path).ok_or(ApiError::RouteNotFound)?;
    let allow = route.allowed_method();
    if req.method().as_str() != allow {
        logger::log_warning(&format!("Method not allowed: {} {path}", req.method()));
        return Err(ApiError::MethodNotAllowed { allow });
    }

    match route {
        Route::Root => Ok(files::handle_root()),
        Route::Health => Ok(http::build_health_response("ok")),
        Route::Upload => upload::handle_upload(req, state).await,
        Route::FileStatus(file_id) => files::handle_file_status(&file_id, state).await,
        Route::Analyze(rfp_id) => files::handle_analyze(&rfp_id, state).await,
    }
}

/// Validate Content-Length header and reject oversized bodies up front
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Result<(), ApiError> {
    let Some(content_length) = req.headers().get("content-length") else {
        return Ok(());
    };
    match content_length.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Err(ApiError::PayloadTooLarge {
                limit: max_body_size,
            })
        }
        Some(_) => Ok(()),
        None => {
            logger::log_warning("Invalid Content-Length value, skipping size check");
            Ok(())
        }
    }
}

fn header_string<B>(req: &Request<B>, name: hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn http_version(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
