//! Shared helpers for handler tests

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response};
use tempfile::TempDir;

use crate::config::{AppState, Config};

pub const BOUNDARY: &str = "----rfp-test-boundary";

/// App state whose upload root lives in a fresh temp directory
pub async fn test_state() -> (TempDir, AppState) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::load_from(dir.path().join("absent").to_str().unwrap()).unwrap();
    config.storage.upload_dir = dir.path().join("uploads").to_string_lossy().into_owned();
    config.logging.access_log = false;

    let state = AppState::new(&config);
    state.store.ensure_layout().await.unwrap();
    (dir, state)
}

/// One multipart form part
pub struct FilePart<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

impl<'a> FilePart<'a> {
    pub const fn file(name: &'a str, filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content,
        }
    }

    pub const fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n",
                part.name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(parts: &[FilePart<'_>]) -> Request<Full<Bytes>> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Full::new(Bytes::from(multipart_body(parts))))
        .unwrap()
}

pub async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
