//! Upload handler
//!
//! Streams the `rfp_file` and `company_data` multipart parts into their
//! category directories under freshly generated identifiers.

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response, StatusCode};
use multer::{Constraints, Field, Multipart, SizeLimit};
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::AppState;
use crate::error::ApiError;
use crate::http;
use crate::logger;
use crate::storage::{Category, StoredFile, UploadStore};

pub const MESSAGE_PROCESSED: &str = "Upload processed";
pub const MESSAGE_NO_FILES: &str = "No files were uploaded";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub rfp_id: Option<String>,
    pub company_data_id: Option<String>,
    pub message: String,
}

impl UploadResponse {
    fn new(rfp_id: Option<String>, company_data_id: Option<String>) -> Self {
        let message = if rfp_id.is_none() && company_data_id.is_none() {
            MESSAGE_NO_FILES
        } else {
            MESSAGE_PROCESSED
        };
        Self {
            rfp_id,
            company_data_id,
            message: message.to_string(),
        }
    }
}

/// Last usable part seen for a category
enum Received {
    Stored(StoredFile),
    Rejected(String),
}

#[derive(Default)]
struct ReceivedParts {
    rfp: Option<Received>,
    company_data: Option<Received>,
}

impl ReceivedParts {
    fn slot(&mut self, category: Category) -> &mut Option<Received> {
        match category {
            Category::Rfp => &mut self.rfp,
            Category::CompanyData => &mut self.company_data,
        }
    }

    /// Record `part` for its category, handing back a file it supersedes
    fn replace(&mut self, category: Category, part: Received) -> Option<StoredFile> {
        let slot = self.slot(category);
        if slot.is_some() {
            logger::log_warning(&format!(
                "Repeated '{}' part replaces the earlier one",
                category.form_field()
            ));
        }
        match slot.replace(part) {
            Some(Received::Stored(previous)) => Some(previous),
            _ => None,
        }
    }

    fn into_stored(self) -> impl Iterator<Item = StoredFile> {
        [self.rfp, self.company_data]
            .into_iter()
            .filter_map(|part| match part {
                Some(Received::Stored(stored)) => Some(stored),
                _ => None,
            })
    }
}

/// `POST /api/upload`
///
/// The whole form is read before anything is reported. An invalid
/// `rfp_file` fails the request and removes every file written for it; an
/// invalid `company_data` fails the request but keeps a stored RFP file.
/// When a field repeats, the last usable part wins.
pub async fn handle_upload<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let mut parts = ReceivedParts::default();

    if let Some(boundary) = multipart_boundary(&req)? {
        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(state.config.http.max_body_size));
        let stream = req.into_body().into_data_stream();
        let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

        if let Err(e) = receive_parts(&mut multipart, &state.store, &mut parts).await {
            discard(&state.store, parts.into_stored()).await;
            return Err(e);
        }
    }

    let response = settle(parts, &state.store).await?;
    Ok(http::json_response(StatusCode::OK, &response))
}

/// Extract the multipart boundary.
///
/// A request that is not `multipart/form-data` at all carries no files and
/// yields `None`; a multipart request without a usable boundary is an error.
fn multipart_boundary<B>(req: &Request<B>) -> Result<Option<String>, ApiError> {
    let Some(content_type) = req.headers().get(CONTENT_TYPE) else {
        return Ok(None);
    };
    let content_type = content_type.to_str().map_err(|_| ApiError::BadRequest {
        message: "Content-Type header contains non-ASCII characters".to_string(),
    })?;

    match multer::parse_boundary(content_type) {
        Ok(boundary) => Ok(Some(boundary)),
        Err(multer::Error::NoMultipart) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn receive_parts(
    multipart: &mut Multipart<'_>,
    store: &UploadStore,
    parts: &mut ReceivedParts,
) -> Result<(), ApiError> {
    while let Some(mut field) = multipart.next_field().await? {
        let Some(category) = field.name().and_then(Category::from_form_field) else {
            logger::log_debug(&format!(
                "Ignoring unexpected form field {:?}",
                field.name().unwrap_or_default()
            ));
            continue;
        };

        // Browsers send an empty part when no file was chosen
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            continue;
        }

        let received = match category.accepted_extension(&filename) {
            Some(extension) => {
                Received::Stored(save_field(&mut field, store, category, &extension).await?)
            }
            None => Received::Rejected(filename),
        };
        if let Some(previous) = parts.replace(category, received) {
            discard(store, [previous]).await;
        }
    }
    Ok(())
}

/// Decide the outcome once the form is complete, `rfp_file` first
async fn settle(parts: ReceivedParts, store: &UploadStore) -> Result<UploadResponse, ApiError> {
    match (parts.rfp, parts.company_data) {
        (Some(Received::Rejected(filename)), company_data) => {
            if let Some(Received::Stored(stored)) = company_data {
                discard(store, [stored]).await;
            }
            Err(reject(Category::Rfp, &filename))
        }
        (_, Some(Received::Rejected(filename))) => Err(reject(Category::CompanyData, &filename)),
        (rfp, company_data) => Ok(UploadResponse::new(stored_id(rfp), stored_id(company_data))),
    }
}

fn reject(category: Category, filename: &str) -> ApiError {
    logger::log_upload_rejected(
        category.form_field(),
        filename,
        category.invalid_type_message(),
    );
    ApiError::InvalidFileType { category }
}

fn stored_id(part: Option<Received>) -> Option<String> {
    match part {
        Some(Received::Stored(stored)) => Some(stored.id),
        _ => None,
    }
}

/// Stream one file part to disk chunk by chunk; a failed copy leaves nothing behind
async fn save_field(
    field: &mut Field<'_>,
    store: &UploadStore,
    category: Category,
    extension: &str,
) -> Result<StoredFile, ApiError> {
    let stored = store.allocate(category, extension);
    let mut file = store.create(&stored).await?;

    match copy_field(field, &mut file).await {
        Ok(written) => {
            logger::log_file_stored(&stored, written);
            Ok(stored)
        }
        Err(e) => {
            drop(file);
            discard(store, [stored]).await;
            Err(e)
        }
    }
}

async fn copy_field(field: &mut Field<'_>, file: &mut File) -> Result<u64, ApiError> {
    let mut written: u64 = 0;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Remove files written for a request that will not report them
async fn discard(store: &UploadStore, files: impl IntoIterator<Item = StoredFile>) {
    for stored in files {
        if let Err(e) = store.remove(&stored).await {
            logger::log_error(&format!(
                "Failed to remove {}: {e}",
                stored.path.display()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::test_support::{body_json, multipart_request, test_state, FilePart};

    fn stored_names(state: &AppState, category: Category) -> Vec<String> {
        std::fs::read_dir(state.store.category_dir(category))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_rfp_upload_stores_file() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[FilePart::file("rfp_file", "proposal.pdf", b"%PDF-1.7 body")]);

        let resp = handle_upload(req, &state).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;

        let rfp_id = json["rfp_id"].as_str().unwrap().to_string();
        assert!(!rfp_id.is_empty());
        assert!(json["company_data_id"].is_null());
        assert_eq!(json["message"], MESSAGE_PROCESSED);

        let names = stored_names(&state, Category::Rfp);
        assert_eq!(names, vec![format!("{rfp_id}.pdf")]);
        let content =
            std::fs::read(state.store.category_dir(Category::Rfp).join(&names[0])).unwrap();
        assert_eq!(content, b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn test_invalid_rfp_extension_rejected() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[FilePart::file("rfp_file", "data.txt", b"plain")]);

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "RFP file must be PDF, DOC, or DOCX");
        assert!(stored_names(&state, Category::Rfp).is_empty());
    }

    #[tokio::test]
    async fn test_company_data_csv() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[FilePart::file("company_data", "company.csv", b"a,b\n1,2\n")]);

        let json = body_json(handle_upload(req, &state).await.unwrap()).await;
        let id = json["company_data_id"].as_str().unwrap();
        assert!(json["rfp_id"].is_null());
        assert_eq!(stored_names(&state, Category::CompanyData), vec![format!("{id}.csv")]);
    }

    #[tokio::test]
    async fn test_invalid_company_data_keeps_earlier_rfp() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[
            FilePart::file("rfp_file", "bid.docx", b"docx"),
            FilePart::file("company_data", "company.xlsx", b"xlsx"),
        ]);

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.detail(), "Company data file must be JSON or CSV");
        assert_eq!(stored_names(&state, Category::Rfp).len(), 1);
        assert!(stored_names(&state, Category::CompanyData).is_empty());
    }

    #[tokio::test]
    async fn test_both_files() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[
            FilePart::file("company_data", "profile.JSON", b"{}"),
            FilePart::file("rfp_file", "Tender.PDF", b"pdf"),
        ]);

        let json = body_json(handle_upload(req, &state).await.unwrap()).await;
        let rfp_id = json["rfp_id"].as_str().unwrap();
        let company_id = json["company_data_id"].as_str().unwrap();
        assert_ne!(rfp_id, company_id);
        assert_eq!(stored_names(&state, Category::Rfp), vec![format!("{rfp_id}.PDF")]);
        assert_eq!(
            stored_names(&state, Category::CompanyData),
            vec![format!("{company_id}.JSON")]
        );
    }

    #[tokio::test]
    async fn test_no_files() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[FilePart::text("note", "hello")]);

        let json = body_json(handle_upload(req, &state).await.unwrap()).await;
        assert!(json["rfp_id"].is_null());
        assert!(json["company_data_id"].is_null());
        assert_eq!(json["message"], MESSAGE_NO_FILES);
    }

    #[tokio::test]
    async fn test_empty_file_part_counts_as_absent() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[FilePart::file("rfp_file", "", b"")]);

        let json = body_json(handle_upload(req, &state).await.unwrap()).await;
        assert_eq!(json["message"], MESSAGE_NO_FILES);
        assert!(stored_names(&state, Category::Rfp).is_empty());
    }

    #[tokio::test]
    async fn test_repeated_part_last_wins() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[
            FilePart::file("rfp_file", "first.pdf", b"1"),
            FilePart::file("rfp_file", "second.pdf", b"2"),
        ]);

        let json = body_json(handle_upload(req, &state).await.unwrap()).await;
        let rfp_id = json["rfp_id"].as_str().unwrap();
        let names = stored_names(&state, Category::Rfp);
        assert_eq!(names, vec![format!("{rfp_id}.pdf")]);
        let content = std::fs::read(state.store.category_dir(Category::Rfp).join(&names[0])).unwrap();
        assert_eq!(content, b"2");
    }

    #[tokio::test]
    async fn test_repeated_part_last_invalid_rejects() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[
            FilePart::file("rfp_file", "first.pdf", b"1"),
            FilePart::file("rfp_file", "second.txt", b"2"),
        ]);

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(stored_names(&state, Category::Rfp).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rfp_after_company_data_writes_nothing() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[
            FilePart::file("company_data", "company.csv", b"a,b\n"),
            FilePart::file("rfp_file", "data.txt", b"text"),
        ]);

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "RFP file must be PDF, DOC, or DOCX");
        assert!(stored_names(&state, Category::CompanyData).is_empty());
        assert!(stored_names(&state, Category::Rfp).is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rfp_reported_before_invalid_company_data() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[
            FilePart::file("company_data", "company.xlsx", b"xlsx"),
            FilePart::file("rfp_file", "data.txt", b"text"),
        ]);

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.detail(), "RFP file must be PDF, DOC, or DOCX");
    }

    #[tokio::test]
    async fn test_invalid_company_data_before_rfp_keeps_rfp() {
        let (_dir, state) = test_state().await;
        let req = multipart_request(&[
            FilePart::file("company_data", "company.xlsx", b"xlsx"),
            FilePart::file("rfp_file", "bid.pdf", b"pdf"),
        ]);

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.detail(), "Company data file must be JSON or CSV");
        assert_eq!(stored_names(&state, Category::Rfp).len(), 1);
        assert!(stored_names(&state, Category::CompanyData).is_empty());
    }

    #[tokio::test]
    async fn test_streamed_body_over_limit() {
        let (_dir, mut state) = test_state().await;
        state.config.http.max_body_size = 256;
        let content = vec![b'x'; 4096];
        let req = multipart_request(&[
            FilePart::file("company_data", "company.csv", b"a,b\n"),
            FilePart::file("rfp_file", "large.pdf", &content),
        ]);
        // No Content-Length header: only the streaming limit applies
        assert!(req.headers().get("content-length").is_none());

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(stored_names(&state, Category::Rfp).is_empty());
        assert!(stored_names(&state, Category::CompanyData).is_empty());
    }

    #[tokio::test]
    async fn test_non_multipart_body_has_no_files() {
        let (_dir, state) = test_state().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();

        let json = body_json(handle_upload(req, &state).await.unwrap()).await;
        assert_eq!(json["message"], MESSAGE_NO_FILES);
    }

    #[tokio::test]
    async fn test_multipart_without_boundary_rejected() {
        let (_dir, state) = test_state().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "multipart/form-data")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_truncated_multipart_rejected() {
        let (_dir, state) = test_state().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "multipart/form-data; boundary=XYZ")
            .body(Full::new(Bytes::from_static(
                b"--XYZ\r\nContent-Disposition: form-data; name=\"rfp_file\"; filename=\"a.pdf\"\r\n\r\npartial",
            )))
            .unwrap();

        let err = handle_upload(req, &state).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
