//! File status, analysis placeholder and service info handlers

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::config::AppState;
use crate::error::ApiError;
use crate::http;
use crate::storage::Category;

pub const STATUS_STORED: &str = "stored";
pub const ANALYSIS_COMPLETED: &str = "completed";

#[derive(Debug, Serialize)]
pub struct FileStatus {
    pub file_id: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub filename: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub rfp_id: String,
    pub analysis_status: &'static str,
    pub results: AnalysisResults,
}

/// Fixed analysis payload; no document content is ever read
#[derive(Debug, Serialize)]
pub struct AnalysisResults {
    pub summary: &'static str,
    pub key_requirements: [&'static str; 2],
    pub recommended_actions: [&'static str; 2],
}

impl AnalysisResults {
    pub const PLACEHOLDER: Self = Self {
        summary: "This is a placeholder for RFP analysis results",
        key_requirements: ["Requirement 1", "Requirement 2"],
        recommended_actions: ["Action 1", "Action 2"],
    };
}

/// `GET /`
pub fn handle_root() -> Response<Full<Bytes>> {
    http::json_response(
        StatusCode::OK,
        &serde_json::json!({ "message": "RFP Analysis API is running." }),
    )
}

/// `GET /api/files/{file_id}`
pub async fn handle_file_status(
    file_id: &str,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ApiError> {
    let (category, filename) = state
        .store
        .locate(file_id)
        .await?
        .ok_or(ApiError::NotFound { resource: "File" })?;

    let status = FileStatus {
        file_id: file_id.to_string(),
        category,
        filename,
        status: STATUS_STORED,
    };
    Ok(http::json_response(StatusCode::OK, &status))
}

/// `POST /api/analyze/{rfp_id}`
pub async fn handle_analyze(
    rfp_id: &str,
    state: &AppState,
) -> Result<Response<Full<Bytes>>, ApiError> {
    if state.store.find(Category::Rfp, rfp_id).await?.is_none() {
        return Err(ApiError::NotFound {
            resource: "RFP file",
        });
    }

    let analysis = AnalysisResponse {
        rfp_id: rfp_id.to_string(),
        analysis_status: ANALYSIS_COMPLETED,
        results: AnalysisResults::PLACEHOLDER,
    };
    Ok(http::json_response(StatusCode::OK, &analysis))
}
