//! services/api/src/web/extract.rs
//!
//! Server-side text extraction for clients that cannot parse PDFs themselves.

use crate::error::HttpError;
use axum::{extract::Multipart, http::StatusCode, response::Json};
use legal_analyzer_core::extract::{extract_text, FileKind};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ExtractResponse {
    text: String,
    file_name: String,
    file_type: String,
}

/// Extract the text of an uploaded PDF or TXT file.
///
/// Accepts a multipart/form-data request; the first part is the file.
#[utoipa::path(
    post,
    path = "/extract",
    request_body(content_type = "multipart/form-data", description = "The document to extract."),
    responses(
        (status = 200, description = "Extracted text", body = ExtractResponse),
        (status = 400, description = "Missing or unsupported file"),
        (status = 422, description = "The file could not be read")
    )
)]
pub async fn extract_handler(mut multipart: Multipart) -> Result<Json<ExtractResponse>, HttpError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| HttpError::bad_request(format!("Failed to read multipart data: {}", e)))?
        .ok_or_else(|| HttpError::bad_request("Multipart form must include a file"))?;

    let file_name = field.file_name().unwrap_or("untitled.txt").to_string();
    let content_type = field.content_type().map(str::to_string);
    let data = field
        .bytes()
        .await
        .map_err(|e| HttpError::bad_request(format!("Failed to read file bytes: {}", e)))?;

    let kind = FileKind::detect(&file_name, content_type.as_deref()).ok_or_else(|| {
        HttpError::bad_request("Unsupported file format. Please upload PDF or TXT.")
    })?;
    info!("Extracting {} ({} bytes)", file_name, data.len());

    // lopdf parsing is CPU bound.
    let bytes = data.to_vec();
    let text = tokio::task::spawn_blocking(move || extract_text(kind, bytes))
        .await
        .map_err(|e| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            warn!("Extraction of {} failed: {}", file_name, e);
            HttpError::new(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        })?;

    Ok(Json(ExtractResponse {
        text,
        file_name,
        file_type: kind.mime().to_string(),
    }))
}
