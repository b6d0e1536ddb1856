//! Police-report upload.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use intakedesk::Upload;

use super::run_blocking;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "pdf";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub intake_id: String,
}

/// POST /api/intakes
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some(Upload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| ApiError::BadRequest(format!("No '{}' file provided", UPLOAD_FIELD)))?;
    tracing::debug!(filename = %upload.filename, bytes = upload.bytes.len(), "upload received");

    let intake = run_blocking(&state, move |svc| svc.upload(upload)).await?;
    Ok(Json(UploadResponse {
        intake_id: intake.id,
    }))
}
