//! Routes called back by the extraction and case-sync automations.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use intakedesk::{ExtractedPayload, IntakeStatus};

use super::{run_blocking, success, SuccessResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ExtractedResponse {
    pub success: bool,
    pub status: IntakeStatus,
}

/// POST /api/intakes/extracted
pub async fn extracted(
    State(state): State<AppState>,
    payload: Result<Json<ExtractedPayload>, JsonRejection>,
) -> ApiResult<Json<ExtractedResponse>> {
    let Json(payload) = payload?;
    let intake = run_blocking(&state, move |svc| svc.apply_extraction(payload)).await?;
    Ok(Json(ExtractedResponse {
        success: true,
        status: intake.status,
    }))
}

/// POST /api/intakes/{id}/status
///
/// Sent by the case-sync automation once the retainer email is out.
pub async fn mark_sent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    run_blocking(&state, move |svc| svc.mark_sent(&id)).await?;
    Ok(success())
}
