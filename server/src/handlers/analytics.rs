use axum::extract::State;
use axum::response::Response;
use axum::Json;
use chrono::Utc;

use super::{fresh, run_blocking};
use crate::error::ApiResult;
use crate::state::AppState;

/// GET /api/analytics
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Response> {
    let summary = run_blocking(&state, |svc| svc.dashboard(Utc::now())).await?;
    Ok(fresh(None, Json(summary)))
}
