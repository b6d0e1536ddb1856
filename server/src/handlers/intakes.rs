//! Dashboard and review-surface routes.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use intakedesk::retainer::RetainerEmail;
use intakedesk::{Intake, IntakePatch, PipelineTab};

use super::{fresh, run_blocking, success, SuccessResponse};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub tab: PipelineTab,
}

/// A record plus its speed timer, as the dashboard renders it.
#[derive(Debug, Serialize)]
pub struct IntakeView {
    #[serde(flatten)]
    pub intake: Intake,
    pub elapsed: String,
}

impl IntakeView {
    fn new(intake: Intake, now: DateTime<Utc>) -> Self {
        let elapsed = intake.elapsed(now);
        Self { intake, elapsed }
    }
}

/// GET /api/intakes
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let intakes = run_blocking(&state, move |svc| svc.list(query.tab)).await?;
    let interval = state.polling.for_list(&intakes);
    let now = Utc::now();
    let views: Vec<IntakeView> = intakes
        .into_iter()
        .map(|intake| IntakeView::new(intake, now))
        .collect();
    Ok(fresh(interval, Json(views)))
}

/// GET /api/intakes/{id}
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    let intake = run_blocking(&state, move |svc| svc.get(&id)).await?;
    let interval = state.polling.for_record(&intake);
    Ok(fresh(interval, Json(IntakeView::new(intake, Utc::now()))))
}

/// PUT /api/intakes/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    patch: Result<Json<IntakePatch>, JsonRejection>,
) -> ApiResult<Json<SuccessResponse>> {
    let Json(patch) = patch?;
    run_blocking(&state, move |svc| svc.update(&id, patch)).await?;
    Ok(success())
}

/// POST /api/intakes/{id}/approve
pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    run_blocking(&state, move |svc| svc.approve(&id)).await?;
    Ok(success())
}

/// POST /api/intakes/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    run_blocking(&state, move |svc| svc.reject(&id)).await?;
    Ok(success())
}

/// POST /api/intakes/{id}/reextract
pub async fn reextract(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    run_blocking(&state, move |svc| svc.reextract(&id)).await?;
    Ok(success())
}

/// GET /api/intakes/{id}/email-preview
pub async fn email_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RetainerEmail>> {
    let email = run_blocking(&state, move |svc| svc.email_preview(&id, Utc::now())).await?;
    Ok(Json(email))
}
