//! Request handlers for the intake API.

pub mod analytics;
pub mod callbacks;
pub mod intakes;
pub mod upload;

use std::time::Duration;

use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use intakedesk::IntakeService;

use crate::error::ApiResult;
use crate::state::AppState;

/// Seconds until the client should refresh; present only while a record is
/// still uploading or extracting.
pub const POLL_INTERVAL_HEADER: &str = "x-poll-interval";

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub(crate) fn success() -> Json<SuccessResponse> {
    Json(SuccessResponse { success: true })
}

/// Runs a service call on the blocking pool. SQLite and file writes are
/// synchronous.
pub(crate) async fn run_blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&IntakeService) -> intakedesk::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || f(&service)).await?;
    Ok(result?)
}

/// Uncached response, with a poll hint when `interval` is set.
pub(crate) fn fresh<T: IntoResponse>(interval: Option<Duration>, body: T) -> Response {
    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Some(interval) = interval {
        headers.insert(POLL_INTERVAL_HEADER, HeaderValue::from(interval.as_secs()));
    }
    response
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
