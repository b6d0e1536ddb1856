//! Router assembly.

use std::path::Path;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::callback_auth;
use crate::handlers::{self, analytics, callbacks, intakes, upload};
use crate::state::AppState;

/// Room for multipart framing on top of the document itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Builds the full application router.
///
/// - `GET /health` and `/documents/*` are public
/// - `/api/intakes*` and `/api/analytics` serve the dashboard
/// - `POST /api/intakes/extracted` and `POST /api/intakes/{id}/status` are
///   the pipeline callbacks, behind the bearer check when a token is set
pub fn router(state: AppState, documents_dir: &Path) -> Router {
    let body_limit = state
        .service
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD);

    let callback_routes = Router::new()
        .route("/api/intakes/extracted", post(callbacks::extracted))
        .route("/api/intakes/{id}/status", post(callbacks::mark_sent))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            callback_auth,
        ))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/intakes", get(intakes::list).post(upload::upload))
        .route("/api/intakes/{id}", get(intakes::get).put(intakes::update))
        .route("/api/intakes/{id}/approve", post(intakes::approve))
        .route("/api/intakes/{id}/reject", post(intakes::reject))
        .route("/api/intakes/{id}/reextract", post(intakes::reextract))
        .route("/api/intakes/{id}/email-preview", get(intakes::email_preview))
        .route("/api/analytics", get(analytics::dashboard))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .merge(callback_routes)
        .nest_service("/documents", ServeDir::new(documents_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
