//! Bearer-token check for the pipeline callback routes.
//!
//! The dashboard routes are not authenticated here. The callbacks are
//! called by outside automation and are guarded only when a token is
//! configured.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use secrecy::ExposeSecret;

use crate::error::ApiError;
use crate::state::CallbackAuth;

/// Rejects callback requests without a matching `Authorization: Bearer`
/// header. Passes everything through when no token is configured.
pub async fn callback_auth(
    State(auth): State<CallbackAuth>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = auth.token.as_ref() else {
        return Ok(next.run(request).await);
    };

    let rejection = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        Some(token) if token == expected.expose_secret() => None,
        Some(_) => Some("Invalid bearer token"),
        None => Some("Missing bearer token"),
    };

    match rejection {
        None => Ok(next.run(request).await),
        Some(reason) => {
            tracing::warn!(path = %request.uri().path(), "callback rejected: {}", reason);
            Err(ApiError::Unauthorized(reason))
        }
    }
}
