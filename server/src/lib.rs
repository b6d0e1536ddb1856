//! HTTP API for the intake desk: dashboard routes, document upload and the
//! callbacks used by the extraction and case-sync automations.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;

pub use error::{ApiError, ServerError};
pub use routes::router;
pub use server::{run, App};
pub use state::{AppState, CallbackAuth, PollIntervals};
