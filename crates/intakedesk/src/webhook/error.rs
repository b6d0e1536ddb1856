//! Webhook delivery error types.

use thiserror::Error;

/// Errors that can occur while delivering a notification.
#[derive(Error, Debug)]
pub enum WebhookError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Connection, timeout or other transport failure.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The target answered with a non-2xx status.
    #[error("Webhook returned HTTP {status}")]
    Status { status: u16 },

    /// No URL is configured for this kind of notification.
    #[error("No webhook configured for {0}")]
    NotConfigured(crate::db::outbox_repo::NotificationKind),
}

pub type Result<T> = std::result::Result<T, WebhookError>;
