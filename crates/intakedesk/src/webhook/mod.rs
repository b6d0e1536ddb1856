//! Webhook notifications: the transactional outbox and its dispatcher.
//!
//! Lifecycle transitions call [`Outbox::enqueue_in`] inside their own
//! database transaction. The [`OutboxDispatcher`] delivers queued rows in
//! the background, so a slow or failing webhook never blocks or rolls back
//! a status change.

pub mod client;
pub mod dispatcher;
pub mod error;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Notify;
use tracing::warn;

pub use crate::db::outbox_repo::{Notification, NotificationKind, NotificationState};
pub use client::WebhookClient;
pub use dispatcher::{DispatchReport, OutboxDispatcher, RetryPolicy};
pub use error::WebhookError;

use crate::config::WebhooksConfig;
use crate::db::{outbox_repo, DatabaseError};
use crate::error::ConfigError;
use crate::secrets::{SecretError, SecretRef};

/// Resolved webhook URLs. A `None` target disables that notification kind.
#[derive(Debug, Default)]
pub struct WebhookTargets {
    extraction: Option<SecretString>,
    case_sync: Option<SecretString>,
}

impl WebhookTargets {
    pub fn new(extraction: Option<&str>, case_sync: Option<&str>) -> Self {
        Self {
            extraction: extraction.map(|u| SecretString::from(u.to_string())),
            case_sync: case_sync.map(|u| SecretString::from(u.to_string())),
        }
    }

    /// Resolves both targets. An unset environment variable disables the
    /// target with a warning instead of failing startup.
    pub fn from_config(config: &WebhooksConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            extraction: resolve_target("extraction", &config.extraction)?,
            case_sync: resolve_target("case_sync", &config.case_sync)?,
        })
    }

    pub fn url_for(&self, kind: NotificationKind) -> Option<&str> {
        let target = match kind {
            NotificationKind::ExtractionRequest => &self.extraction,
            NotificationKind::CaseSync => &self.case_sync,
        };
        target
            .as_ref()
            .map(|s| s.expose_secret())
            .filter(|url| !url.is_empty())
    }

    pub fn is_configured(&self, kind: NotificationKind) -> bool {
        self.url_for(kind).is_some()
    }
}

fn resolve_target(
    name: &'static str,
    secret: &SecretRef,
) -> Result<Option<SecretString>, ConfigError> {
    match secret.resolve() {
        Ok(url) => Ok(Some(url)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(SecretError::EnvVarNotSet { name: var }) => {
            warn!("{} webhook disabled: environment variable {} is not set", name, var);
            Ok(None)
        }
        Err(source) => Err(ConfigError::Secret { name, source }),
    }
}

/// Write side of the outbox, shared by the service and the dispatcher.
#[derive(Debug, Clone)]
pub struct Outbox {
    targets: Arc<WebhookTargets>,
    wake: Arc<Notify>,
}

impl Outbox {
    pub fn new(targets: WebhookTargets) -> Self {
        Self {
            targets: Arc::new(targets),
            wake: Arc::new(Notify::new()),
        }
    }

    pub fn targets(&self) -> &WebhookTargets {
        &self.targets
    }

    /// Queues a notification on the caller's connection (normally an open
    /// transaction). Returns `false` when the target is not configured.
    pub fn enqueue_in(
        &self,
        conn: &Connection,
        intake_id: &str,
        kind: NotificationKind,
        payload: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        if !self.targets.is_configured(kind) {
            warn!(intake_id, kind = %kind, "webhook not configured; notification skipped");
            return Ok(false);
        }
        outbox_repo::enqueue_in(conn, intake_id, kind, payload, now)?;
        Ok(true)
    }

    /// Wakes the dispatcher. Call after the enqueuing transaction commits.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub(crate) async fn woken(&self) {
        self.wake.notified().await;
    }
}
