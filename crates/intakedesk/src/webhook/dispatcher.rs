//! Background delivery of queued notifications.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::client::WebhookClient;
use super::error::WebhookError;
use super::Outbox;
use crate::config::OutboxConfig;
use crate::db::{self, outbox_repo, Database, DatabaseError};
use crate::sanitize::redact_url;

/// Exponential backoff with a cap and a dead-letter threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub max: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &OutboxConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base: Duration::from_secs(config.base_backoff_secs),
            max: Duration::from_secs(config.max_backoff_secs),
        }
    }

    /// Delay before the next try once `attempts` deliveries have failed:
    /// `min(base * 2^(attempts - 1), max)`.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// `None` once the attempt budget is spent.
    pub fn next_attempt_after(&self, attempts: u32) -> Option<Duration> {
        (attempts < self.max_attempts).then(|| self.backoff(attempts))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&OutboxConfig::default())
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub retried: usize,
    pub dead: usize,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.retried + self.dead
    }
}

pub struct OutboxDispatcher {
    db: Database,
    outbox: Outbox,
    client: WebhookClient,
    policy: RetryPolicy,
    poll_interval: Duration,
    batch_size: u32,
}

impl OutboxDispatcher {
    pub fn new(db: Database, outbox: Outbox, client: WebhookClient, config: &OutboxConfig) -> Self {
        Self {
            db,
            outbox,
            client,
            policy: RetryPolicy::from_config(config),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            batch_size: config.batch_size,
        }
    }

    /// Runs until `cancel` fires, draining due notifications on every poll
    /// tick or wake-up.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            poll_secs = self.poll_interval.as_secs(),
            max_attempts = self.policy.max_attempts,
            "outbox dispatcher started"
        );

        loop {
            match self.dispatch_due(db::now()).await {
                Ok(report) if report.attempted() > 0 => debug!(?report, "outbox pass complete"),
                Ok(_) => {}
                Err(e) => error!("outbox pass failed: {}", e),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.outbox.woken() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("outbox dispatcher stopped");
    }

    /// Delivers every notification due at `now`, one batch at a time.
    pub async fn dispatch_due(&self, now: DateTime<Utc>) -> Result<DispatchReport, DatabaseError> {
        let mut report = DispatchReport::default();
        let batch_size = self.batch_size;
        let batch = self
            .blocking(move |db| outbox_repo::due(db, now, batch_size))
            .await?;

        for notification in batch {
            let attempts = notification.attempts + 1;
            let result = match self.outbox.targets().url_for(notification.kind) {
                Some(url) => {
                    debug!(
                        id = notification.id,
                        kind = %notification.kind,
                        url = %redact_url(url),
                        attempt = attempts,
                        "delivering notification"
                    );
                    self.client.post_json(url, &notification.payload).await
                }
                None => Err(WebhookError::NotConfigured(notification.kind)),
            };

            match result {
                Ok(()) => {
                    let id = notification.id;
                    let delivered_at = db::now();
                    self.blocking(move |db| outbox_repo::mark_delivered(db, id, delivered_at))
                        .await?;
                    info!(
                        id = notification.id,
                        intake_id = %notification.intake_id,
                        kind = %notification.kind,
                        "notification delivered"
                    );
                    report.delivered += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    let retry_at = match &e {
                        WebhookError::NotConfigured(_) => None,
                        _ => self
                            .policy
                            .next_attempt_after(attempts)
                            .and_then(|delay| chrono::Duration::from_std(delay).ok())
                            .map(|delay| now + delay),
                    };
                    let id = notification.id;
                    let error = message.clone();
                    self.blocking(move |db| outbox_repo::mark_failed(db, id, &error, retry_at))
                        .await?;

                    match retry_at {
                        Some(at) => {
                            warn!(
                                id = notification.id,
                                kind = %notification.kind,
                                attempt = attempts,
                                retry_at = %at,
                                "notification delivery failed: {}",
                                message
                            );
                            report.retried += 1;
                        }
                        None => {
                            error!(
                                id = notification.id,
                                intake_id = %notification.intake_id,
                                kind = %notification.kind,
                                attempts,
                                "notification dead-lettered: {}",
                                message
                            );
                            report.dead += 1;
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Runs a repository call on the blocking pool; rusqlite is synchronous.
    async fn blocking<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Database) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }
}
