//! Outbox repository: the durable queue of webhook notifications.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use super::{format_timestamp, parse_timestamp, Database, DatabaseError};

/// Which external webhook a notification targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExtractionRequest,
    CaseSync,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ExtractionRequest => "extraction_request",
            NotificationKind::CaseSync => "case_sync",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extraction_request" => Ok(NotificationKind::ExtractionRequest),
            "case_sync" => Ok(NotificationKind::CaseSync),
            other => Err(format!("unknown notification kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationState {
    Pending,
    Delivered,
    Dead,
}

impl NotificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationState::Pending => "pending",
            NotificationState::Delivered => "delivered",
            NotificationState::Dead => "dead",
        }
    }
}

impl FromStr for NotificationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(NotificationState::Pending),
            "delivered" => Ok(NotificationState::Delivered),
            "dead" => Ok(NotificationState::Dead),
            other => Err(format!("unknown notification state '{}'", other)),
        }
    }
}

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: i64,
    pub intake_id: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub state: NotificationState,
    pub attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

struct NotificationRow {
    id: i64,
    intake_id: String,
    kind: String,
    payload: String,
    state: String,
    attempts: u32,
    next_attempt_at: String,
    last_error: Option<String>,
    created_at: String,
    delivered_at: Option<String>,
}

impl NotificationRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            intake_id: row.get("intake_id")?,
            kind: row.get("kind")?,
            payload: row.get("payload")?,
            state: row.get("state")?,
            attempts: row.get("attempts")?,
            next_attempt_at: row.get("next_attempt_at")?,
            last_error: row.get("last_error")?,
            created_at: row.get("created_at")?,
            delivered_at: row.get("delivered_at")?,
        })
    }

    fn into_notification(self) -> Result<Notification, DatabaseError> {
        let id = self.id.to_string();
        let malformed = |reason: String| DatabaseError::MalformedRow {
            id: id.clone(),
            reason,
        };
        let timestamp = |value: &str| {
            parse_timestamp(value).ok_or_else(|| malformed(format!("bad timestamp '{}'", value)))
        };

        Ok(Notification {
            id: self.id,
            kind: self.kind.parse().map_err(malformed)?,
            state: self.state.parse().map_err(malformed)?,
            payload: serde_json::from_str(&self.payload)
                .map_err(|e| malformed(format!("bad payload: {}", e)))?,
            attempts: self.attempts,
            next_attempt_at: timestamp(&self.next_attempt_at)?,
            last_error: self.last_error,
            created_at: timestamp(&self.created_at)?,
            delivered_at: self.delivered_at.as_deref().map(timestamp).transpose()?,
            intake_id: self.intake_id,
        })
    }
}

fn collect(rows: Vec<NotificationRow>) -> Vec<Notification> {
    rows.into_iter()
        .filter_map(|row| match row.into_notification() {
            Ok(n) => Some(n),
            Err(e) => {
                log::warn!("Skipping notification row: {}", e);
                None
            }
        })
        .collect()
}

/// Queues a notification, due immediately. Returns its row id.
pub fn enqueue_in(
    conn: &Connection,
    intake_id: &str,
    kind: NotificationKind,
    payload: &serde_json::Value,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let now = format_timestamp(now);
    conn.execute(
        "INSERT INTO notifications (intake_id, kind, payload, state, attempts, next_attempt_at, created_at)
         VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4)",
        params![intake_id, kind.as_str(), payload.to_string(), now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Pending notifications whose next attempt is at or before `now`, oldest first.
///
/// Rows that cannot be decoded are dead-lettered on the spot so they stop
/// occupying the batch.
pub fn due(db: &Database, now: DateTime<Utc>, limit: u32) -> Result<Vec<Notification>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM notifications
             WHERE state = 'pending' AND next_attempt_at <= ?1
             ORDER BY next_attempt_at ASC, id ASC
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![format_timestamp(now), limit], NotificationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut due = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match row.into_notification() {
                Ok(notification) => due.push(notification),
                Err(e) => {
                    log::warn!("Dead-lettering unreadable notification {}: {}", id, e);
                    conn.execute(
                        "UPDATE notifications SET state = 'dead', last_error = ?2 WHERE id = ?1",
                        params![id, e.to_string()],
                    )?;
                }
            }
        }
        Ok(due)
    })
}

pub fn mark_delivered(db: &Database, id: i64, now: DateTime<Utc>) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE notifications
             SET state = 'delivered', attempts = attempts + 1, delivered_at = ?2, last_error = NULL
             WHERE id = ?1",
            params![id, format_timestamp(now)],
        )?;
        Ok(())
    })
}

/// Records a failed attempt. With `retry_at` the notification stays pending
/// until then; without it the notification is dead-lettered.
pub fn mark_failed(
    db: &Database,
    id: i64,
    error: &str,
    retry_at: Option<DateTime<Utc>>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        match retry_at {
            Some(at) => conn.execute(
                "UPDATE notifications
                 SET attempts = attempts + 1, last_error = ?2, next_attempt_at = ?3
                 WHERE id = ?1",
                params![id, error, format_timestamp(at)],
            )?,
            None => conn.execute(
                "UPDATE notifications
                 SET state = 'dead', attempts = attempts + 1, last_error = ?2
                 WHERE id = ?1",
                params![id, error],
            )?,
        };
        Ok(())
    })
}

/// Every notification for one intake, oldest first.
pub fn list_for_intake(db: &Database, intake_id: &str) -> Result<Vec<Notification>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM notifications WHERE intake_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![intake_id], NotificationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(collect(rows))
    })
}
