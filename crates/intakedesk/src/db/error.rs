//! Errors raised by the intake store.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The directory holding the database file could not be created.
    #[error("Cannot prepare database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema migration v{version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A row holds a status, option or timestamp the model cannot represent.
    #[error("Malformed row '{id}': {reason}")]
    MalformedRow { id: String, reason: String },

    /// Another thread panicked while holding the connection.
    #[error("Database connection lock poisoned")]
    LockPoisoned,

    #[error("Database task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}
