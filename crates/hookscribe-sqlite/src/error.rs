//! Error types for the SQLite event store

use hookscribe_config::SinkKind;
use hookscribe_core::SinkError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// SQLite event store error type
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Database file could not be opened or its directory created
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema/migration error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Invalid query parameters
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The database stayed busy for the whole retry budget
    #[error("Database still busy after {attempts} attempts ({waited_ms} ms of backoff): {last}")]
    RetriesExhausted {
        /// Attempts made, including the first
        attempts: u32,
        /// Total time spent sleeping between attempts
        waited_ms: u64,
        /// The last busy/locked error
        #[source]
        last: rusqlite::Error,
    },

    /// A blocking database task was cancelled or panicked
    #[error("Database task failed: {0}")]
    Task(String),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

impl DatabaseError {
    /// Whether this is a transient `SQLITE_BUSY`/`SQLITE_LOCKED` failure
    pub fn is_busy(&self) -> bool {
        match self {
            DatabaseError::Rusqlite(err) => is_busy(err),
            _ => false,
        }
    }
}

pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            matches!(
                code.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            )
        }
        _ => false,
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        DatabaseError::Serialization(err.to_string())
    }
}

impl From<DatabaseError> for SinkError {
    fn from(err: DatabaseError) -> Self {
        SinkError::Backend {
            kind: SinkKind::Sqlite,
            message: err.to_string(),
        }
    }
}
