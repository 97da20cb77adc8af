//! Appending events to the `hooks` table

use crate::config::WriterConfig;
use crate::connection::{self, ConnectionSlot, DbStats};
use crate::error::{DatabaseError, DatabaseResult};
use crate::retry::retry_on_busy;
use async_trait::async_trait;
use hookscribe_config::{DatabaseSettings, SinkKind};
use hookscribe_core::{Event, EventSink, SinkError, SinkReceipt};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

const INSERT_SQL: &str = "INSERT INTO hooks (
        timestamp, timestamp_iso, session_id, hook_type, tool_name, status,
        error_code, duration_ms, hostname, project_dir, parse_error, data,
        git_branch, git_commit, pid
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

/// Event store handle; cheap to clone, one connection per process
#[derive(Debug, Clone)]
pub struct DatabaseWriter {
    slot: ConnectionSlot,
}

impl DatabaseWriter {
    /// Create a writer; the database is opened on first use
    pub fn new(config: WriterConfig) -> Self {
        Self {
            slot: ConnectionSlot::new(config),
        }
    }

    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        Self::new(WriterConfig::from(settings))
    }

    /// Create a writer and open the database immediately
    pub fn open(config: WriterConfig) -> DatabaseResult<Self> {
        let writer = Self::new(config);
        writer.with_retry("open", |_| Ok(()))?;
        Ok(writer)
    }

    /// In-memory database for tests
    pub fn memory() -> DatabaseResult<Self> {
        Self::open(WriterConfig::memory())
    }

    pub fn config(&self) -> &WriterConfig {
        self.slot.config()
    }

    pub fn path(&self) -> &Path {
        &self.config().path
    }

    /// Run `f` on the connection, retrying the whole call while busy
    pub(crate) fn with_retry<F, T>(&self, operation: &str, mut f: F) -> DatabaseResult<T>
    where
        F: FnMut(&mut Connection) -> DatabaseResult<T>,
    {
        retry_on_busy(&self.config().retry, operation, || {
            self.slot.with_connection(|conn| f(conn))
        })
    }

    /// Append one event and return its row id
    pub fn insert(&self, event: &Event) -> DatabaseResult<i64> {
        let data = serde_json::to_string(event)?;
        let outcome = event.outcome();
        let meta = event.metadata();
        let git = event.git();
        let project_dir = event
            .working_directory()
            .map(|p| p.to_string_lossy().into_owned());

        let id = self.with_retry("insert", |conn| {
            conn.execute(
                INSERT_SQL,
                params![
                    event.timestamp_unix(),
                    event.timestamp().to_rfc3339(),
                    event.session_id(),
                    event.event_type().as_str(),
                    event.tool_name(),
                    outcome.status.as_str(),
                    outcome.error_code.as_deref(),
                    outcome.duration_ms,
                    meta.hostname.as_deref(),
                    project_dir.as_deref(),
                    event.parse_error(),
                    data,
                    git.and_then(|g| g.branch.as_deref()),
                    git.and_then(|g| g.commit.as_deref()),
                    meta.pid,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!(id, hook_type = %event.event_type(), "Event inserted");
        Ok(id)
    }

    /// Page statistics plus row count
    pub fn stats(&self) -> DatabaseResult<DbStats> {
        self.with_retry("stats", |conn| connection::stats(conn))
    }

    /// Row counts per hook type, most frequent first
    pub fn counts_by_hook_type(&self) -> DatabaseResult<Vec<(String, u64)>> {
        self.with_retry("counts", |conn| {
            let mut stmt = conn.prepare(
                "SELECT hook_type, COUNT(*) FROM hooks
                 GROUP BY hook_type ORDER BY COUNT(*) DESC, hook_type",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[async_trait]
impl EventSink for DatabaseWriter {
    fn kind(&self) -> SinkKind {
        SinkKind::Sqlite
    }

    async fn write(&self, event: &Event) -> Result<SinkReceipt, SinkError> {
        let writer = self.clone();
        let event = event.clone();
        let id = tokio::task::spawn_blocking(move || writer.insert(&event))
            .await
            .map_err(|e| DatabaseError::Task(e.to_string()))??;

        Ok(SinkReceipt {
            kind: SinkKind::Sqlite,
            location: format!("{}#{}", self.path().display(), id),
        })
    }
}
