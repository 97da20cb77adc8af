//! Per-process SQLite connection management
//!
//! A connection is never shared across processes: the slot remembers the
//! pid that opened it and transparently reopens after a fork.

use crate::config::WriterConfig;
use crate::error::{DatabaseError, DatabaseResult};
use crate::schema;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

struct ProcessConnection {
    pid: u32,
    conn: Connection,
}

/// Lazily opened, pid-checked connection shared by clones of the writer
#[derive(Clone)]
pub struct ConnectionSlot {
    inner: Arc<Mutex<Option<ProcessConnection>>>,
    config: WriterConfig,
}

impl std::fmt::Debug for ConnectionSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("path", &self.config.path)
            .finish_non_exhaustive()
    }
}

impl ConnectionSlot {
    pub fn new(config: WriterConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Run `f` on this process's connection, opening it first if needed
    ///
    /// A failed open leaves the slot empty so the next call tries again.
    pub fn with_connection<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&mut Connection) -> DatabaseResult<T>,
    {
        let pid = std::process::id();
        let mut slot = self.inner.lock();

        if slot.as_ref().is_some_and(|held| held.pid != pid) {
            debug!(pid, "Connection was opened by another process, reopening");
            abandon_inherited(slot.take());
        }

        if slot.is_none() {
            let conn = open(&self.config)?;
            *slot = Some(ProcessConnection { pid, conn });
        }

        match slot.as_mut() {
            Some(held) => f(&mut held.conn),
            None => Err(DatabaseError::Connection("connection slot empty".into())),
        }
    }

    /// Drop the cached connection
    pub fn reset(&self) {
        let held = self.inner.lock().take();
        match held {
            Some(held) if held.pid != std::process::id() => abandon_inherited(Some(held)),
            other => drop(other),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().is_some()
    }
}

/// Leak a connection inherited across `fork`
///
/// Closing it in the child can release POSIX locks still held by the parent.
fn abandon_inherited(held: Option<ProcessConnection>) {
    if let Some(held) = held {
        std::mem::forget(held);
    }
}

/// Open, configure and migrate a connection
pub fn open(config: &WriterConfig) -> DatabaseResult<Connection> {
    debug!(path = ?config.path, "Opening SQLite connection");

    let mut conn = if config.is_memory() {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Connection(format!("Failed to create directory: {e}"))
                })?;
            }
        }
        Connection::open(&config.path)?
    };

    conn.busy_timeout(config.busy_timeout)?;
    configure_pragmas(&conn, config)?;
    schema::apply_migrations(&mut conn)?;

    debug!("SQLite connection ready");
    Ok(conn)
}

/// Configure SQLite PRAGMA settings
fn configure_pragmas(conn: &Connection, config: &WriterConfig) -> DatabaseResult<()> {
    debug!("Configuring SQLite pragmas");

    // WAL lets readers proceed while one process writes
    if !config.is_memory() {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    }
    conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
    conn.execute_batch(&format!("PRAGMA cache_size = {};", config.cache_size))?;
    conn.execute_batch("PRAGMA temp_store = MEMORY;")?;
    if config.mmap_size > 0 {
        conn.execute_batch(&format!("PRAGMA mmap_size = {};", config.mmap_size))?;
    }

    Ok(())
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub page_count: u64,
    pub page_size: u64,
    pub freelist_count: u64,
    pub total_size_bytes: u64,
    pub row_count: u64,
}

pub(crate) fn stats(conn: &Connection) -> DatabaseResult<DbStats> {
    let page_count: i64 = conn.query_row("PRAGMA page_count;", [], |row| row.get(0))?;
    let page_size: i64 = conn.query_row("PRAGMA page_size;", [], |row| row.get(0))?;
    let freelist_count: i64 = conn.query_row("PRAGMA freelist_count;", [], |row| row.get(0))?;
    let row_count: i64 = conn.query_row("SELECT COUNT(*) FROM hooks", [], |row| row.get(0))?;

    Ok(DbStats {
        page_count: page_count as u64,
        page_size: page_size as u64,
        freelist_count: freelist_count as u64,
        total_size_bytes: (page_count * page_size) as u64,
        row_count: row_count as u64,
    })
}
