//! Schema management and migrations
//!
//! Many short-lived processes may open the database at once, so every step
//! is safe to repeat: migrations run under `BEGIN IMMEDIATE`, the version is
//! re-read once the write lock is held, DDL is existence-checked, and version
//! rows are inserted with `INSERT OR IGNORE`.

use crate::error::{DatabaseError, DatabaseResult};
use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info};

/// Schema version - increment when adding a migration
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations
pub fn apply_migrations(conn: &mut Connection) -> DatabaseResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    // Cheap check without taking the write lock
    if current_version(conn)? >= SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = current_version(&tx)?;
    debug!(current_version = current, target_version = SCHEMA_VERSION, "Checking migrations");

    if current < SCHEMA_VERSION {
        info!(from = current, to = SCHEMA_VERSION, "Applying schema migrations");
        if current < 1 {
            apply_migration_v1(&tx)?;
        }
        if current < 2 {
            apply_migration_v2(&tx)?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Highest recorded schema version, 0 for a fresh database
pub fn current_version(conn: &Connection) -> DatabaseResult<i32> {
    let version: Option<i32> =
        conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    Ok(version.unwrap_or(0))
}

/// Record that a migration was applied
fn record_migration(conn: &Connection, version: i32) -> DatabaseResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> DatabaseResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        [table, column],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    definition: &str,
) -> DatabaseResult<()> {
    if column_exists(conn, table, column)? {
        debug!(table, column, "Column already present");
        return Ok(());
    }
    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition};"))?;
    Ok(())
}

/// Migration v1: hooks table and its single-column indexes
fn apply_migration_v1(conn: &Connection) -> DatabaseResult<()> {
    debug!("Applying migration v1: hooks table");

    conn.execute_batch(SCHEMA_V1).map_err(|e| {
        if crate::error::is_busy(&e) {
            DatabaseError::Rusqlite(e)
        } else {
            DatabaseError::Schema(format!("Failed to apply v1 schema: {e}"))
        }
    })?;

    record_migration(conn, 1)?;
    info!("Migration v1 applied successfully");
    Ok(())
}

/// Migration v2: git and pid columns, session timeline index
fn apply_migration_v2(conn: &Connection) -> DatabaseResult<()> {
    debug!("Applying migration v2: git/pid columns");

    add_column_if_missing(conn, "hooks", "git_branch", "TEXT")?;
    add_column_if_missing(conn, "hooks", "git_commit", "TEXT")?;
    add_column_if_missing(conn, "hooks", "pid", "INTEGER")?;
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_hooks_session_timestamp ON hooks(session_id, timestamp);",
    )?;

    record_migration(conn, 2)?;
    info!("Migration v2 applied successfully");
    Ok(())
}

/// Initial schema SQL
const SCHEMA_V1: &str = r#"
-- ============================================================================
-- TABLE: hooks
-- ============================================================================
-- One row per recorded hook invocation. `data` holds the full serialized
-- event; the scalar columns exist only so they can be indexed.

CREATE TABLE IF NOT EXISTS hooks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,            -- unix epoch seconds
    timestamp_iso TEXT NOT NULL,        -- RFC 3339, UTC
    session_id TEXT NOT NULL,
    hook_type TEXT NOT NULL,
    tool_name TEXT NOT NULL,
    status TEXT NOT NULL,
    error_code TEXT,
    duration_ms INTEGER,
    hostname TEXT,
    project_dir TEXT,
    parse_error INTEGER NOT NULL DEFAULT 0,
    data TEXT NOT NULL CHECK (json_valid(data))
);

CREATE INDEX IF NOT EXISTS idx_hooks_timestamp ON hooks(timestamp);
CREATE INDEX IF NOT EXISTS idx_hooks_session ON hooks(session_id);
CREATE INDEX IF NOT EXISTS idx_hooks_hook_type ON hooks(hook_type);
CREATE INDEX IF NOT EXISTS idx_hooks_tool_name ON hooks(tool_name);
CREATE INDEX IF NOT EXISTS idx_hooks_status ON hooks(status);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn columns(conn: &Connection) -> Vec<String> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('hooks')").unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), SCHEMA_VERSION);
        let cols = columns(&conn);
        for expected in ["timestamp", "hook_type", "data", "git_branch", "git_commit", "pid"] {
            assert!(cols.iter().any(|c| c == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_upgrade_from_v1() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT (datetime('now')));",
            )
            .unwrap();
            conn.execute_batch(SCHEMA_V1).unwrap();
            record_migration(&conn, 1).unwrap();
            conn.execute(
                "INSERT INTO hooks (timestamp, timestamp_iso, session_id, hook_type, tool_name, status, data)
                 VALUES (1.0, '1970-01-01T00:00:01Z', 's', 'Stop', 'SessionStop', 'recorded', '{}')",
                [],
            )
            .unwrap();
        }

        let mut conn = Connection::open(&path).unwrap();
        apply_migrations(&mut conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 2);
        assert!(columns(&conn).iter().any(|c| c == "git_branch"));
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM hooks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_partial_v2_is_completed() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version INTEGER PRIMARY KEY, applied_at TEXT NOT NULL DEFAULT (datetime('now')));",
        )
        .unwrap();
        conn.execute_batch(SCHEMA_V1).unwrap();
        record_migration(&conn, 1).unwrap();
        // Column added by a process that died before recording v2
        conn.execute_batch("ALTER TABLE hooks ADD COLUMN git_branch TEXT;")
            .unwrap();

        apply_migrations(&mut conn).unwrap();

        assert_eq!(current_version(&conn).unwrap(), 2);
        assert!(columns(&conn).iter().any(|c| c == "pid"));
    }

    #[test]
    fn test_json_check_constraint() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();

        let result = conn.execute(
            "INSERT INTO hooks (timestamp, timestamp_iso, session_id, hook_type, tool_name, status, data)
             VALUES (1.0, 'x', 's', 'Stop', 'SessionStop', 'recorded', 'not json')",
            [],
        );
        assert!(result.is_err());
    }
}
