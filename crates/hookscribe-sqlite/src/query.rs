//! Reading recorded events back

use crate::error::{DatabaseError, DatabaseResult};
use crate::writer::DatabaseWriter;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Row};
use serde::Serialize;
use serde_json::Value;

/// Filters for [`DatabaseWriter::query`]; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookQuery {
    pub hook_type: Option<String>,
    pub tool_name: Option<String>,
    pub session_id: Option<String>,
    pub status: Option<String>,
    /// Only events at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Maximum rows; `Some(0)` means no limit, `None` means [`HookQuery::DEFAULT_LIMIT`]
    pub limit: Option<usize>,
}

impl HookQuery {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook_type(mut self, hook_type: impl Into<String>) -> Self {
        self.hook_type = Some(hook_type.into());
        self
    }

    pub fn tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_sql(&self) -> DatabaseResult<(String, Vec<SqlValue>)> {
        let mut sql = String::from(
            "SELECT id, timestamp, timestamp_iso, session_id, hook_type, tool_name, status,
                    error_code, duration_ms, hostname, project_dir, parse_error,
                    git_branch, git_commit, pid, data
             FROM hooks WHERE 1 = 1",
        );
        let mut params = Vec::new();

        let text_filters = [
            ("hook_type", &self.hook_type),
            ("tool_name", &self.tool_name),
            ("session_id", &self.session_id),
            ("status", &self.status),
        ];
        for (column, value) in text_filters {
            if let Some(value) = value {
                params.push(SqlValue::Text(value.clone()));
                sql.push_str(&format!(" AND {column} = ?{}", params.len()));
            }
        }

        if let Some(since) = self.since {
            params.push(SqlValue::Real(since.timestamp_micros() as f64 / 1_000_000.0));
            sql.push_str(&format!(" AND timestamp >= ?{}", params.len()));
        }

        sql.push_str(" ORDER BY timestamp DESC, id DESC");

        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        if limit > 0 {
            let limit = i64::try_from(limit)
                .map_err(|_| DatabaseError::Query(format!("limit too large: {limit}")))?;
            params.push(SqlValue::Integer(limit));
            sql.push_str(&format!(" LIMIT ?{}", params.len()));
        }

        Ok((sql, params))
    }
}

/// One row of the `hooks` table
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    pub timestamp: f64,
    pub timestamp_iso: String,
    pub session_id: String,
    pub hook_type: String,
    pub tool_name: String,
    pub status: String,
    pub error_code: Option<String>,
    pub duration_ms: Option<i64>,
    pub hostname: Option<String>,
    pub project_dir: Option<String>,
    pub parse_error: bool,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub pid: Option<i64>,
    /// The serialized event
    pub data: Value,
}

impl StoredRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<(Self, String)> {
        let record = Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            timestamp_iso: row.get(2)?,
            session_id: row.get(3)?,
            hook_type: row.get(4)?,
            tool_name: row.get(5)?,
            status: row.get(6)?,
            error_code: row.get(7)?,
            duration_ms: row.get(8)?,
            hostname: row.get(9)?,
            project_dir: row.get(10)?,
            parse_error: row.get(11)?,
            git_branch: row.get(12)?,
            git_commit: row.get(13)?,
            pid: row.get(14)?,
            data: Value::Null,
        };
        Ok((record, row.get(15)?))
    }
}

impl DatabaseWriter {
    /// Matching events, newest first
    pub fn query(&self, query: &HookQuery) -> DatabaseResult<Vec<StoredRecord>> {
        let (sql, params) = query.to_sql()?;

        let rows = self.with_retry("query", |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), StoredRecord::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.into_iter()
            .map(|(mut record, data)| -> DatabaseResult<StoredRecord> {
                record.data = serde_json::from_str(&data)?;
                Ok(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookscribe_core::{Event, EventReceiver, ReceiverOptions};

    fn receive(event_type: &str, body: &str) -> Event {
        EventReceiver::new(ReceiverOptions::offline()).receive_bytes(event_type, body.as_bytes())
    }

    fn seeded() -> DatabaseWriter {
        let writer = DatabaseWriter::memory().unwrap();
        writer
            .insert(&receive("PreToolUse", r#"{"session_id":"a","tool_name":"Bash"}"#))
            .unwrap();
        writer
            .insert(&receive(
                "PostToolUse",
                r#"{"session_id":"a","tool_name":"Bash","tool_response":{"is_error":true}}"#,
            ))
            .unwrap();
        writer
            .insert(&receive("PreToolUse", r#"{"session_id":"b","tool_name":"Read"}"#))
            .unwrap();
        writer.insert(&receive("Stop", r#"{"session_id":"b"}"#)).unwrap();
        writer
    }

    #[test]
    fn test_newest_first_with_default_limit() {
        let writer = seeded();
        let rows = writer.query(&HookQuery::new()).unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].hook_type, "Stop");
        assert_eq!(rows[3].hook_type, "PreToolUse");
        assert!(rows.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[test]
    fn test_filters_combine() {
        let writer = seeded();

        let rows = writer
            .query(&HookQuery::new().hook_type("PreToolUse").session_id("b"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tool_name, "Read");
        assert_eq!(rows[0].data["tool_name"], "Read");

        let errors = writer.query(&HookQuery::new().status("error")).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].hook_type, "PostToolUse");

        let bash = writer.query(&HookQuery::new().tool_name("Bash")).unwrap();
        assert_eq!(bash.len(), 2);
    }

    #[test]
    fn test_limit_and_since() {
        let writer = seeded();

        assert_eq!(writer.query(&HookQuery::new().limit(2)).unwrap().len(), 2);
        assert_eq!(writer.query(&HookQuery::new().limit(0)).unwrap().len(), 4);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert!(writer.query(&HookQuery::new().since(future)).unwrap().is_empty());

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(writer.query(&HookQuery::new().since(past)).unwrap().len(), 4);
    }

    #[test]
    fn test_sql_placeholders_are_numbered() {
        let (sql, params) = HookQuery::new()
            .tool_name("Bash")
            .status("error")
            .limit(5)
            .to_sql()
            .unwrap();
        assert!(sql.contains("tool_name = ?1"));
        assert!(sql.contains("status = ?2"));
        assert!(sql.contains("LIMIT ?3"));
        assert_eq!(params.len(), 3);
    }
}
