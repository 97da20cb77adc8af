//! Deleting old events; the only path that removes rows

use crate::error::DatabaseResult;
use crate::writer::DatabaseWriter;
use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;
use tracing::info;

impl DatabaseWriter {
    /// Delete every event recorded before `cutoff`; returns the row count
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> DatabaseResult<usize> {
        let cutoff_unix = cutoff.timestamp_micros() as f64 / 1_000_000.0;

        let deleted = self.with_retry("prune", |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let deleted = tx.execute("DELETE FROM hooks WHERE timestamp < ?1", [cutoff_unix])?;
            tx.commit()?;
            Ok(deleted)
        })?;

        info!(deleted, cutoff = %cutoff.to_rfc3339(), "Pruned old events");
        Ok(deleted)
    }
}
