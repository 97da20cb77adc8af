//! Busy/locked retry loop
//!
//! SQLite's own `busy_timeout` handles most contention; this loop covers
//! the cases where SQLite gives up early (lock upgrades, `BEGIN IMMEDIATE`
//! during migration) with exponential backoff and jitter so concurrent
//! writers do not retry in lockstep.
//!
//! The total budget is wall-clock time since the first attempt, so time
//! spent inside SQLite's busy handler counts against it. The worst case is
//! one `busy_timeout` plus `max_total_delay`.

use crate::config::RetryPolicy;
use crate::error::{is_busy, DatabaseError, DatabaseResult};
use std::time::Instant;
use tracing::{debug, warn};

/// Run `f`, retrying on busy/locked errors within `policy`
pub fn retry_on_busy<T>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: impl FnMut() -> DatabaseResult<T>,
) -> DatabaseResult<T> {
    let started = Instant::now();
    let mut failures = 0u32;

    loop {
        match f() {
            Ok(value) => {
                let waited = started.elapsed();
                if failures > 0 {
                    debug!(operation, failures, waited_ms = waited.as_millis() as u64, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(DatabaseError::Rusqlite(err)) if is_busy(&err) => {
                failures += 1;
                let waited = started.elapsed();
                let remaining = policy.max_total_delay.saturating_sub(waited);

                if failures >= policy.max_attempts || remaining.is_zero() {
                    warn!(
                        operation,
                        attempts = failures,
                        waited_ms = waited.as_millis() as u64,
                        "Database busy, giving up"
                    );
                    return Err(DatabaseError::RetriesExhausted {
                        attempts: failures,
                        waited_ms: waited.as_millis() as u64,
                        last: err,
                    });
                }

                let delay = policy.jittered_delay(failures).min(remaining);
                debug!(
                    operation,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    "Database busy, backing off"
                );
                std::thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}
