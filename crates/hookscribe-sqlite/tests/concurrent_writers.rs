//! Concurrency tests against a real database file
//!
//! Every writer gets its own `DatabaseWriter` (and therefore its own
//! connection), which is how independent hook processes behave.

use hookscribe_core::{Event, EventReceiver, ReceiverOptions};
use hookscribe_sqlite::{DatabaseWriter, HookQuery, WriterConfig};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn event(writer: usize, n: usize) -> Event {
    let body = format!(
        r#"{{"session_id":"writer-{writer}","tool_name":"Bash","tool_input":{{"n":{n}}}}}"#
    );
    EventReceiver::new(ReceiverOptions::offline()).receive_bytes("PreToolUse", body.as_bytes())
}

#[test]
fn test_many_threads_yield_exact_row_count() {
    const THREADS: usize = 64;
    const PER_THREAD: usize = 10;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hooks.db");
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let writer = DatabaseWriter::new(WriterConfig::new(&path));
                barrier.wait();
                let mut failures = Vec::new();
                for n in 0..PER_THREAD {
                    if let Err(e) = writer.insert(&event(t, n)) {
                        failures.push(e.to_string());
                    }
                }
                failures
            })
        })
        .collect();

    let failures: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert!(failures.is_empty(), "write failures: {failures:?}");

    let reader = DatabaseWriter::new(WriterConfig::new(&path));
    assert_eq!(
        reader.stats().unwrap().row_count,
        (THREADS * PER_THREAD) as u64
    );
    let one_writer = reader
        .query(&HookQuery::new().session_id("writer-7").limit(0))
        .unwrap();
    assert_eq!(one_writer.len(), PER_THREAD);
}

#[test]
fn test_steady_contention_has_no_permanent_failures() {
    const WRITERS: usize = 8;
    const EVENTS: usize = 20;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hooks.db");

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let path = path.clone();
            thread::spawn(move || {
                let writer = DatabaseWriter::new(
                    WriterConfig::new(&path).with_busy_timeout(Duration::from_secs(10)),
                );
                let mut failures = 0;
                for n in 0..EVENTS {
                    if writer.insert(&event(w, n)).is_err() {
                        failures += 1;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
                failures
            })
        })
        .collect();

    let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(failures, 0);

    let reader = DatabaseWriter::new(WriterConfig::new(&path));
    assert_eq!(reader.stats().unwrap().row_count, (WRITERS * EVENTS) as u64);
}

#[test]
fn test_simultaneous_first_open_migrates_once() {
    const OPENERS: usize = 16;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.db");
    let barrier = Arc::new(Barrier::new(OPENERS));

    let handles: Vec<_> = (0..OPENERS)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                DatabaseWriter::open(WriterConfig::new(&path)).map(|_| ())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let conn = rusqlite::Connection::open(&path).unwrap();
    let versions: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |r| r.get(0))
        .unwrap();
    assert_eq!(versions, hookscribe_sqlite::schema::SCHEMA_VERSION as i64);
}
