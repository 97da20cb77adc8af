//! Crash behavior of the file sink
//!
//! A crash between the temp write and the rename is simulated by leaving a
//! hidden temp file behind. Readers listing `*.jsonl` must never see it, and
//! the next write into that directory sweeps it once it is old enough.

use hookscribe_core::{EventReceiver, FileSink, ReceiverOptions};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn jsonl_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".jsonl"))
        .collect()
}

fn temp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with('.') && name.ends_with(".tmp"))
        .collect()
}

#[tokio::test]
async fn test_interrupted_write_is_invisible_then_swept() {
    let temp = TempDir::new().unwrap();
    let receiver = EventReceiver::new(ReceiverOptions::offline());
    let event = receiver.receive_bytes("PreToolUse", br#"{"tool_name":"Bash"}"#);

    let sink = FileSink::new(temp.path()).with_orphan_grace(Duration::ZERO);
    let dir = sink.target_dir(&event);
    fs::create_dir_all(&dir).unwrap();

    // Half-written file from a process that died before renaming
    fs::write(dir.join(".20240101T000000.000000Z-1-abcdef.jsonl.tmp"), "{\"section\":\"meta").unwrap();
    assert!(jsonl_files(&dir).is_empty());
    assert_eq!(temp_files(&dir).len(), 1);

    sink.write_event(&event).await.unwrap();

    let finals = jsonl_files(&dir);
    assert_eq!(finals.len(), 1);
    assert!(temp_files(&dir).is_empty());
    for name in finals {
        let content = fs::read_to_string(dir.join(name)).unwrap();
        for line in content.lines() {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }
}

#[tokio::test]
async fn test_recent_temp_files_survive_the_sweep() {
    let temp = TempDir::new().unwrap();
    let receiver = EventReceiver::new(ReceiverOptions::offline());
    let event = receiver.receive_bytes("Stop", b"{}");

    let sink = FileSink::new(temp.path());
    let dir = sink.target_dir(&event);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(".in-flight.jsonl.tmp"), "partial").unwrap();

    sink.write_event(&event).await.unwrap();

    assert_eq!(temp_files(&dir).len(), 1);
    assert_eq!(jsonl_files(&dir).len(), 1);
}

#[tokio::test]
async fn test_concurrent_writers_never_collide() {
    let temp = TempDir::new().unwrap();
    let receiver = EventReceiver::new(ReceiverOptions::offline());
    let sink = FileSink::new(temp.path());

    let events: Vec<_> = (0..50)
        .map(|i| {
            receiver.receive_bytes(
                "PostToolUse",
                format!(r#"{{"tool_name":"Bash","n":{i}}}"#).as_bytes(),
            )
        })
        .collect();

    let writes = events.iter().map(|event| sink.write_event(event));
    let paths = futures::future::join_all(writes).await;

    let mut unique = std::collections::HashSet::new();
    for path in paths {
        assert!(unique.insert(path.unwrap()));
    }

    let date = events[0].timestamp().format("%Y-%m-%d").to_string();
    let index = fs::read_to_string(temp.path().join(date).join("index.jsonl")).unwrap();
    assert_eq!(index.lines().count(), 50);
}
