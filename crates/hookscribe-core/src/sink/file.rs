//! Partitioned JSONL file sink
//!
//! Layout: `root/YYYY-MM-DD/<event_type>/<tool_name>/<file>.jsonl`, one file
//! per event. Each file is written to a hidden `.<name>.tmp` sibling, synced
//! and renamed, so anything matching `*.jsonl` is always complete.

use super::{EventSink, SinkReceipt};
use crate::error::SinkError;
use crate::event::{Event, GitInfo};
use crate::payload::Payload;
use async_trait::async_trait;
use hookscribe_config::{ScribeConfig, SinkKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const MAX_COMPONENT_LEN: usize = 64;
const INDEX_FILE: &str = "index.jsonl";

/// Writes each event to its own JSONL file
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
    index: bool,
    orphan_grace: Duration,
}

#[derive(Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
enum RecordLine<'a> {
    Metadata(MetadataLine<'a>),
    Payload { data: &'a Payload },
    Environment { vars: &'a BTreeMap<String, String> },
    Git(&'a GitInfo),
}

#[derive(Serialize)]
struct MetadataLine<'a> {
    event_type: &'a str,
    tool_name: &'a str,
    session_id: &'a str,
    timestamp: String,
    timestamp_unix: f64,
    cwd: Option<&'a Path>,
    transcript_path: Option<&'a str>,
    size_bytes: usize,
    truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncation: Option<&'a str>,
    parse_error: bool,
    hostname: Option<&'a str>,
    pid: u32,
    ppid: Option<u32>,
    status: &'static str,
    error_code: Option<String>,
    duration_ms: Option<i64>,
}

#[derive(Serialize)]
struct IndexLine<'a> {
    event_type: &'a str,
    tool_name: &'a str,
    session_id: &'a str,
    timestamp: String,
    path: &'a Path,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: true,
            orphan_grace: Duration::from_secs(ScribeConfig::DEFAULT_ORPHAN_GRACE_SECS),
        }
    }

    pub fn from_config(config: &ScribeConfig) -> Self {
        Self::new(&config.log_dir)
            .with_index(config.index)
            .with_orphan_grace(config.orphan_grace())
    }

    pub fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn date_dir(&self, event: &Event) -> PathBuf {
        self.root
            .join(event.timestamp().format("%Y-%m-%d").to_string())
    }

    /// Directory an event's file goes into
    pub fn target_dir(&self, event: &Event) -> PathBuf {
        self.date_dir(event)
            .join(sanitize_component(event.event_type().as_str()))
            .join(sanitize_component(event.tool_name()))
    }

    /// Write `event` and return the final file path
    pub async fn write_event(&self, event: &Event) -> Result<PathBuf, SinkError> {
        let dir = self.target_dir(event);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| SinkError::io(&dir, e))?;

        let swept = self.sweep_orphans(&dir, self.orphan_grace).await;
        if swept > 0 {
            debug!(dir = %dir.display(), swept, "Removed orphaned temp files");
        }

        let name = file_name(event);
        let final_path = dir.join(&name);
        let temp_path = dir.join(format!(".{name}.tmp"));
        let body = render(event)?;

        if let Err(e) = write_synced(&temp_path, body.as_bytes()).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SinkError::io(&temp_path, e));
        }
        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SinkError::io(&final_path, e));
        }

        if self.index {
            if let Err(e) = self.append_index(event, &final_path).await {
                warn!(error = %e, "Failed to append to the daily index");
            }
        }

        debug!(path = %final_path.display(), "Event written to file sink");
        Ok(final_path)
    }

    async fn append_index(&self, event: &Event, final_path: &Path) -> Result<(), SinkError> {
        let relative = final_path.strip_prefix(&self.root).unwrap_or(final_path);
        let line = IndexLine {
            event_type: event.event_type().as_str(),
            tool_name: event.tool_name(),
            session_id: event.session_id(),
            timestamp: event.timestamp().to_rfc3339(),
            path: relative,
        };
        let mut bytes = serde_json::to_vec(&line)?;
        bytes.push(b'\n');

        let index_path = self.date_dir(event).join(INDEX_FILE);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .await
            .map_err(|e| SinkError::io(&index_path, e))?;
        // One write call per line so concurrent appenders do not interleave
        file.write_all(&bytes)
            .await
            .map_err(|e| SinkError::io(&index_path, e))?;
        Ok(())
    }

    /// Remove `.*.tmp` files in `dir` older than `grace`; returns the count
    pub async fn sweep_orphans(&self, dir: &Path, grace: Duration) -> usize {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let now = SystemTime::now();
        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !(name.starts_with('.') && name.ends_with(".tmp")) {
                continue;
            }

            let age = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => now.duration_since(modified).unwrap_or_default(),
                Err(_) => continue,
            };
            if age < grace {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => debug!(file = name, error = %e, "Failed to remove orphaned temp file"),
            }
        }
        removed
    }
}

#[async_trait]
impl EventSink for FileSink {
    fn kind(&self) -> SinkKind {
        SinkKind::File
    }

    async fn write(&self, event: &Event) -> Result<SinkReceipt, SinkError> {
        let path = self.write_event(event).await?;
        Ok(SinkReceipt {
            kind: SinkKind::File,
            location: path.display().to_string(),
        })
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}

/// `YYYYMMDDTHHMMSS.ffffffZ-<pid>-<6 hex>.jsonl`
fn file_name(event: &Event) -> String {
    let suffix = rand::random::<u32>() & 0x00ff_ffff;
    format!(
        "{}Z-{}-{:06x}.jsonl",
        event.timestamp().format("%Y%m%dT%H%M%S%.6f"),
        std::process::id(),
        suffix
    )
}

fn render(event: &Event) -> Result<String, SinkError> {
    let meta = event.metadata();
    let outcome = event.outcome();

    let mut lines = vec![
        RecordLine::Metadata(MetadataLine {
            event_type: event.event_type().as_str(),
            tool_name: event.tool_name(),
            session_id: event.session_id(),
            timestamp: event.timestamp().to_rfc3339(),
            timestamp_unix: event.timestamp_unix(),
            cwd: event.working_directory(),
            transcript_path: event.transcript_path(),
            size_bytes: event.size_bytes(),
            truncated: event.truncated(),
            truncation: event.truncation(),
            parse_error: event.parse_error(),
            hostname: meta.hostname.as_deref(),
            pid: meta.pid,
            ppid: meta.ppid,
            status: outcome.status.as_str(),
            error_code: outcome.error_code,
            duration_ms: outcome.duration_ms,
        }),
        RecordLine::Payload {
            data: event.payload(),
        },
        RecordLine::Environment {
            vars: event.environment(),
        },
    ];
    if let Some(git) = event.git() {
        lines.push(RecordLine::Git(git));
    }

    let mut out = String::new();
    for line in &lines {
        out.push_str(&serde_json::to_string(line)?);
        out.push('\n');
    }
    Ok(out)
}

/// Make `raw` safe to use as a single path component
pub fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed = out.trim_matches(|c| c == '_' || c == '.');
    let mut result: String = trimmed.chars().take(MAX_COMPONENT_LEN).collect();
    // Truncation can expose a trailing separator again
    while result.ends_with('_') || result.ends_with('.') {
        result.pop();
    }

    if result.is_empty() {
        "unknown".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::{EventReceiver, ReceiverOptions};
    use tempfile::TempDir;

    fn event(event_type: &str, body: &str) -> Event {
        EventReceiver::new(ReceiverOptions::offline()).receive_bytes(event_type, body.as_bytes())
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("Bash"), "Bash");
        assert_eq!(sanitize_component("mcp__github__search"), "mcp_github_search");
        assert_eq!(sanitize_component("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_component("a b/c"), "a_b_c");
        assert_eq!(sanitize_component("..."), "unknown");
        assert_eq!(sanitize_component(""), "unknown");
        assert_eq!(sanitize_component(&"x".repeat(100)).len(), 64);
    }

    #[test]
    fn test_file_name_shape() {
        let name = file_name(&event("Stop", "{}"));
        assert!(name.ends_with(".jsonl"));
        let (stamp, rest) = name.split_once("Z-").unwrap();
        assert_eq!(stamp.len(), "20240101T000000.000000".len());
        let parts: Vec<&str> = rest.trim_end_matches(".jsonl").split('-').collect();
        assert_eq!(parts[0], std::process::id().to_string());
        assert_eq!(parts[1].len(), 6);
    }

    #[tokio::test]
    async fn test_write_event_layout_and_sections() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path());
        let event = event(
            "PreToolUse",
            r#"{"session_id":"s1","tool_name":"Bash","tool_input":{"command":"ls"}}"#,
        );

        let path = sink.write_event(&event).await.unwrap();

        let date = event.timestamp().format("%Y-%m-%d").to_string();
        assert!(path.starts_with(temp.path().join(&date).join("PreToolUse").join("Bash")));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["section"], "metadata");
        assert_eq!(lines[0]["tool_name"], "Bash");
        assert_eq!(lines[0]["status"], "pending");
        assert_eq!(lines[1]["section"], "payload");
        assert_eq!(lines[1]["data"]["tool_input"]["command"], "ls");
        assert_eq!(lines[2]["section"], "environment");

        let index = std::fs::read_to_string(temp.path().join(&date).join(INDEX_FILE)).unwrap();
        assert_eq!(index.lines().count(), 1);
        let entry: serde_json::Value = serde_json::from_str(index.trim()).unwrap();
        assert_eq!(entry["session_id"], "s1");
    }

    #[tokio::test]
    async fn test_index_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path()).with_index(false);
        let event = event("Stop", "{}");

        sink.write_event(&event).await.unwrap();

        let date = event.timestamp().format("%Y-%m-%d").to_string();
        assert!(!temp.path().join(date).join(INDEX_FILE).exists());
    }

    #[tokio::test]
    async fn test_raw_payload_is_written_as_string() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path());
        let path = sink.write_event(&event("Notification", "not json")).await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let payload: serde_json::Value =
            serde_json::from_str(content.lines().nth(1).unwrap()).unwrap();
        assert_eq!(payload["data"], "not json");
    }

    #[tokio::test]
    async fn test_truncated_json_payload_marks_metadata() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path());
        let body = format!("{{}}{}", " ".repeat(100));
        let event = EventReceiver::new(ReceiverOptions::offline().with_max_payload_bytes(16))
            .receive_bytes("Stop", body.as_bytes());

        let path = sink.write_event(&event).await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        let metadata: serde_json::Value =
            serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(metadata["truncated"], true);
        assert_eq!(metadata["truncation"], "…[hookscribe: truncated 86 bytes]");
        assert_eq!(metadata["parse_error"], false);
    }

    #[tokio::test]
    async fn test_sweep_respects_grace() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::new(temp.path());
        let orphan = temp.path().join(".dead.jsonl.tmp");
        std::fs::write(&orphan, "partial").unwrap();
        std::fs::write(temp.path().join("keep.jsonl"), "{}").unwrap();

        assert_eq!(sink.sweep_orphans(temp.path(), Duration::from_secs(3600)).await, 0);
        assert!(orphan.exists());

        assert_eq!(sink.sweep_orphans(temp.path(), Duration::ZERO).await, 1);
        assert!(!orphan.exists());
        assert!(temp.path().join("keep.jsonl").exists());
    }

    #[tokio::test]
    async fn test_unwritable_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let sink = FileSink::new(&blocker);

        let err = sink.write_event(&event("Stop", "{}")).await.unwrap_err();
        assert!(matches!(err, SinkError::Io { .. }));
    }
}
