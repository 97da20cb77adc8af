//! The immutable record built once per hook invocation

use crate::outcome::ToolOutcome;
use crate::payload::Payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle point at which the runtime invoked the hook
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Before a tool call
    PreToolUse,
    /// After a tool call
    PostToolUse,
    /// User submitted a prompt
    UserPromptSubmit,
    /// Runtime notification
    Notification,
    /// Main agent stopped
    Stop,
    /// Subagent stopped
    SubagentStop,
    /// Context compaction is about to run
    PreCompact,
    /// Session started
    SessionStart,
    /// Session ended
    SessionEnd,
    /// Any event type this build does not know about
    Other(String),
}

impl EventType {
    /// Every event type with a dedicated variant
    pub const KNOWN: &'static [EventType] = &[
        EventType::PreToolUse,
        EventType::PostToolUse,
        EventType::UserPromptSubmit,
        EventType::Notification,
        EventType::Stop,
        EventType::SubagentStop,
        EventType::PreCompact,
        EventType::SessionStart,
        EventType::SessionEnd,
    ];

    /// Parse an event type name; never fails
    ///
    /// Known names are matched ignoring case, `_` and `-`, so
    /// `pre_tool_use` and `PreToolUse` are the same event. Anything else is
    /// kept verbatim in [`EventType::Other`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let folded: String = trimmed
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match folded.as_str() {
            "pretooluse" => EventType::PreToolUse,
            "posttooluse" => EventType::PostToolUse,
            "userpromptsubmit" => EventType::UserPromptSubmit,
            "notification" => EventType::Notification,
            "stop" => EventType::Stop,
            "subagentstop" => EventType::SubagentStop,
            "precompact" => EventType::PreCompact,
            "sessionstart" => EventType::SessionStart,
            "sessionend" => EventType::SessionEnd,
            _ if trimmed.is_empty() => EventType::Other("unknown".to_string()),
            _ => EventType::Other(trimmed.to_string()),
        }
    }

    /// Canonical name as written in the runtime's settings document
    pub fn as_str(&self) -> &str {
        match self {
            EventType::PreToolUse => "PreToolUse",
            EventType::PostToolUse => "PostToolUse",
            EventType::UserPromptSubmit => "UserPromptSubmit",
            EventType::Notification => "Notification",
            EventType::Stop => "Stop",
            EventType::SubagentStop => "SubagentStop",
            EventType::PreCompact => "PreCompact",
            EventType::SessionStart => "SessionStart",
            EventType::SessionEnd => "SessionEnd",
            EventType::Other(name) => name,
        }
    }

    /// Whether the runtime routes this event through a tool matcher
    pub fn is_tool_scoped(&self) -> bool {
        matches!(self, EventType::PreToolUse | EventType::PostToolUse)
    }

    /// Synthetic tool name used when the payload carries none
    pub fn fallback_tool_name(&self) -> &'static str {
        match self {
            EventType::UserPromptSubmit => "UserPrompt",
            EventType::Stop => "SessionStop",
            EventType::SubagentStop => "SubagentStop",
            EventType::Notification => "Notification",
            EventType::PreCompact => "PreCompact",
            EventType::SessionStart => "SessionStart",
            EventType::SessionEnd => "SessionEnd",
            _ => "UnknownTool",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(raw: &str) -> Self {
        EventType::parse(raw)
    }
}

impl std::str::FromStr for EventType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(EventType::parse(s))
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(EventType::parse(&raw))
    }
}

/// Git state of the working directory at event time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitInfo {
    /// Current branch (`HEAD` when detached)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Full commit hash of `HEAD`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// URL of the `origin` remote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl GitInfo {
    /// True when no field could be resolved
    pub fn is_empty(&self) -> bool {
        self.branch.is_none() && self.commit.is_none() && self.remote.is_none()
    }
}

/// Facts about the recording process and host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetadata {
    /// Host name
    pub hostname: Option<String>,
    /// Recording process id
    pub pid: u32,
    /// Parent process id (the runtime, usually); unix only
    pub ppid: Option<u32>,
    /// Git state, when the working directory is inside a repository
    pub git: Option<GitInfo>,
}

/// One observed hook invocation
///
/// Built exactly once by [`crate::EventReceiver`] and never mutated
/// afterwards; sinks only get shared references.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    event_type: EventType,
    tool_name: String,
    session_id: String,
    timestamp: DateTime<Utc>,
    timestamp_unix: f64,
    working_directory: Option<PathBuf>,
    transcript_path: Option<String>,
    payload: Payload,
    environment: BTreeMap<String, String>,
    metadata: DerivedMetadata,
    size_bytes: usize,
    truncated: bool,
    /// Marker naming the dropped byte count; present whenever `truncated` is
    #[serde(skip_serializing_if = "Option::is_none")]
    truncation: Option<String>,
    parse_error: bool,
}

/// Everything needed to assemble an [`Event`]
pub(crate) struct EventParts {
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub working_directory: Option<PathBuf>,
    pub payload: Payload,
    pub environment: BTreeMap<String, String>,
    pub metadata: DerivedMetadata,
    pub size_bytes: usize,
    /// Bytes read past the payload cap and discarded
    pub dropped_bytes: usize,
    pub parse_error: bool,
}

impl Event {
    pub(crate) fn from_parts(parts: EventParts) -> Self {
        let tool_name = parts
            .payload
            .tool_name()
            .map(str::to_string)
            .unwrap_or_else(|| parts.event_type.fallback_tool_name().to_string());
        let session_id = parts
            .payload
            .session_id()
            .unwrap_or("unknown")
            .to_string();
        let transcript_path = parts.payload.transcript_path().map(str::to_string);
        let timestamp_unix = parts.timestamp.timestamp_micros() as f64 / 1_000_000.0;

        Self {
            event_type: parts.event_type,
            tool_name,
            session_id,
            timestamp: parts.timestamp,
            timestamp_unix,
            working_directory: parts.working_directory,
            transcript_path,
            payload: parts.payload,
            environment: parts.environment,
            metadata: parts.metadata,
            size_bytes: parts.size_bytes,
            truncated: parts.dropped_bytes > 0,
            truncation: (parts.dropped_bytes > 0)
                .then(|| crate::receiver::truncation_marker(parts.dropped_bytes)),
            parse_error: parts.parse_error,
        }
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// Never empty
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// UTC wall-clock time the event was received
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Same instant as [`Event::timestamp`], in fractional epoch seconds
    pub fn timestamp_unix(&self) -> f64 {
        self.timestamp_unix
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    pub fn transcript_path(&self) -> Option<&str> {
        self.transcript_path.as_deref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn metadata(&self) -> &DerivedMetadata {
        &self.metadata
    }

    pub fn git(&self) -> Option<&GitInfo> {
        self.metadata.git.as_ref()
    }

    /// Bytes received on stdin, including any that were truncated away
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// `…[hookscribe: truncated N bytes]` when the payload was cut short
    pub fn truncation(&self) -> Option<&str> {
        self.truncation.as_deref()
    }

    pub fn parse_error(&self) -> bool {
        self.parse_error
    }

    /// Status, error code and duration derived from the payload
    pub fn outcome(&self) -> ToolOutcome {
        ToolOutcome::derive(self)
    }
}
