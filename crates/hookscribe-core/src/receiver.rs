//! Turns one invocation's stdin into an [`Event`]
//!
//! The receiver never fails: oversized input is truncated with a marker,
//! invalid JSON is kept as raw text, and enrichment problems only leave
//! fields empty.

use crate::enrich;
use crate::event::{Event, EventParts, EventType};
use crate::payload::Payload;
use chrono::Utc;
use hookscribe_config::ScribeConfig;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable name prefix that is always captured
const ENV_PREFIX: &str = "CLAUDE_";

/// Additional variables captured verbatim
const ENV_ALLOWLIST: &[&str] = &["PWD", "SHELL", "USER", "TERM", "VIRTUAL_ENV"];

/// Name fragments that exclude a variable from the snapshot
const ENV_DENY_FRAGMENTS: &[&str] = &["KEY", "TOKEN", "SECRET", "PASSWORD"];

const MAX_ENV_ENTRIES: usize = 64;
const MAX_ENV_VALUE_BYTES: usize = 1024;

/// Receiver settings
#[derive(Debug, Clone)]
pub struct ReceiverOptions {
    /// Payload cap in bytes; anything beyond is drained and dropped
    pub max_payload_bytes: usize,
    /// Shell out to `git` for branch/commit/remote
    pub enrich_git: bool,
    /// Hard limit per `git` invocation
    pub git_timeout: Duration,
    /// Capture the bounded environment snapshot
    pub capture_environment: bool,
}

impl Default for ReceiverOptions {
    fn default() -> Self {
        Self {
            max_payload_bytes: ScribeConfig::DEFAULT_MAX_PAYLOAD_BYTES,
            enrich_git: true,
            git_timeout: enrich::GIT_TIMEOUT,
            capture_environment: true,
        }
    }
}

impl ReceiverOptions {
    /// No git or environment capture; used where those would make output
    /// depend on the machine
    pub fn offline() -> Self {
        Self {
            enrich_git: false,
            capture_environment: false,
            ..Self::default()
        }
    }

    /// Override the payload cap
    pub fn with_max_payload_bytes(mut self, max: usize) -> Self {
        self.max_payload_bytes = max;
        self
    }
}

impl From<&ScribeConfig> for ReceiverOptions {
    fn from(config: &ScribeConfig) -> Self {
        Self::default().with_max_payload_bytes(config.max_payload_bytes)
    }
}

/// Builds events from raw hook input
#[derive(Debug, Clone, Default)]
pub struct EventReceiver {
    options: ReceiverOptions,
}

/// Input after the bounded read
struct BoundedInput {
    bytes: Vec<u8>,
    total_bytes: usize,
    dropped_bytes: usize,
}

impl EventReceiver {
    pub fn new(options: ReceiverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReceiverOptions {
        &self.options
    }

    /// Read `input` to the end (within the cap) and build the event
    pub fn receive<R: Read>(&self, event_type: &str, input: R) -> Event {
        let bounded = read_bounded(input, self.options.max_payload_bytes);
        self.build(event_type, bounded)
    }

    /// Build an event from an in-memory payload
    pub fn receive_bytes(&self, event_type: &str, bytes: &[u8]) -> Event {
        self.receive(event_type, bytes)
    }

    fn build(&self, event_type: &str, input: BoundedInput) -> Event {
        let event_type = EventType::parse(event_type);
        let truncated = input.dropped_bytes > 0;
        let text = String::from_utf8_lossy(&input.bytes);

        let (payload, parse_error) = parse_payload(&text, input.dropped_bytes);
        if parse_error {
            debug!(
                event_type = %event_type,
                size_bytes = input.total_bytes,
                truncated,
                "Payload is not valid JSON, keeping raw text"
            );
        }

        let working_directory = payload
            .cwd()
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok());

        let metadata = enrich::collect(
            working_directory.as_deref(),
            self.options.enrich_git,
            self.options.git_timeout,
        );

        let environment = if self.options.capture_environment {
            snapshot_environment(std::env::vars_os().filter_map(|(name, value)| {
                Some((name.into_string().ok()?, value.into_string().ok()?))
            }))
        } else {
            BTreeMap::new()
        };

        Event::from_parts(EventParts {
            event_type,
            timestamp: Utc::now(),
            working_directory,
            payload,
            environment,
            metadata,
            size_bytes: input.total_bytes,
            dropped_bytes: input.dropped_bytes,
            parse_error,
        })
    }
}

/// Read at most `max` bytes, then drain the rest so the writer never sees a
/// broken pipe
fn read_bounded<R: Read>(mut input: R, max: usize) -> BoundedInput {
    let mut bytes = Vec::new();
    if let Err(e) = input.by_ref().take(max as u64).read_to_end(&mut bytes) {
        warn!(error = %e, read = bytes.len(), "Failed reading hook input, keeping partial data");
        let total_bytes = bytes.len();
        return BoundedInput {
            bytes,
            total_bytes,
            dropped_bytes: 0,
        };
    }

    let dropped = match io::copy(&mut input, &mut io::sink()) {
        Ok(n) => n as usize,
        Err(e) => {
            debug!(error = %e, "Failed draining oversized hook input");
            0
        }
    };

    BoundedInput {
        total_bytes: bytes.len() + dropped,
        bytes,
        dropped_bytes: dropped,
    }
}

/// Marker appended to truncated raw payloads and carried on every truncated event
pub fn truncation_marker(dropped_bytes: usize) -> String {
    format!("…[hookscribe: truncated {dropped_bytes} bytes]")
}

fn parse_payload(text: &str, dropped_bytes: usize) -> (Payload, bool) {
    if text.trim().is_empty() && dropped_bytes == 0 {
        return (Payload::Json(Value::Object(Map::new())), false);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => (Payload::Json(value), false),
        Err(_) => {
            let mut raw = text.to_string();
            if dropped_bytes > 0 {
                raw.push_str(&truncation_marker(dropped_bytes));
            }
            (Payload::Raw(raw), true)
        }
    }
}

/// Bounded, secret-free subset of the environment
pub fn snapshot_environment<I>(vars: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut snapshot = BTreeMap::new();

    for (name, value) in vars {
        let wanted = name.starts_with(ENV_PREFIX) || ENV_ALLOWLIST.contains(&name.as_str());
        let upper = name.to_ascii_uppercase();
        let secret = ENV_DENY_FRAGMENTS.iter().any(|f| upper.contains(f));
        if !wanted || secret {
            continue;
        }
        snapshot.insert(name, cap_value(value));
    }

    while snapshot.len() > MAX_ENV_ENTRIES {
        snapshot.pop_last();
    }
    snapshot
}

fn cap_value(mut value: String) -> String {
    if value.len() > MAX_ENV_VALUE_BYTES {
        let mut cut = MAX_ENV_VALUE_BYTES;
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        value.truncate(cut);
    }
    value
}
