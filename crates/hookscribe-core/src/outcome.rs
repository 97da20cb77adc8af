//! Scalar columns derived from a payload for indexed queries

use crate::event::{Event, EventType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Coarse status of an observed event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// A tool call that has not run yet
    Pending,
    /// A tool call that completed without error
    Success,
    /// A tool call that reported an error or was interrupted
    Error,
    /// A non-tool event
    Recorded,
    /// Input that could not be parsed
    Malformed,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Pending => "pending",
            OutcomeStatus::Success => "success",
            OutcomeStatus::Error => "error",
            OutcomeStatus::Recorded => "recorded",
            OutcomeStatus::Malformed => "malformed",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status, error code and duration of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutcome {
    pub status: OutcomeStatus,
    pub error_code: Option<String>,
    pub duration_ms: Option<i64>,
}

impl ToolOutcome {
    /// Derive the outcome from an event's payload
    pub fn derive(event: &Event) -> Self {
        let payload = event.payload();
        let response = payload.tool_response();

        let status = if event.parse_error() {
            OutcomeStatus::Malformed
        } else if let Some(response) = response {
            if response_failed(response) {
                OutcomeStatus::Error
            } else {
                OutcomeStatus::Success
            }
        } else if *event.event_type() == EventType::PreToolUse {
            OutcomeStatus::Pending
        } else {
            OutcomeStatus::Recorded
        };

        let error_code = response
            .and_then(|r| first_code(r, &["exit_code", "exitCode", "error_code", "code"]))
            .or_else(|| payload.field("error_code").and_then(scalar_text));

        let duration_ms = response
            .and_then(|r| first_millis(r, &["duration_ms", "durationMs"]))
            .or_else(|| payload.field("duration_ms").and_then(as_millis));

        Self {
            status,
            error_code,
            duration_ms,
        }
    }
}

fn response_failed(response: &Value) -> bool {
    let Some(map) = response.as_object() else {
        return false;
    };

    let flag = |key: &str| map.get(key).and_then(Value::as_bool);

    flag("is_error") == Some(true)
        || flag("isError") == Some(true)
        || flag("interrupted") == Some(true)
        || flag("success") == Some(false)
        || map.get("error").is_some_and(|e| !e.is_null() && e != false)
        || map
            .get("exit_code")
            .or_else(|| map.get("exitCode"))
            .and_then(Value::as_i64)
            .is_some_and(|code| code != 0)
}

fn first_code(response: &Value, keys: &[&str]) -> Option<String> {
    let map = response.as_object()?;
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(scalar_text)
}

fn first_millis(response: &Value, keys: &[&str]) -> Option<i64> {
    let map = response.as_object()?;
    keys.iter().filter_map(|key| map.get(*key)).find_map(as_millis)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
        .filter(|ms| *ms >= 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::{EventReceiver, ReceiverOptions};

    fn receive(event_type: &str, body: &str) -> Event {
        EventReceiver::new(ReceiverOptions::offline()).receive_bytes(event_type, body.as_bytes())
    }

    #[test]
    fn test_pre_tool_use_is_pending() {
        let event = receive("PreToolUse", r#"{"tool_name":"Bash","tool_input":{}}"#);
        assert_eq!(event.outcome().status, OutcomeStatus::Pending);
    }

    #[test]
    fn test_post_tool_use_success() {
        let event = receive(
            "PostToolUse",
            r#"{"tool_name":"Read","tool_response":{"content":"ok","duration_ms":12}}"#,
        );
        let outcome = event.outcome();
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.duration_ms, Some(12));
        assert_eq!(outcome.error_code, None);
    }

    #[test]
    fn test_post_tool_use_error_with_exit_code() {
        let event = receive(
            "PostToolUse",
            r#"{"tool_name":"Bash","tool_response":{"exit_code":2,"stderr":"boom"}}"#,
        );
        let outcome = event.outcome();
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.error_code.as_deref(), Some("2"));
    }

    #[test]
    fn test_error_field_marks_failure() {
        let event = receive(
            "PostToolUse",
            r#"{"tool_response":{"error":"permission denied","code":"EACCES"}}"#,
        );
        let outcome = event.outcome();
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.error_code.as_deref(), Some("EACCES"));
    }

    #[test]
    fn test_non_tool_event_is_recorded() {
        let event = receive("Notification", r#"{"message":"hi"}"#);
        assert_eq!(event.outcome().status, OutcomeStatus::Recorded);
    }

    #[test]
    fn test_malformed_input() {
        let event = receive("PostToolUse", "{not json");
        assert_eq!(event.outcome().status, OutcomeStatus::Malformed);
    }

    #[test]
    fn test_fractional_duration_is_rounded() {
        let event = receive("PostToolUse", r#"{"tool_response":"done","duration_ms":4.6}"#);
        let outcome = event.outcome();
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.duration_ms, Some(5));
    }
}
