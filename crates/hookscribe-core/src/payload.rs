//! Opaque payload delivered by the observed runtime
//!
//! Payload shapes vary by event type and runtime version, so the payload is
//! kept as an opaque JSON value with a few optional typed accessors rather
//! than a rigid schema. Input that is not valid JSON is kept verbatim.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// Parsed payload, or the raw text when parsing failed
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Syntactically valid JSON of any shape
    Json(Value),
    /// Input that could not be parsed, possibly with a truncation marker
    Raw(String),
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Json(value) => value.serialize(serializer),
            Payload::Raw(text) => serializer.serialize_str(text),
        }
    }
}

impl Payload {
    /// Top-level field of an object payload
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Payload::Json(Value::Object(map)) => map.get(key),
            _ => None,
        }
    }

    /// Top-level string field, ignoring blank strings
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// `tool_name`
    pub fn tool_name(&self) -> Option<&str> {
        self.str_field("tool_name")
    }

    /// `session_id`
    pub fn session_id(&self) -> Option<&str> {
        self.str_field("session_id")
    }

    /// `cwd`
    pub fn cwd(&self) -> Option<&str> {
        self.str_field("cwd")
    }

    /// `transcript_path`
    pub fn transcript_path(&self) -> Option<&str> {
        self.str_field("transcript_path")
    }

    /// `tool_input`
    pub fn tool_input(&self) -> Option<&Value> {
        self.field("tool_input")
    }

    /// `tool_response`
    pub fn tool_response(&self) -> Option<&Value> {
        self.field("tool_response")
    }

    /// `prompt` (prompt submission events)
    pub fn prompt(&self) -> Option<&str> {
        self.str_field("prompt")
    }

    /// `message` (notifications)
    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    /// `reason` (session end)
    pub fn reason(&self) -> Option<&str> {
        self.str_field("reason")
    }

    /// The JSON value, when parsing succeeded
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    /// The raw text, when parsing failed
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Payload::Json(_) => None,
            Payload::Raw(text) => Some(text),
        }
    }
}
