//! Error types for the event and settings paths

use hookscribe_config::SinkKind;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single sink write
///
/// Never escapes [`crate::DualSink`]; it is recorded in the dispatch report
/// and the diagnostics log only.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Filesystem error (disk full, permission denied, ...)
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Event could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure reported by a sink implementation
    #[error("{kind} sink failed: {message}")]
    Backend {
        /// Which sink
        kind: SinkKind,
        /// Backend message
        message: String,
    },

    /// The sink panicked while writing
    #[error("{kind} sink panicked")]
    Panicked {
        /// Which sink
        kind: SinkKind,
    },
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a settings reconciliation; nothing has been written when one
/// of these is returned
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// Settings file exists but could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid JSON
    #[error("{} is not valid JSON (line {line}, column {column}): {message}", path.display())]
    Malformed {
        /// Settings file
        path: PathBuf,
        /// 1-based line of the syntax error
        line: usize,
        /// 1-based column of the syntax error
        column: usize,
        /// Parser message
        message: String,
    },

    /// Valid JSON, but not the shape the runtime expects
    #[error("{} has an unexpected shape at {pointer}: expected {expected}", path.display())]
    Shape {
        /// Settings file
        path: PathBuf,
        /// JSON pointer of the offending value
        pointer: String,
        /// What should have been there
        expected: &'static str,
    },

    /// Backup copy failed; the original was not touched
    #[error("Failed to back up {} to {}: {source}", path.display(), backup.display())]
    Backup {
        /// Settings file
        path: PathBuf,
        /// Backup destination
        backup: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Temp file write, sync or rename failed; the original was not touched
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Settings file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Install was asked to bind an empty command
    #[error("Hook command must not be empty")]
    EmptyCommand,

    /// An ownership pattern is not a valid regex
    #[error("Invalid ownership pattern {pattern:?}: {source}")]
    Pattern {
        /// Offending pattern
        pattern: String,
        /// Regex error
        #[source]
        source: regex::Error,
    },

    /// Document could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
