//! SQLite event store for hookscribe
//!
//! ## Features
//!
//! - **WAL mode**: many short-lived processes append concurrently while
//!   readers keep working
//! - **Per-process connection**: reopened automatically after a fork
//! - **Idempotent migrations**: safe when several processes open a fresh
//!   database at the same moment
//! - **Bounded retry**: busy/locked errors back off with jitter, then fail
//!   with [`DatabaseError::RetriesExhausted`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hookscribe_sqlite::{DatabaseWriter, HookQuery, WriterConfig};
//!
//! let writer = DatabaseWriter::new(WriterConfig::new("./hookscribe.db"));
//! writer.insert(&event)?;
//! let recent = writer.query(&HookQuery::new().tool_name("Bash").limit(20))?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod query;
mod retention;
pub mod retry;
pub mod schema;
mod writer;

// Re-exports
pub use config::{RetryPolicy, WriterConfig};
pub use connection::DbStats;
pub use error::{DatabaseError, DatabaseResult};
pub use query::{HookQuery, StoredRecord};
pub use writer::DatabaseWriter;
