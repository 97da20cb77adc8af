//! Core of hookscribe
//!
//! Two independent flows live here:
//!
//! - **Event path** (hot, fail-open): [`EventReceiver`] turns one
//!   invocation's stdin into an immutable [`Event`], [`ToolFilter`] decides
//!   whether it is wanted, and [`DualSink`] fans it out to every enabled
//!   [`EventSink`] without ever surfacing a failure to the caller.
//! - **Settings path** (human-paced, fail-loud): [`Reconciler`] merges hook
//!   bindings into the runtime's settings document and rewrites it
//!   atomically, keeping a timestamped backup.
//!
//! The SQLite sink lives in `hookscribe-sqlite`; it implements
//! [`EventSink`] so the CLI can hand both sinks to the same [`DualSink`].

pub mod enrich;
pub mod error;
pub mod event;
pub mod filter;
pub mod outcome;
pub mod payload;
pub mod pipeline;
pub mod receiver;
pub mod reconcile;
pub mod sink;

pub use error::{ReconcileError, SinkError};
pub use event::{DerivedMetadata, Event, EventType, GitInfo};
pub use filter::ToolFilter;
pub use outcome::{OutcomeStatus, ToolOutcome};
pub use payload::Payload;
pub use pipeline::{Pipeline, RecordOutcome};
pub use receiver::{EventReceiver, ReceiverOptions};
pub use reconcile::{
    HookBinding, Overlap, OverlapKind, OwnershipPatterns, ReconcileReport, Reconciler,
};
pub use sink::{DispatchReport, DualSink, EventSink, FileSink, SinkOutcome, SinkReceipt};

pub use hookscribe_config::SinkKind;
