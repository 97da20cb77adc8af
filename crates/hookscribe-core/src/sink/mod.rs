//! Durable destinations for events

mod dual;
mod file;

pub use dual::{DispatchReport, DualSink, SinkOutcome};
pub use file::{sanitize_component, FileSink};

use crate::error::SinkError;
use crate::event::Event;
use async_trait::async_trait;
use hookscribe_config::SinkKind;
use serde::Serialize;

/// Where a sink put an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkReceipt {
    pub kind: SinkKind,
    /// File path or row id, for diagnostics
    pub location: String,
}

/// A destination that can durably store one event
#[async_trait]
pub trait EventSink: Send + Sync {
    fn kind(&self) -> SinkKind;

    /// Store `event`; implementations must not retry indefinitely
    async fn write(&self, event: &Event) -> Result<SinkReceipt, SinkError>;
}
