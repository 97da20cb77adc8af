//! The hot path: filter an event and hand it to the sinks

use crate::event::Event;
use crate::filter::ToolFilter;
use crate::sink::{DispatchReport, DualSink};
use tracing::debug;

/// What happened to one event
#[derive(Debug)]
pub enum RecordOutcome {
    /// The tool filter rejected the event
    Filtered {
        tool_name: String,
    },
    /// The event was handed to the sinks
    Dispatched(DispatchReport),
}

/// Filter plus sinks, built once per invocation
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    filter: ToolFilter,
    sinks: DualSink,
}

impl Pipeline {
    pub fn new(filter: ToolFilter, sinks: DualSink) -> Self {
        Self { filter, sinks }
    }

    pub fn sinks(&self) -> &DualSink {
        &self.sinks
    }

    pub async fn record(&self, event: &Event) -> RecordOutcome {
        if !self.filter.allows(event.tool_name()) {
            debug!(tool_name = event.tool_name(), "Event skipped by tool filter");
            return RecordOutcome::Filtered {
                tool_name: event.tool_name().to_string(),
            };
        }
        RecordOutcome::Dispatched(self.sinks.dispatch(event).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receiver::{EventReceiver, ReceiverOptions};
    use crate::sink::{EventSink, FileSink};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_filtered_event_is_not_written() {
        let temp = TempDir::new().unwrap();
        let sink: Arc<dyn EventSink> = Arc::new(FileSink::new(temp.path()));
        let pipeline = Pipeline::new(ToolFilter::new(&["Bash"]), DualSink::new(vec![sink]));
        let event = EventReceiver::new(ReceiverOptions::offline())
            .receive_bytes("PreToolUse", br#"{"tool_name":"Read"}"#);

        let outcome = pipeline.record(&event).await;

        assert!(matches!(outcome, RecordOutcome::Filtered { ref tool_name } if tool_name == "Read"));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_allowed_event_is_dispatched() {
        let temp = TempDir::new().unwrap();
        let sink: Arc<dyn EventSink> = Arc::new(FileSink::new(temp.path()));
        let pipeline = Pipeline::new(ToolFilter::allow_all(), DualSink::new(vec![sink]));
        let event = EventReceiver::new(ReceiverOptions::offline())
            .receive_bytes("PreToolUse", br#"{"tool_name":"Read"}"#);

        match pipeline.record(&event).await {
            RecordOutcome::Dispatched(report) => assert_eq!(report.succeeded(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
