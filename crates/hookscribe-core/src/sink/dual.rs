//! Fail-open fan-out to every enabled sink

use super::{EventSink, SinkReceipt};
use crate::error::SinkError;
use crate::event::Event;
use futures::future::join_all;
use futures::FutureExt;
use hookscribe_config::SinkKind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Result of one sink's write
#[derive(Debug)]
pub struct SinkOutcome {
    pub kind: SinkKind,
    pub result: Result<SinkReceipt, SinkError>,
}

/// Per-sink outcomes of a single dispatch
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// At least one sink was attempted and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }

    pub fn outcome(&self, kind: SinkKind) -> Option<&SinkOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }
}

/// Writes each event to all configured sinks concurrently
///
/// Sink errors and panics are captured in the [`DispatchReport`] and the
/// diagnostics log; [`DualSink::dispatch`] itself cannot fail.
#[derive(Clone, Default)]
pub struct DualSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl std::fmt::Debug for DualSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<SinkKind> = self.sinks.iter().map(|s| s.kind()).collect();
        f.debug_struct("DualSink").field("sinks", &kinds).finish()
    }
}

impl DualSink {
    /// Sinks of a kind already present are dropped, keeping the first
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        let mut unique: Vec<Arc<dyn EventSink>> = Vec::with_capacity(sinks.len());
        for sink in sinks {
            if unique.iter().any(|s| s.kind() == sink.kind()) {
                warn!(kind = %sink.kind(), "Duplicate sink kind ignored");
                continue;
            }
            unique.push(sink);
        }
        Self { sinks: unique }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn kinds(&self) -> Vec<SinkKind> {
        self.sinks.iter().map(|s| s.kind()).collect()
    }

    pub async fn dispatch(&self, event: &Event) -> DispatchReport {
        let writes = self.sinks.iter().map(|sink| {
            let kind = sink.kind();
            AssertUnwindSafe(sink.write(event))
                .catch_unwind()
                .map(move |caught| SinkOutcome {
                    kind,
                    result: caught.unwrap_or(Err(SinkError::Panicked { kind })),
                })
        });

        let outcomes = join_all(writes).await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(receipt) => debug!(
                    kind = %outcome.kind,
                    location = %receipt.location,
                    "Sink write succeeded"
                ),
                Err(e) => warn!(kind = %outcome.kind, error = %e, "Sink write failed"),
            }
        }

        let report = DispatchReport { outcomes };
        if report.all_failed() {
            error!(
                event_type = %event.event_type(),
                tool_name = event.tool_name(),
                session_id = event.session_id(),
                sinks = report.outcomes.len(),
                "Every sink failed; event was not recorded"
            );
        }
        report
    }
}
