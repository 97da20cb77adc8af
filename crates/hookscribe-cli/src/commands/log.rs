//! The event hot path: `hookscribe log <EVENT_TYPE>`
//!
//! Fail-open throughout. Every problem ends up in the diagnostics log and
//! the process still exits 0 with nothing on stdout.

use crate::logging;
use hookscribe_config::{ScribeConfig, SinkKind};
use hookscribe_core::{
    DualSink, EventReceiver, EventSink, FileSink, Pipeline, ReceiverOptions, RecordOutcome,
    ToolFilter,
};
use hookscribe_sqlite::DatabaseWriter;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Record one event from stdin
pub fn execute(event_type: Option<&str>, config_path: Option<&Path>) {
    route_panics_to_log();
    record(event_type, config_path, io::stdin().lock());
}

/// Record one event read from `input`
pub fn record<R: Read>(event_type: Option<&str>, config_path: Option<&Path>, mut input: R) {
    let loaded = ScribeConfig::load_lenient(config_path);
    let config = loaded.config;
    logging::init_diagnostics(&config.diagnostics_path());

    for warning in &loaded.warnings {
        warn!(%warning, "Configuration problem, using defaults");
    }
    if !config.enabled {
        // The producer still writes the whole payload; closing early breaks its pipe
        let _ = io::copy(&mut input, &mut io::sink());
        debug!("Recording disabled");
        return;
    }

    let event_type = event_type.unwrap_or_default();
    let receiver = EventReceiver::new(ReceiverOptions::from(&config));
    let event = receiver.receive(event_type, input);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to start async runtime");
            return;
        }
    };

    let pipeline = Pipeline::new(ToolFilter::new(&config.tool_filter), build_sinks(&config));
    match runtime.block_on(pipeline.record(&event)) {
        RecordOutcome::Filtered { tool_name } => {
            debug!(tool_name, "Event filtered out");
        }
        RecordOutcome::Dispatched(report) => {
            debug!(
                hook_type = %event.event_type(),
                tool_name = event.tool_name(),
                succeeded = report.succeeded(),
                failed = report.failed(),
                "Event recorded"
            );
        }
    }
}

/// Sinks enabled in `config`, constructed for this invocation only
pub fn build_sinks(config: &ScribeConfig) -> DualSink {
    let sinks = config
        .sinks
        .iter()
        .map(|kind| -> Arc<dyn EventSink> {
            match kind {
                SinkKind::File => Arc::new(FileSink::from_config(config)),
                SinkKind::Sqlite => Arc::new(DatabaseWriter::from_settings(&config.database)),
            }
        })
        .collect();
    DualSink::new(sinks)
}

/// Panic messages go to the diagnostics log instead of stderr
fn route_panics_to_log() {
    std::panic::set_hook(Box::new(|info| {
        error!(panic = %info, "Panic while recording event");
    }));
}
