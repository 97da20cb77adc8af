//! Tracing setup
//!
//! Human commands log to stderr. The event path must keep stdout and stderr
//! clean for the host runtime, so it appends to the diagnostics file instead.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive
pub const LOG_FILTER_ENV: &str = "HOOKSCRIBE_LOG";

fn filter(default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .with_env_var(LOG_FILTER_ENV)
        .from_env_lossy()
}

/// Log to stderr at `level` unless `HOOKSCRIBE_LOG` says otherwise
pub fn init_stderr(level: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Append-only diagnostics log; opened per record so a missing directory
/// or a full disk only loses that line
#[derive(Debug, Clone)]
pub struct DiagnosticsFile {
    path: PathBuf,
}

impl DiagnosticsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<'a> MakeWriter<'a> for DiagnosticsFile {
    type Writer = Box<dyn Write + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => Box::new(file),
            Err(_) => Box::new(io::sink()),
        }
    }
}

/// Log failures to the diagnostics file at `warn` unless `HOOKSCRIBE_LOG` says otherwise
pub fn init_diagnostics(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(LevelFilter::WARN))
        .with_writer(DiagnosticsFile::new(path))
        .with_ansi(false)
        .try_init();
}
