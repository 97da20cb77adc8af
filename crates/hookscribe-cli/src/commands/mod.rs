// Event path
pub mod log;

// Settings document
pub mod install;

// Database inspection and maintenance
pub mod prune;
pub mod query;
pub mod stats;

use anyhow::{bail, Context, Result};
use hookscribe_config::ScribeConfig;
use hookscribe_sqlite::{DatabaseWriter, WriterConfig};
use serde::Serialize;
use std::path::Path;

/// Strict configuration load for human commands
pub fn load_config(path: Option<&Path>) -> Result<ScribeConfig> {
    ScribeConfig::load(path).context("Failed to load configuration")
}

/// Open the event database; it must already exist
pub fn open_database(config: &ScribeConfig) -> Result<DatabaseWriter> {
    let path = &config.database.path;
    if !path.exists() {
        bail!("No event database at {}", path.display());
    }
    DatabaseWriter::open(WriterConfig::from(&config.database))
        .with_context(|| format!("Failed to open {}", path.display()))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
