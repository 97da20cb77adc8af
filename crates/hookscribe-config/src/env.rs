//! Recognized environment overrides
//!
//! Lookups go through an [`EnvLookup`] closure so tests can supply a map
//! instead of mutating the process environment.

use crate::error::{ConfigError, ConfigResult};

/// Base data directory (database, logs, diagnostics)
pub const DATA_DIR: &str = "HOOKSCRIBE_DATA_DIR";
/// Config file path
pub const CONFIG_FILE: &str = "HOOKSCRIBE_CONFIG";
/// File-sink root directory
pub const LOG_DIR: &str = "HOOKSCRIBE_LOG_DIR";
/// Disable recording entirely
pub const DISABLED: &str = "HOOKSCRIBE_DISABLED";
/// Maximum payload size in bytes
pub const MAX_PAYLOAD_BYTES: &str = "HOOKSCRIBE_MAX_PAYLOAD_BYTES";
/// Comma-separated tool-name allow-list
pub const TOOL_FILTER: &str = "HOOKSCRIBE_TOOL_FILTER";
/// Enable or disable the per-day index file
pub const INDEX: &str = "HOOKSCRIBE_INDEX";
/// Comma-separated enabled sinks
pub const SINKS: &str = "HOOKSCRIBE_SINKS";
/// Database file path
pub const DB_PATH: &str = "HOOKSCRIBE_DB_PATH";

/// Environment variable lookup
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read from the real process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse a boolean switch (`1/true/yes/on`, `0/false/no/off`)
pub fn parse_bool(field: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(field, raw)),
    }
}

/// Split a comma-separated list, trimming and dropping empty items
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
