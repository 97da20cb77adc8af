//! Effective configuration and its layering
//!
//! Order of precedence (later wins):
//! 1. Built-in defaults rooted at the data directory
//! 2. The TOML config file
//! 3. `HOOKSCRIBE_*` environment overrides

use crate::env::{self, EnvLookup};
use crate::error::{ConfigError, ConfigResult};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// A durable destination for recorded events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Date/event-type/tool partitioned JSONL files
    #[serde(alias = "files")]
    File,
    /// Embedded write-ahead-logged SQLite database
    #[serde(alias = "db", alias = "database")]
    Sqlite,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::File => write!(f, "file"),
            SinkKind::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for SinkKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "files" => Ok(SinkKind::File),
            "sqlite" | "db" | "database" => Ok(SinkKind::Sqlite),
            other => Err(ConfigError::invalid("sink", other)),
        }
    }
}

/// Keep the first occurrence of every sink kind, preserving order
fn dedup_sinks(sinks: Vec<SinkKind>) -> Vec<SinkKind> {
    let mut seen = Vec::with_capacity(sinks.len());
    for sink in sinks {
        if !seen.contains(&sink) {
            seen.push(sink);
        }
    }
    seen
}

/// Database access parameters and busy-retry budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file
    pub path: PathBuf,
    /// How long SQLite itself waits on a held lock before reporting busy
    pub busy_timeout_ms: u64,
    /// Maximum insert attempts (including the first)
    pub max_attempts: u32,
    /// First backoff delay; doubles on every retry
    pub base_delay_ms: u64,
    /// Cap for a single backoff delay
    pub max_delay_ms: u64,
    /// Cap for the sum of all backoff delays
    pub max_total_delay_ms: u64,
}

impl DatabaseSettings {
    /// Defaults for a database at `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: 10_000,
            max_attempts: 8,
            base_delay_ms: 25,
            max_delay_ms: 1_000,
            max_total_delay_ms: 5_000,
        }
    }

    /// Busy timeout as a duration
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Effective settings for one invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScribeConfig {
    /// Master switch; `HOOKSCRIBE_DISABLED` turns it off
    pub enabled: bool,
    /// Base data directory
    pub data_dir: PathBuf,
    /// Enabled sinks, in dispatch order, without duplicates
    pub sinks: Vec<SinkKind>,
    /// File-sink root
    pub log_dir: PathBuf,
    /// Payload bytes kept before truncation
    pub max_payload_bytes: usize,
    /// Tool-name allow-list (glob patterns); empty means everything
    pub tool_filter: Vec<String>,
    /// Append to the per-day index file
    pub index: bool,
    /// Age after which orphaned temp files are swept
    pub orphan_grace_secs: u64,
    /// Database sink settings
    pub database: DatabaseSettings,
}

/// Configuration plus the problems tolerated while building it
#[derive(Debug)]
pub struct LoadedConfig {
    /// The effective configuration
    pub config: ScribeConfig,
    /// Problems that were ignored (lenient loading only)
    pub warnings: Vec<ConfigError>,
}

/// Shape of the TOML file; every field optional
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    enabled: Option<bool>,
    data_dir: Option<PathBuf>,
    sinks: Option<Vec<SinkKind>>,
    log_dir: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    tool_filter: Option<Vec<String>>,
    index: Option<bool>,
    orphan_grace_secs: Option<u64>,
    #[serde(default)]
    database: FileDatabaseConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabaseConfig {
    path: Option<PathBuf>,
    busy_timeout_ms: Option<u64>,
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    max_total_delay_ms: Option<u64>,
}

/// Strict loading fails on the first problem, lenient loading records it
struct Problems {
    strict: bool,
    warnings: Vec<ConfigError>,
}

impl Problems {
    fn report(&mut self, err: ConfigError) -> ConfigResult<()> {
        if self.strict {
            return Err(err);
        }
        warn!(error = %err, "Ignoring invalid configuration");
        self.warnings.push(err);
        Ok(())
    }
}

fn expand(path: &Path) -> PathBuf {
    paths::expand_home(&path.to_string_lossy())
}

impl ScribeConfig {
    /// Default payload cap (10 MiB)
    pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

    /// Default grace window for orphaned temp files
    pub const DEFAULT_ORPHAN_GRACE_SECS: u64 = 300;

    /// Defaults with every path rooted at `data_dir`
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            enabled: true,
            sinks: vec![SinkKind::File],
            log_dir: paths::log_dir(&data_dir),
            max_payload_bytes: Self::DEFAULT_MAX_PAYLOAD_BYTES,
            tool_filter: Vec::new(),
            index: true,
            orphan_grace_secs: Self::DEFAULT_ORPHAN_GRACE_SECS,
            database: DatabaseSettings::at(paths::database_path(&data_dir)),
            data_dir,
        }
    }

    /// Diagnostics log for the event path
    pub fn diagnostics_path(&self) -> PathBuf {
        paths::diagnostics_path(&self.data_dir)
    }

    /// Orphan grace window as a duration
    pub fn orphan_grace(&self) -> Duration {
        Duration::from_secs(self.orphan_grace_secs)
    }

    /// Whether a sink kind is enabled
    pub fn sink_enabled(&self, kind: SinkKind) -> bool {
        self.sinks.contains(&kind)
    }

    /// Load strictly from the process environment; any problem is an error
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        Self::load_from(explicit, &env::process_env, true).map(|loaded| loaded.config)
    }

    /// Load leniently from the process environment; never fails
    pub fn load_lenient(explicit: Option<&Path>) -> LoadedConfig {
        let lookup: EnvLookup<'_> = &env::process_env;
        Self::load_from(explicit, lookup, false).unwrap_or_else(|err| LoadedConfig {
            config: Self::with_data_dir(paths::data_dir(lookup)),
            warnings: vec![err],
        })
    }

    /// Load with an explicit environment source
    pub fn load_from(
        explicit: Option<&Path>,
        env: EnvLookup<'_>,
        strict: bool,
    ) -> ConfigResult<LoadedConfig> {
        let mut problems = Problems {
            strict,
            warnings: Vec::new(),
        };
        let mut config = Self::with_data_dir(paths::data_dir(env));
        let data_dir_pinned = env(env::DATA_DIR).is_some_and(|v| !v.trim().is_empty());

        let file_path = explicit.map(Path::to_path_buf).or_else(|| paths::config_file(env));
        if let Some(path) = file_path {
            match read_file_config(&path, explicit.is_some()) {
                Ok(Some(file)) => config.apply_file(file, data_dir_pinned, &mut problems)?,
                Ok(None) => debug!(path = %path.display(), "No config file"),
                Err(err) => problems.report(err)?,
            }
        }

        config.apply_env(env, &mut problems)?;
        debug!(?config, "Configuration resolved");

        Ok(LoadedConfig {
            config,
            warnings: problems.warnings,
        })
    }

    fn rebase(&mut self, data_dir: PathBuf) {
        self.log_dir = paths::log_dir(&data_dir);
        self.database.path = paths::database_path(&data_dir);
        self.data_dir = data_dir;
    }

    fn apply_file(
        &mut self,
        file: FileConfig,
        data_dir_pinned: bool,
        problems: &mut Problems,
    ) -> ConfigResult<()> {
        if let (Some(dir), false) = (&file.data_dir, data_dir_pinned) {
            self.rebase(expand(dir));
        }
        if let Some(enabled) = file.enabled {
            self.enabled = enabled;
        }
        if let Some(sinks) = file.sinks {
            self.sinks = dedup_sinks(sinks);
        }
        if let Some(dir) = &file.log_dir {
            self.log_dir = expand(dir);
        }
        if let Some(max) = file.max_payload_bytes {
            if max == 0 {
                problems.report(ConfigError::invalid("max_payload_bytes", "0"))?;
            } else {
                self.max_payload_bytes = max;
            }
        }
        if let Some(filter) = file.tool_filter {
            self.tool_filter = filter.into_iter().filter(|p| !p.trim().is_empty()).collect();
        }
        if let Some(index) = file.index {
            self.index = index;
        }
        if let Some(grace) = file.orphan_grace_secs {
            self.orphan_grace_secs = grace;
        }

        let db = file.database;
        if let Some(path) = &db.path {
            self.database.path = expand(path);
        }
        if let Some(ms) = db.busy_timeout_ms {
            self.database.busy_timeout_ms = ms;
        }
        if let Some(attempts) = db.max_attempts {
            if attempts == 0 {
                problems.report(ConfigError::invalid("database.max_attempts", "0"))?;
            } else {
                self.database.max_attempts = attempts;
            }
        }
        if let Some(ms) = db.base_delay_ms {
            self.database.base_delay_ms = ms;
        }
        if let Some(ms) = db.max_delay_ms {
            self.database.max_delay_ms = ms;
        }
        if let Some(ms) = db.max_total_delay_ms {
            self.database.max_total_delay_ms = ms;
        }
        Ok(())
    }

    fn apply_env(&mut self, env: EnvLookup<'_>, problems: &mut Problems) -> ConfigResult<()> {
        if let Some(dir) = env(env::LOG_DIR).filter(|v| !v.trim().is_empty()) {
            self.log_dir = paths::expand_home(dir.trim());
        }
        if let Some(raw) = env(env::DISABLED) {
            match env::parse_bool(env::DISABLED, &raw) {
                Ok(disabled) => self.enabled = !disabled,
                Err(err) => problems.report(err)?,
            }
        }
        if let Some(raw) = env(env::MAX_PAYLOAD_BYTES) {
            match raw.trim().parse::<usize>() {
                Ok(max) if max > 0 => self.max_payload_bytes = max,
                _ => problems.report(ConfigError::invalid(env::MAX_PAYLOAD_BYTES, raw))?,
            }
        }
        if let Some(raw) = env(env::TOOL_FILTER) {
            self.tool_filter = env::parse_list(&raw);
        }
        if let Some(raw) = env(env::INDEX) {
            match env::parse_bool(env::INDEX, &raw) {
                Ok(index) => self.index = index,
                Err(err) => problems.report(err)?,
            }
        }
        if let Some(raw) = env(env::SINKS) {
            let mut sinks = Vec::new();
            for item in env::parse_list(&raw) {
                match item.parse::<SinkKind>() {
                    Ok(kind) => sinks.push(kind),
                    Err(_) => problems.report(ConfigError::invalid(env::SINKS, item))?,
                }
            }
            // An override made entirely of unknown names keeps the previous set
            if !sinks.is_empty() || env::parse_list(&raw).is_empty() {
                self.sinks = dedup_sinks(sinks);
            }
        }
        if let Some(path) = env(env::DB_PATH).filter(|v| !v.trim().is_empty()) {
            self.database.path = paths::expand_home(path.trim());
        }
        Ok(())
    }
}

/// Read and parse a config file; `Ok(None)` when an implicit file is absent
fn read_file_config(path: &Path, required: bool) -> ConfigResult<Option<FileConfig>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
