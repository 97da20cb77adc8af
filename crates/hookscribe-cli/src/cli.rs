use clap::{Args, Parser, Subcommand, ValueEnum};
use hookscribe_config::SettingsScope;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// How human-facing commands print results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "hookscribe")]
#[command(about = "hookscribe - record agent hook events to files and SQLite")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level for human commands (the event path logs to the diagnostics file)
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to <config dir>/hookscribe/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Effective stderr log level for human commands
    pub fn level(&self) -> LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.into(),
            (None, true) => LevelFilter::DEBUG,
            (None, false) => LevelFilter::WARN,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record one hook event read from stdin (always exits 0)
    Log {
        /// Hook event type, e.g. PreToolUse
        #[arg(allow_hyphen_values = true)]
        event_type: Option<String>,
    },

    /// Bind hookscribe to hook events in a settings document
    Install(InstallArgs),

    /// Remove hookscribe's bindings from a settings document
    Clear(ClearArgs),

    /// Show recorded events, newest first
    Query(QueryArgs),

    /// Delete recorded events older than an age
    Prune {
        /// Age such as 30d, 12h or 2w
        #[arg(long, value_name = "AGE")]
        older_than: String,
    },

    /// Database size and per-event counts
    Stats {
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Which settings document to edit
#[derive(Args, Debug, Clone)]
pub struct SettingsTarget {
    /// Settings scope: user, project or local
    #[arg(short, long, default_value = "user")]
    pub scope: SettingsScope,

    /// Edit this settings file instead of a scope's file
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Project directory for project/local scopes (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Extra regex identifying commands hookscribe owns (repeatable)
    #[arg(long = "owner-pattern", value_name = "REGEX")]
    pub owner_patterns: Vec<String>,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    #[command(flatten)]
    pub target: SettingsTarget,

    /// Event types to bind (repeatable; defaults to every known type)
    #[arg(short, long = "event", value_name = "EVENT")]
    pub events: Vec<String>,

    /// Tool matcher for tool-scoped events; empty means no matcher
    #[arg(short, long, default_value = "*")]
    pub matcher: String,

    /// Command to bind; `{event}` is replaced by the event type
    #[arg(long, default_value = "hookscribe log {event}")]
    pub command: String,
}

#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    #[command(flatten)]
    pub target: SettingsTarget,

    /// Replace the whole hooks section, including bindings hookscribe does not own
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Filter by hook event type
    #[arg(short, long = "event")]
    pub event: Option<String>,

    /// Filter by tool name
    #[arg(short, long)]
    pub tool: Option<String>,

    /// Filter by session id
    #[arg(long)]
    pub session: Option<String>,

    /// Filter by outcome status (pending, success, error, recorded, malformed)
    #[arg(long)]
    pub status: Option<String>,

    /// Only events newer than an age (1h, 2d) or an RFC 3339 instant
    #[arg(long, value_name = "WHEN")]
    pub since: Option<String>,

    /// Maximum rows; 0 for no limit
    #[arg(short = 'n', long, default_value_t = 100)]
    pub limit: usize,

    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}
