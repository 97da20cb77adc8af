//! # hookscribe configuration
//!
//! Foundation crate shared by every other hookscribe crate. It owns:
//!
//! - [`ScribeConfig`]: the effective settings for one invocation, layered as
//!   defaults, then the TOML config file, then `HOOKSCRIBE_*` environment
//!   overrides
//! - [`paths`]: XDG-aware resolution of the data directory, database file,
//!   log root and the hook settings document for each [`SettingsScope`]
//! - [`SinkKind`]: which durable destinations are enabled
//!
//! ## Loading
//!
//! ```rust,no_run
//! use hookscribe_config::ScribeConfig;
//!
//! // Human-driven commands: any problem is an error
//! let config = ScribeConfig::load(None)?;
//!
//! // Event hot path: problems become warnings, defaults are kept
//! let loaded = ScribeConfig::load_lenient(None);
//! for warning in &loaded.warnings {
//!     eprintln!("{warning}");
//! }
//! # Ok::<(), hookscribe_config::ConfigError>(())
//! ```

#![warn(missing_docs)]

mod config;
pub mod env;
mod error;
pub mod paths;

pub use config::{DatabaseSettings, LoadedConfig, ScribeConfig, SinkKind};
pub use error::{ConfigError, ConfigResult};
pub use paths::SettingsScope;
