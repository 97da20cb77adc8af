//! On-disk layout
//!
//! Data directory priority:
//! 1. `HOOKSCRIBE_DATA_DIR`
//! 2. `<XDG data dir>/hookscribe` (`~/.local/share/hookscribe` on Linux)
//! 3. `~/.hookscribe`
//!
//! Everything the event path writes lives under the data directory:
//! `hookscribe.db`, `logs/` and `diagnostics.log`.

use crate::env::{self, EnvLookup};
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Application directory name
pub const APP_NAME: &str = "hookscribe";

const DATABASE_FILE: &str = "hookscribe.db";
const LOG_DIR_NAME: &str = "logs";
const DIAGNOSTICS_FILE: &str = "diagnostics.log";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Expand a leading `~/` against the home directory
pub fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(raw),
        },
        None => PathBuf::from(raw),
    }
}

/// Resolve the base data directory
pub fn data_dir(env: EnvLookup<'_>) -> PathBuf {
    if let Some(dir) = env(env::DATA_DIR).filter(|v| !v.trim().is_empty()) {
        return expand_home(dir.trim());
    }
    if let Some(dir) = dirs::data_dir() {
        return dir.join(APP_NAME);
    }
    match dirs::home_dir() {
        Some(home) => home.join(format!(".{APP_NAME}")),
        None => PathBuf::from(format!(".{APP_NAME}")),
    }
}

/// Default database file inside a data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Default file-sink root inside a data directory
pub fn log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_DIR_NAME)
}

/// Diagnostics log written by the event path
pub fn diagnostics_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DIAGNOSTICS_FILE)
}

/// Config file location: `HOOKSCRIBE_CONFIG`, else `<config dir>/hookscribe/config.toml`
pub fn config_file(env: EnvLookup<'_>) -> Option<PathBuf> {
    if let Some(path) = env(env::CONFIG_FILE).filter(|v| !v.trim().is_empty()) {
        return Some(expand_home(path.trim()));
    }
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
}

/// Which hook settings document to reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsScope {
    /// `~/.claude/settings.json`
    User,
    /// `<project>/.claude/settings.json`
    Project,
    /// `<project>/.claude/settings.local.json`, not meant to be committed
    Local,
}

impl SettingsScope {
    /// Path of the settings document for this scope
    pub fn settings_path(self, project_dir: &Path) -> ConfigResult<PathBuf> {
        match self {
            SettingsScope::User => dirs::home_dir()
                .map(|home| home.join(".claude").join("settings.json"))
                .ok_or(ConfigError::NoDirectory("home")),
            SettingsScope::Project => Ok(project_dir.join(".claude").join("settings.json")),
            SettingsScope::Local => Ok(project_dir.join(".claude").join("settings.local.json")),
        }
    }
}

impl fmt::Display for SettingsScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsScope::User => write!(f, "user"),
            SettingsScope::Project => write!(f, "project"),
            SettingsScope::Local => write!(f, "local"),
        }
    }
}

impl std::str::FromStr for SettingsScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "global" => Ok(SettingsScope::User),
            "project" => Ok(SettingsScope::Project),
            "local" => Ok(SettingsScope::Local),
            other => Err(ConfigError::invalid("scope", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_env_override_wins() {
        let lookup = |key: &str| (key == env::DATA_DIR).then(|| "/srv/scribe".to_string());
        assert_eq!(data_dir(&lookup), PathBuf::from("/srv/scribe"));
    }

    #[test]
    fn test_blank_data_dir_env_is_ignored() {
        let lookup = |key: &str| (key == env::DATA_DIR).then(|| "   ".to_string());
        assert_ne!(data_dir(&lookup), PathBuf::from("   "));
    }

    #[test]
    fn test_layout_under_data_dir() {
        let base = Path::new("/data/hookscribe");
        assert_eq!(database_path(base), base.join("hookscribe.db"));
        assert_eq!(log_dir(base), base.join("logs"));
        assert_eq!(diagnostics_path(base), base.join("diagnostics.log"));
    }

    #[test]
    fn test_project_scopes() {
        let project = Path::new("/work/app");
        assert_eq!(
            SettingsScope::Project.settings_path(project).unwrap(),
            project.join(".claude/settings.json")
        );
        assert_eq!(
            SettingsScope::Local.settings_path(project).unwrap(),
            project.join(".claude/settings.local.json")
        );
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("Project".parse::<SettingsScope>().unwrap(), SettingsScope::Project);
        assert_eq!("global".parse::<SettingsScope>().unwrap(), SettingsScope::User);
        assert!("team".parse::<SettingsScope>().is_err());
    }
}
