//! Defaults, config file and environment combined through the public API

use hookscribe_config::{env, ScribeConfig, SinkKind};
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_file_then_env_precedence() {
    let temp = TempDir::new().unwrap();
    let data = temp.path().join("data");
    let file = temp.path().join("config.toml");
    fs::write(
        &file,
        r#"
sinks = ["file", "sqlite"]
tool_filter = ["Bash", "Edit*"]
index = false

[database]
busy_timeout_ms = 2500
max_attempts = 3
"#,
    )
    .unwrap();

    let vars: HashMap<&str, String> = [
        (env::DATA_DIR, data.display().to_string()),
        (env::TOOL_FILTER, "Read".to_string()),
        (env::INDEX, "yes".to_string()),
    ]
    .into_iter()
    .collect();
    let lookup = |key: &str| vars.get(key).cloned();

    let loaded = ScribeConfig::load_from(Some(&file), &lookup, true).unwrap();
    let config = loaded.config;

    assert!(loaded.warnings.is_empty());
    assert_eq!(config.sinks, vec![SinkKind::File, SinkKind::Sqlite]);
    assert_eq!(config.tool_filter, vec!["Read".to_string()]);
    assert!(config.index);
    assert_eq!(config.database.busy_timeout_ms, 2500);
    assert_eq!(config.database.max_attempts, 3);
    assert_eq!(config.database.path, data.join("hookscribe.db"));
    assert_eq!(config.log_dir, data.join("logs"));
    assert_eq!(config.diagnostics_path(), data.join("diagnostics.log"));
}

#[test]
fn test_broken_file_is_fatal_only_when_strict() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("config.toml");
    fs::write(&file, "sinks = [").unwrap();
    let data = temp.path().display().to_string();
    let lookup = |key: &str| (key == env::DATA_DIR).then(|| data.clone());

    assert!(ScribeConfig::load_from(Some(&file), &lookup, true).is_err());

    let lenient = ScribeConfig::load_from(Some(&file), &lookup, false).unwrap();
    assert_eq!(lenient.warnings.len(), 1);
    assert!(lenient.config.enabled);
    assert_eq!(lenient.config.sinks, vec![SinkKind::File]);
}
