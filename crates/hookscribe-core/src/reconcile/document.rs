//! Reading, backing up and atomically rewriting the settings document

use crate::error::ReconcileError;
use chrono::Utc;
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// The parsed settings document
#[derive(Debug, Clone)]
pub(crate) struct SettingsDocument {
    pub root: Map<String, Value>,
    /// Whether a file was present on disk
    pub existed: bool,
}

impl SettingsDocument {
    /// Load `path`; a missing or blank file is an empty document
    pub fn load(path: &Path) -> Result<Self, ReconcileError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Self {
                    root: Map::new(),
                    existed: false,
                })
            }
            Err(source) => {
                return Err(ReconcileError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if text.trim().is_empty() {
            return Ok(Self {
                root: Map::new(),
                existed: true,
            });
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| ReconcileError::Malformed {
            path: path.to_path_buf(),
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;

        match value {
            Value::Object(root) => Ok(Self {
                root,
                existed: true,
            }),
            _ => Err(ReconcileError::Shape {
                path: path.to_path_buf(),
                pointer: String::new(),
                expected: "a JSON object at the root",
            }),
        }
    }

    /// Pretty JSON with a trailing newline
    pub fn render(&self) -> Result<String, ReconcileError> {
        let mut text = serde_json::to_string_pretty(&self.root)?;
        text.push('\n');
        Ok(text)
    }
}

/// Copy the current file to `<name>.<YYYYMMDDTHHMMSS.mmmZ>.bak` beside it
pub(crate) fn backup(path: &Path) -> Result<PathBuf, ReconcileError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "settings.json".to_string());
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");

    let mut candidate = path.with_file_name(format!("{name}.{stamp}.bak"));
    let mut n = 1;
    while candidate.exists() {
        candidate = path.with_file_name(format!("{name}.{stamp}-{n}.bak"));
        n += 1;
    }

    fs::copy(path, &candidate).map_err(|source| ReconcileError::Backup {
        path: path.to_path_buf(),
        backup: candidate.clone(),
        source,
    })?;
    debug!(backup = %candidate.display(), "Settings backed up");
    Ok(candidate)
}

/// Replace `path` with `contents` via a synced temp file and rename
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), ReconcileError> {
    let wrap = |source: io::Error| ReconcileError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(wrap)?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(wrap)?;
    temp.write_all(contents.as_bytes()).map_err(wrap)?;
    if let Ok(meta) = fs::metadata(path) {
        temp.as_file()
            .set_permissions(meta.permissions())
            .map_err(wrap)?;
    }
    temp.as_file().sync_all().map_err(wrap)?;
    temp.persist(path).map_err(|e| wrap(e.error))?;

    sync_dir(&dir);
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!(dir = %dir.display(), error = %e, "Directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
