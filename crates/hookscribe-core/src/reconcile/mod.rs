//! Install and clear hook bindings in the runtime's settings document
//!
//! Every operation loads the document fresh, edits it in memory, and writes
//! it back only when something changed. The first write of a
//! [`Reconciler`] session copies the previous file to a timestamped backup.
//! Invalid documents are rejected before anything is written.

mod binding;
mod document;

pub use binding::{HookBinding, Overlap, OverlapKind, OwnershipPatterns, DEFAULT_OWNERSHIP_PATTERN};

use crate::error::ReconcileError;
use crate::event::EventType;
use binding::{Merge, ShapeError};
use document::SettingsDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a reconciliation did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<HookBinding>,
    pub unchanged: Vec<HookBinding>,
    pub removed: Vec<HookBinding>,
    pub overlaps: Vec<Overlap>,
    /// `hooks` was replaced wholesale
    pub hooks_reset: bool,
    /// The document was rewritten
    pub written: bool,
    /// Backup taken by this operation
    pub backup: Option<PathBuf>,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || self.hooks_reset
    }
}

/// Edits one settings file
#[derive(Debug, Clone)]
pub struct Reconciler {
    path: PathBuf,
    ownership: OwnershipPatterns,
    dry_run: bool,
    backup: Option<PathBuf>,
}

impl Reconciler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ownership: OwnershipPatterns::default(),
            dry_run: false,
            backup: None,
        }
    }

    pub fn with_ownership(mut self, ownership: OwnershipPatterns) -> Self {
        self.ownership = ownership;
        self
    }

    /// Compute reports without writing anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backup taken earlier in this session, if any
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    /// Ensure `command` is bound for every event type under `matcher`
    ///
    /// Already-present bindings are left alone, so repeating the same
    /// install is a no-op.
    pub fn install(
        &mut self,
        event_types: &[EventType],
        matcher: Option<&str>,
        command: &str,
    ) -> Result<ReconcileReport, ReconcileError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ReconcileError::EmptyCommand);
        }
        let matcher = binding::normalize_matcher(matcher);

        let mut doc = self.load_validated()?;
        let mut report = ReconcileReport::default();
        let mut seen: Vec<&EventType> = Vec::new();

        for event_type in event_types {
            if seen.contains(&event_type) {
                continue;
            }
            seen.push(event_type);

            let requested = HookBinding::new(event_type.as_str(), matcher, command);
            let merge = binding::merge_binding(
                &mut doc.root,
                &requested,
                &self.ownership,
                &mut report.overlaps,
            )
            .map_err(|e| self.shape_error(e))?;

            match merge {
                Merge::Added => report.added.push(requested),
                Merge::AlreadyPresent => report.unchanged.push(requested),
            }
        }

        for overlap in &report.overlaps {
            warn!(
                event_type = %overlap.existing.event_type,
                existing = %overlap.existing,
                "Overlapping hook binding left in place"
            );
        }

        self.commit(&doc, &mut report)?;
        Ok(report)
    }

    /// Remove bindings this tool owns, or every binding under `force`
    pub fn clear(&mut self, force: bool) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();

        let mut doc = if force {
            SettingsDocument::load(&self.path)?
        } else {
            self.load_validated()?
        };

        if force {
            let (removed, reset) = binding::reset_hooks(&mut doc.root);
            report.removed = removed;
            report.hooks_reset = reset;
        } else {
            report.removed = binding::remove_owned(&mut doc.root, &self.ownership);
        }

        self.commit(&doc, &mut report)?;
        Ok(report)
    }

    /// Bindings currently in the document
    pub fn bindings(&self) -> Result<Vec<HookBinding>, ReconcileError> {
        let doc = self.load_validated()?;
        Ok(binding::list_bindings(&doc.root))
    }

    fn load_validated(&self) -> Result<SettingsDocument, ReconcileError> {
        let doc = SettingsDocument::load(&self.path)?;
        binding::validate(&doc.root).map_err(|e| self.shape_error(e))?;
        Ok(doc)
    }

    fn shape_error(&self, error: ShapeError) -> ReconcileError {
        ReconcileError::Shape {
            path: self.path.clone(),
            pointer: error.pointer,
            expected: error.expected,
        }
    }

    fn commit(
        &mut self,
        doc: &SettingsDocument,
        report: &mut ReconcileReport,
    ) -> Result<(), ReconcileError> {
        if !report.changed() || self.dry_run {
            return Ok(());
        }

        let contents = doc.render()?;

        if doc.existed && self.backup.is_none() {
            let backup = document::backup(&self.path)?;
            report.backup = Some(backup.clone());
            self.backup = Some(backup);
        }

        document::write_atomic(&self.path, &contents)?;
        report.written = true;

        info!(
            path = %self.path.display(),
            added = report.added.len(),
            removed = report.removed.len(),
            "Settings updated"
        );
        Ok(())
    }
}
