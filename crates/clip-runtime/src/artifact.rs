//! The finished report of one pipeline run.

use std::path::{Path, PathBuf};

use clip_core::error::{ReportError, Result};
use clip_core::models::EntityKind;
use serde::Serialize;
use tracing::info;

/// Counts gathered while a run moves through its stages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub records_read: usize,
    pub aggregate_rows: usize,
    pub members_required: usize,
    pub members_resolved: usize,
    pub products_required: usize,
    pub products_resolved: usize,
    pub courses_required: usize,
    pub courses_resolved: usize,
    pub contents_required: usize,
    pub contents_resolved: usize,
}

impl RunStats {
    /// `(required, resolved)` for one kind.
    pub fn coverage(&self, kind: EntityKind) -> (usize, usize) {
        match kind {
            EntityKind::Member => (self.members_required, self.members_resolved),
            EntityKind::Product => (self.products_required, self.products_resolved),
            EntityKind::Course => (self.courses_required, self.courses_resolved),
            EntityKind::Content => (self.contents_required, self.contents_resolved),
        }
    }

    pub(crate) fn set_coverage(&mut self, kind: EntityKind, required: usize, resolved: usize) {
        let (req, res) = match kind {
            EntityKind::Member => (&mut self.members_required, &mut self.members_resolved),
            EntityKind::Product => (&mut self.products_required, &mut self.products_resolved),
            EntityKind::Course => (&mut self.courses_required, &mut self.courses_resolved),
            EntityKind::Content => (&mut self.contents_required, &mut self.contents_resolved),
        };
        *req = required;
        *res = resolved;
    }
}

/// Rendered CSV plus the file name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub file_name: String,
    pub csv: String,
    pub stats: RunStats,
}

impl ReportArtifact {
    /// Write the CSV into `dir` under [`Self::file_name`] and return the path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.csv.as_bytes()).map_err(|source| ReportError::FileWrite {
            path: path.clone(),
            source,
        })?;
        info!("Saved report to {}", path.display());
        Ok(path)
    }
}
