//! Deployment and rollback records
//!
//! Append-only logs of what a deployment run did, detailed enough for the
//! verification runner to find the touched test files and for rollback to
//! undo the run selectively.

use chrono::{DateTime, Utc};
use graft_layout::ResolutionConfidence;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Outcome of writing one artifact to its target path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCopyOutcome {
    /// Declared path as the generator produced it
    pub declared_path: String,
    /// Absolute path the artifact was written to
    pub target_path: PathBuf,
    /// Owning module, when resolution identified one
    pub module: Option<String>,
    /// Resolution tier that produced the target path
    pub confidence: ResolutionConfidence,
    /// True when the file did not exist before this run
    pub created: bool,
    /// True when a method-level merge was applied
    pub merged: bool,
    /// True when the merge degraded to full-file replacement
    pub degraded_merge: bool,
    /// True when the artifact is test scaffolding
    pub is_test_artifact: bool,
    /// Write error, when the copy failed
    pub error: Option<String>,
}

impl FileCopyOutcome {
    /// Whether the file reached the disk.
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of amending one module's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestUpdateOutcome {
    /// Module whose manifest was amended
    pub module: String,
    /// Absolute manifest path
    pub manifest_path: PathBuf,
    /// Entries actually added (already-present entries are not repeated)
    pub added_entries: Vec<String>,
    /// Update error, when the rewrite failed
    pub error: Option<String>,
}

/// Append-only log for one deployment run.
///
/// Created at deployment start; persists until explicitly rolled back or
/// discarded by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Unique id of this run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Per-file copy outcomes, in deployment order
    pub files: Vec<FileCopyOutcome>,
    /// Per-module manifest outcomes, in deployment order
    pub manifests: Vec<ManifestUpdateOutcome>,
    /// False when any file or manifest outcome failed
    pub success: bool,
}

impl DeploymentRecord {
    /// Start an empty record for a new run.
    #[must_use]
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            files: Vec::new(),
            manifests: Vec::new(),
            success: true,
        }
    }

    /// Module names touched by successfully copied files, first-seen order.
    #[must_use]
    pub fn touched_modules(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for outcome in self.files.iter().filter(|f| f.succeeded()) {
            if let Some(module) = outcome.module.as_deref() {
                if !seen.iter().any(|m: &&str| m.eq_ignore_ascii_case(module)) {
                    seen.push(module);
                }
            }
        }
        seen
    }

    /// Successfully copied test files.
    #[must_use]
    pub fn test_files(&self) -> Vec<&FileCopyOutcome> {
        self.files
            .iter()
            .filter(|f| f.succeeded() && f.is_test_artifact)
            .collect()
    }

    /// Files this run newly created (rollback deletes exactly these).
    #[must_use]
    pub fn created_files(&self) -> Vec<&FileCopyOutcome> {
        self.files
            .iter()
            .filter(|f| f.succeeded() && f.created)
            .collect()
    }
}

/// What a rollback actually undid.
///
/// Built only from a [`DeploymentRecord`]; never constructed independently.
/// Files that existed before the run and were modified in place are left at
/// their post-merge content: no pre-image is captured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackRecord {
    /// Created files that were deleted
    pub deleted_files: Vec<PathBuf>,
    /// Directories removed because the deletions left them empty
    pub deleted_dirs: Vec<PathBuf>,
    /// Manifests whose added entries were removed again
    pub reverted_manifests: Vec<PathBuf>,
    /// Per-item failures; rollback continues past them
    pub errors: Vec<String>,
}

impl RollbackRecord {
    /// Whether every undo step succeeded.
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
