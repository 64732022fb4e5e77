//! Best-effort rollback
//!
//! Reverses a deployment from its forward log: deletes the files the run
//! created, prunes directories the deletions left empty, and removes the
//! manifest entries the run added. Files that existed before the run and
//! were merged in place are left at their post-merge content; no pre-image
//! is captured, so there is nothing to restore them from.

use crate::manifest;
use crate::record::{DeploymentRecord, RollbackRecord};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Roll back a deployment.
///
/// Individual failures are collected into the returned record's `errors`
/// and never stop the remaining undo steps.
#[must_use]
pub fn rollback(record: &DeploymentRecord, codebase_root: &Path) -> RollbackRecord {
    let mut result = RollbackRecord::default();
    tracing::info!(run_id = %record.run_id, "rolling back deployment");

    for file in record.created_files() {
        match fs::remove_file(&file.target_path) {
            Ok(()) => {
                result.deleted_files.push(file.target_path.clone());
                if let Some(parent) = file.target_path.parent() {
                    prune_empty_dirs(parent, codebase_root, &mut result);
                }
            }
            // Already gone counts as rolled back.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                result.deleted_files.push(file.target_path.clone());
            }
            Err(e) => {
                result.errors.push(format!(
                    "delete {}: {e}",
                    file.target_path.display()
                ));
            }
        }
    }

    for update in &record.manifests {
        if update.error.is_some() || update.added_entries.is_empty() {
            continue;
        }
        match manifest::remove_entries(&update.manifest_path, &update.added_entries) {
            Ok(_) => result.reverted_manifests.push(update.manifest_path.clone()),
            Err(e) => result.errors.push(format!(
                "revert manifest {}: {e}",
                update.manifest_path.display()
            )),
        }
    }

    tracing::info!(
        run_id = %record.run_id,
        deleted = result.deleted_files.len(),
        errors = result.errors.len(),
        "rollback finished"
    );
    result
}

/// Walk upward from `dir`, removing directories left empty, stopping at
/// the codebase root (exclusive).
fn prune_empty_dirs(dir: &Path, codebase_root: &Path, result: &mut RollbackRecord) {
    let mut current = Some(dir);
    while let Some(d) = current {
        if d == codebase_root || !d.starts_with(codebase_root) {
            break;
        }
        let empty = match fs::read_dir(d) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => false,
        };
        if !empty {
            break;
        }
        match fs::remove_dir(d) {
            Ok(()) => result.deleted_dirs.push(d.to_path_buf()),
            Err(e) => {
                result
                    .errors
                    .push(format!("remove dir {}: {e}", d.display()));
                break;
            }
        }
        current = d.parent();
    }
}
