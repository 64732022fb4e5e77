//! Deployment engine
//!
//! Drives one deployment run: resolve every artifact, write or merge it,
//! then amend the touched modules' manifests. Artifacts and manifests are
//! processed sequentially; manifest edits on the same module must not race,
//! and the run is bounded by I/O rather than CPU.

use crate::cancel::CancelToken;
use crate::manifest;
use crate::record::{DeploymentRecord, FileCopyOutcome, ManifestUpdateOutcome, RollbackRecord};
use crate::rollback;
use graft_artifact::{ContentPatterns, GeneratedArtifact};
use graft_layout::{ModuleDescriptor, TargetPathResolver};
use graft_merge::{merge_method, rebind_test_imports, MergePatterns};
use std::io;
use std::path::PathBuf;

/// Errors that abort a whole deployment call.
///
/// Per-file and per-manifest failures never abort the run; they are
/// recorded in the [`DeploymentRecord`] and flip its `success` flag.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Cancellation was signalled between units of work.
    ///
    /// Carries the partial record so the caller can still inspect or roll
    /// back what was committed before the signal. Nothing is undone
    /// automatically.
    #[error("deployment cancelled after {} file(s)", record.files.len())]
    Cancelled {
        /// Log of the steps committed before cancellation
        record: Box<DeploymentRecord>,
    },

    /// The configured codebase root does not exist
    #[error("codebase root '{0}' does not exist")]
    MissingCodebaseRoot(PathBuf),
}

/// Deployment configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Root directory of the codebase being deployed into
    pub codebase_root: PathBuf,
    /// Patterns for inspecting artifact content
    pub content_patterns: ContentPatterns,
    /// Patterns for method extraction and import rewriting
    pub merge_patterns: MergePatterns,
}

impl DeployConfig {
    /// Config with default pattern tables.
    #[must_use]
    pub fn new(codebase_root: impl Into<PathBuf>) -> Self {
        Self {
            codebase_root: codebase_root.into(),
            content_patterns: ContentPatterns::default(),
            merge_patterns: MergePatterns::default(),
        }
    }
}

/// Applies generated artifacts to the codebase and logs every mutation.
#[derive(Debug)]
pub struct DeploymentEngine {
    config: DeployConfig,
}

impl DeploymentEngine {
    /// Create an engine with the given configuration.
    #[inline]
    #[must_use]
    pub fn new(config: DeployConfig) -> Self {
        Self { config }
    }

    /// Engine configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Deploy artifacts into the codebase described by `modules`.
    ///
    /// Artifacts are written one at a time, then each touched module's
    /// manifest is amended with the newly created files. Individual
    /// failures are recorded and the run continues; the returned record's
    /// `success` flag reports the aggregate.
    ///
    /// # Errors
    /// - [`DeployError::MissingCodebaseRoot`] before anything is attempted
    /// - [`DeployError::Cancelled`] when the token fires between units of
    ///   work; the partial record rides along in the error
    pub async fn deploy(
        &self,
        artifacts: &[GeneratedArtifact],
        modules: &[ModuleDescriptor],
        cancel: &CancelToken,
    ) -> Result<DeploymentRecord, DeployError> {
        if !self.config.codebase_root.is_dir() {
            return Err(DeployError::MissingCodebaseRoot(
                self.config.codebase_root.clone(),
            ));
        }

        let resolver = TargetPathResolver::new(
            modules,
            &self.config.codebase_root,
            self.config.content_patterns.clone(),
        );

        let mut record = DeploymentRecord::start();
        tracing::info!(
            run_id = %record.run_id,
            artifacts = artifacts.len(),
            "starting deployment"
        );

        for artifact in artifacts {
            if cancel.is_cancelled() {
                return Err(DeployError::Cancelled {
                    record: Box::new(record),
                });
            }
            let outcome = self.deploy_one(artifact, &resolver).await;
            if !outcome.succeeded() {
                record.success = false;
            }
            record.files.push(outcome);
        }

        let touched: Vec<String> = record
            .touched_modules()
            .into_iter()
            .map(str::to_string)
            .collect();
        for module_name in touched {
            if cancel.is_cancelled() {
                return Err(DeployError::Cancelled {
                    record: Box::new(record),
                });
            }
            let outcome = self.update_manifest(&record, &module_name, modules);
            if outcome.error.is_some() {
                record.success = false;
            }
            record.manifests.push(outcome);
        }

        tracing::info!(
            run_id = %record.run_id,
            success = record.success,
            files = record.files.len(),
            "deployment finished"
        );
        Ok(record)
    }

    /// Undo this engine's deployment per `record`.
    ///
    /// Delegates to [`rollback::rollback`] with the configured codebase
    /// root. Never invoked automatically.
    #[must_use]
    pub fn rollback(&self, record: &DeploymentRecord) -> RollbackRecord {
        rollback::rollback(record, &self.config.codebase_root)
    }

    async fn deploy_one(
        &self,
        artifact: &GeneratedArtifact,
        resolver: &TargetPathResolver<'_>,
    ) -> FileCopyOutcome {
        let mapping = resolver.resolve(artifact);
        let target = mapping.target_path.clone();
        let existed = target.is_file();

        let mut merged = false;
        let mut degraded_merge = false;
        let result: io::Result<()> = async {
            let mut content = match (&artifact.target_method, artifact.is_modification && existed)
            {
                (Some(method), true) => {
                    let existing = tokio::fs::read_to_string(&target).await?;
                    let merge = merge_method(
                        &existing,
                        &artifact.content,
                        method,
                        &self.config.merge_patterns,
                    );
                    merged = !merge.degraded;
                    degraded_merge = merge.degraded;
                    merge.content
                }
                _ => artifact.content.clone(),
            };

            if artifact.is_test_artifact {
                if let Some(real) = &artifact.real_namespace {
                    content = rebind_test_imports(&content, real, &self.config.merge_patterns);
                }
            }

            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await
        }
        .await;

        let error = result.err().map(|e| e.to_string());
        if let Some(err) = &error {
            tracing::error!(target = %target.display(), error = err, "artifact write failed");
        }
        FileCopyOutcome {
            declared_path: artifact.declared_path.clone(),
            target_path: target,
            module: mapping.module,
            confidence: mapping.confidence,
            created: !existed,
            merged,
            degraded_merge,
            is_test_artifact: artifact.is_test_artifact,
            error,
        }
    }

    /// Add the module's newly created files to its manifest. Files the run
    /// modified in place are already listed.
    fn update_manifest(
        &self,
        record: &DeploymentRecord,
        module_name: &str,
        modules: &[ModuleDescriptor],
    ) -> ManifestUpdateOutcome {
        let Some(module) = modules
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(module_name))
        else {
            return ManifestUpdateOutcome {
                module: module_name.to_string(),
                manifest_path: PathBuf::new(),
                added_entries: Vec::new(),
                error: Some(format!("module '{module_name}' not in module graph")),
            };
        };

        let manifest_dir = module.root_folder();
        let entries: Vec<String> = record
            .created_files()
            .iter()
            .filter(|f| {
                f.module
                    .as_deref()
                    .is_some_and(|m| m.eq_ignore_ascii_case(module_name))
            })
            .filter_map(|f| {
                f.target_path
                    .strip_prefix(manifest_dir)
                    .ok()
                    .map(|rel| rel.display().to_string())
            })
            .collect();

        let (added_entries, error) = if entries.is_empty() {
            (Vec::new(), None)
        } else {
            match manifest::add_entries(&module.manifest_path, &entries) {
                Ok(added) => (added, None),
                Err(e) => (Vec::new(), Some(e.to_string())),
            }
        };
        if let Some(err) = &error {
            tracing::error!(module = module_name, error = err, "manifest update failed");
        }
        ManifestUpdateOutcome {
            module: module_name.to_string(),
            manifest_path: module.manifest_path.clone(),
            added_entries,
            error,
        }
    }
}
