//! Target path resolver
//!
//! Computes the absolute path an artifact belongs at, from its declared
//! namespace and the precomputed module layouts. Four tiers, each weaker
//! than the last:
//!
//! 1. exact full-namespace match
//! 2. longest dot-prefix match, remainder becomes a sub-path
//! 3. path-token match against a module name in the declared path
//! 4. unresolved fallback onto the codebase root, verbatim
//!
//! Resolution never fails: every artifact gets exactly one mapping, and the
//! caller can read the confidence tier to know how much to trust it. The
//! resolver performs no filesystem I/O.

use crate::mapper::namespace_suffix;
use crate::module::ModuleDescriptor;
use graft_artifact::{ContentPatterns, GeneratedArtifact};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Namespace prefixes commonly prepended to test scaffolding namespaces.
const TEST_NAMESPACE_PREFIXES: &[&str] = &["Tests.", "UnitTests.", "IntegrationTests."];

/// How a target path was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionConfidence {
    /// Namespace equals a known full namespace
    Exact,
    /// A dot-prefix of the namespace matched; remainder became a sub-path
    Prefix,
    /// A declared-path segment named a known module
    PathToken,
    /// Nothing matched; declared path joined onto the codebase root
    Fallback,
}

/// An artifact paired with its computed destination.
///
/// Invariant: every artifact produces exactly one mapping, even on total
/// resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMapping {
    /// Declared path, kept for reporting
    pub declared_path: String,
    /// File name component
    pub file_name: String,
    /// Absolute path the artifact should be written to
    pub target_path: PathBuf,
    /// Owning module name, when a module could be identified
    pub module: Option<String>,
    /// Resolution tier that produced the path
    pub confidence: ResolutionConfidence,
}

/// Resolves artifacts to absolute target paths.
///
/// Built once per deployment from the module descriptors; the lookup table
/// is read-only afterward.
#[derive(Debug)]
pub struct TargetPathResolver<'a> {
    modules: &'a [ModuleDescriptor],
    codebase_root: PathBuf,
    patterns: ContentPatterns,
    /// lowercased full namespace → (module index, absolute folder)
    table: IndexMap<String, (usize, PathBuf)>,
}

impl<'a> TargetPathResolver<'a> {
    /// Build the resolver's namespace table from the module descriptors.
    #[must_use]
    pub fn new(
        modules: &'a [ModuleDescriptor],
        codebase_root: impl Into<PathBuf>,
        patterns: ContentPatterns,
    ) -> Self {
        let mut table: IndexMap<String, (usize, PathBuf)> = IndexMap::new();
        for (idx, module) in modules.iter().enumerate() {
            for (suffix, folder) in module.folder_map.iter() {
                let full = join_namespace(&module.root_namespace, suffix);
                if full.is_empty() {
                    continue;
                }
                let abs = if folder.is_empty() {
                    module.root_folder().to_path_buf()
                } else {
                    module.root_folder().join(folder)
                };
                // First module to claim a namespace keeps it.
                table.entry(full.to_ascii_lowercase()).or_insert((idx, abs));
            }
            // Declared namespaces without a folder observation still count
            // as known; they land at whatever folder the map gives their
            // suffix, usually the module root.
            for namespace in &module.namespaces {
                if namespace.is_empty() {
                    continue;
                }
                let suffix = namespace_suffix(namespace, &module.root_namespace);
                let abs = match module.folder_map.get(&suffix) {
                    Some("") | None => module.root_folder().to_path_buf(),
                    Some(folder) => module.root_folder().join(folder),
                };
                table
                    .entry(namespace.to_ascii_lowercase())
                    .or_insert((idx, abs));
            }
        }
        Self {
            modules,
            codebase_root: codebase_root.into(),
            patterns,
            table,
        }
    }

    /// Resolve every artifact. Order of output matches order of input.
    #[must_use]
    pub fn resolve_all(&self, artifacts: &[GeneratedArtifact]) -> Vec<ResolvedMapping> {
        artifacts.iter().map(|a| self.resolve(a)).collect()
    }

    /// Resolve one artifact to its target path.
    #[must_use]
    pub fn resolve(&self, artifact: &GeneratedArtifact) -> ResolvedMapping {
        let file_name = artifact.file_name().to_string();
        let namespace = artifact.declared_namespace(&self.patterns);

        if let Some(ns) = namespace.as_deref() {
            if let Some(mapping) = self.resolve_exact(ns, &file_name) {
                return finish(artifact, mapping);
            }
            if let Some(mapping) = self.resolve_prefix(ns, &file_name) {
                return finish(artifact, mapping);
            }
        }
        if let Some(mapping) = self.resolve_path_token(artifact, namespace.as_deref(), &file_name)
        {
            return finish(artifact, mapping);
        }
        finish(artifact, self.resolve_fallback(artifact, &file_name))
    }

    fn resolve_exact(&self, namespace: &str, file_name: &str) -> Option<Resolved> {
        let (idx, folder) = self.table.get(&namespace.to_ascii_lowercase())?;
        Some(Resolved {
            target_path: folder.join(file_name),
            module: Some(self.modules[*idx].name.clone()),
            confidence: ResolutionConfidence::Exact,
        })
    }

    fn resolve_prefix(&self, namespace: &str, file_name: &str) -> Option<Resolved> {
        let segments: Vec<&str> = namespace.split('.').collect();
        // Longest strict prefix first; the full namespace was tier one.
        for end in (1..segments.len()).rev() {
            let prefix = segments[..end].join(".").to_ascii_lowercase();
            if let Some((idx, folder)) = self.table.get(&prefix) {
                let mut target = folder.clone();
                for segment in &segments[end..] {
                    target.push(segment);
                }
                return Some(Resolved {
                    target_path: target.join(file_name),
                    module: Some(self.modules[*idx].name.clone()),
                    confidence: ResolutionConfidence::Prefix,
                });
            }
        }
        None
    }

    fn resolve_path_token(
        &self,
        artifact: &GeneratedArtifact,
        namespace: Option<&str>,
        file_name: &str,
    ) -> Option<Resolved> {
        let module = artifact.path_segments().into_iter().find_map(|segment| {
            self.modules
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(segment))
        })?;

        let folder = namespace.and_then(|ns| self.lookup_in_module(module, ns));
        let target = match folder {
            Some(rel) if rel.is_empty() => module.root_folder().join(file_name),
            Some(rel) => module.root_folder().join(rel).join(file_name),
            None => module.root_folder().join(file_name),
        };
        Some(Resolved {
            target_path: target,
            module: Some(module.name.clone()),
            confidence: ResolutionConfidence::PathToken,
        })
    }

    /// Namespace lookup within one module's folder map, with test-prefix
    /// stripping and the single-segment-as-folder fallback.
    fn lookup_in_module(&self, module: &ModuleDescriptor, namespace: &str) -> Option<String> {
        let mut suffix = namespace_suffix(namespace, &module.root_namespace);
        if suffix == namespace {
            // Root namespace did not cover it; module names usually mirror
            // the namespace, so retry relative to the name.
            let by_name = namespace_suffix(namespace, &module.name);
            if by_name != namespace {
                suffix = by_name;
            }
        }
        if let Some(folder) = module.folder_map.get(&suffix) {
            return Some(folder.to_string());
        }
        for prefix in TEST_NAMESPACE_PREFIXES {
            for candidate in [
                strip_prefix_ignore_case(&suffix, prefix),
                strip_prefix_ignore_case(namespace, prefix)
                    .map(|rest| namespace_suffix(&rest, &module.root_namespace)),
            ]
            .into_iter()
            .flatten()
            {
                if let Some(folder) = module.folder_map.get(&candidate) {
                    return Some(folder.to_string());
                }
            }
        }
        if !suffix.is_empty() && !suffix.contains('.') {
            // A lone trailing segment becomes a literal sub-folder.
            return Some(suffix);
        }
        // Module identified but namespace unknown: module root.
        Some(String::new())
    }

    fn resolve_fallback(&self, artifact: &GeneratedArtifact, file_name: &str) -> Resolved {
        let mut segments = artifact.path_segments();
        if segments.len() > 1 && !self.looks_like_module_identifier(segments[0]) {
            segments.remove(0);
        }
        let mut target = self.codebase_root.clone();
        for segment in &segments {
            target.push(segment);
        }
        tracing::warn!(
            path = %artifact.declared_path,
            target = %target.display(),
            "artifact did not resolve against any module; using declared path verbatim"
        );
        Resolved {
            target_path: target,
            module: None,
            confidence: ResolutionConfidence::Fallback,
        }
        .ensure_file_name(file_name)
    }

    fn looks_like_module_identifier(&self, segment: &str) -> bool {
        segment.contains('.')
            || self
                .modules
                .iter()
                .any(|m| m.name.eq_ignore_ascii_case(segment))
    }

    /// Root the resolver joins fallback paths onto.
    #[inline]
    #[must_use]
    pub fn codebase_root(&self) -> &Path {
        &self.codebase_root
    }
}

struct Resolved {
    target_path: PathBuf,
    module: Option<String>,
    confidence: ResolutionConfidence,
}

impl Resolved {
    fn ensure_file_name(mut self, file_name: &str) -> Self {
        let has_name = self
            .target_path
            .file_name()
            .is_some_and(|n| n.to_string_lossy() == file_name);
        if !has_name {
            self.target_path.push(file_name);
        }
        self
    }
}

fn finish(artifact: &GeneratedArtifact, resolved: Resolved) -> ResolvedMapping {
    ResolvedMapping {
        declared_path: artifact.declared_path.clone(),
        file_name: artifact.file_name().to_string(),
        target_path: resolved.target_path,
        module: resolved.module,
        confidence: resolved.confidence,
    }
}

fn join_namespace(root: &str, suffix: &str) -> String {
    match (root.is_empty(), suffix.is_empty()) {
        (true, _) => suffix.to_string(),
        (_, true) => root.to_string(),
        _ => format!("{root}.{suffix}"),
    }
}

fn strip_prefix_ignore_case(value: &str, prefix: &str) -> Option<String> {
    if value.len() > prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(value[prefix.len()..].to_string())
    } else {
        None
    }
}
