//! Namespace-to-location mapper
//!
//! Reduces per-file (namespace, folder) observations collected while a
//! module was scanned into the module's root namespace and a deterministic
//! suffix → folder map. Runs once per module so deployment never has to
//! scan the filesystem again.

use crate::module::NamespaceFolderMap;
use indexmap::IndexMap;

/// One (namespace, folder) pair observed while scanning a module's files.
///
/// `folder` is relative to the module root; empty means the file sits at
/// the module root itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceObservation {
    /// Namespace declared by the file
    pub namespace: String,
    /// Folder the file was found in, relative to the module root
    pub folder: String,
}

impl NamespaceObservation {
    /// Create an observation.
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            folder: folder.into(),
        }
    }
}

/// Derived layout for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    /// Root namespace of the module
    pub root_namespace: String,
    /// Suffix → folder map, empty suffix guaranteed
    pub folders: NamespaceFolderMap,
}

/// Derive a module's layout from scan observations.
///
/// Root namespace selection, in order:
/// 1. the most frequent namespace among files sitting at the module root;
/// 2. `known_root`, when the caller already knows it;
/// 3. the longest common dot-separated prefix of all observed namespaces,
///    comparing segments case-insensitively.
///
/// Every observation then contributes its suffix relative to the root,
/// first-write-wins per suffix.
#[must_use]
pub fn derive_layout(
    observations: &[NamespaceObservation],
    known_root: Option<&str>,
) -> ModuleLayout {
    let root_namespace = root_at_module_root(observations)
        .or_else(|| known_root.map(str::to_string))
        .or_else(|| longest_common_prefix(observations))
        .unwrap_or_default();

    let mut folders = NamespaceFolderMap::new();
    for obs in observations {
        let suffix = namespace_suffix(&obs.namespace, &root_namespace);
        folders.record(suffix, obs.folder.clone());
    }

    ModuleLayout {
        root_namespace,
        folders,
    }
}

/// Suffix of `namespace` relative to `root`.
///
/// Empty when equal to the root, the tail after `root.` when prefixed by
/// it, the full namespace otherwise. Comparison is case-insensitive.
#[must_use]
pub fn namespace_suffix(namespace: &str, root: &str) -> String {
    if root.is_empty() {
        return namespace.to_string();
    }
    if namespace.eq_ignore_ascii_case(root) {
        return String::new();
    }
    if namespace.len() > root.len() + 1
        && namespace.is_char_boundary(root.len())
        && namespace[..root.len()].eq_ignore_ascii_case(root)
        && namespace.as_bytes()[root.len()] == b'.'
    {
        return namespace[root.len() + 1..].to_string();
    }
    namespace.to_string()
}

fn root_at_module_root(observations: &[NamespaceObservation]) -> Option<String> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for obs in observations.iter().filter(|o| o.folder.is_empty()) {
        *counts.entry(obs.namespace.as_str()).or_insert(0) += 1;
    }
    // Strictly-greater keeps the earliest observed namespace on a tie,
    // since IndexMap iterates in first-seen order.
    let mut best: Option<(&str, usize)> = None;
    for (ns, &count) in &counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((ns, count));
        }
    }
    best.map(|(ns, _)| ns.to_string())
}

fn longest_common_prefix(observations: &[NamespaceObservation]) -> Option<String> {
    let mut namespaces = observations.iter().map(|o| o.namespace.as_str());
    let first = namespaces.next()?;
    let mut prefix: Vec<&str> = first.split('.').collect();

    for ns in namespaces {
        let segments: Vec<&str> = ns.split('.').collect();
        let common = prefix
            .iter()
            .zip(segments.iter())
            .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
            .count();
        prefix.truncate(common);
        if prefix.is_empty() {
            return None;
        }
    }

    Some(prefix.join("."))
}
