//! Module descriptors and the namespace-folder map
//!
//! A module is one independently buildable unit: a manifest, a root folder,
//! a root namespace, and the namespaces it declares. Descriptors are supplied
//! by the analysis collaborator and are read-only to the rest of graft.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Errors related to module descriptor construction
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Module name was empty
    #[error("module name is empty")]
    EmptyModuleName,

    /// Manifest path has no parent directory
    #[error("manifest path '{0}' has no parent directory")]
    ManifestWithoutParent(PathBuf),
}

/// Map from namespace suffix to folder path relative to the module root.
///
/// # Invariants
/// - The empty suffix is always present and maps to the module root (the
///   empty relative path).
/// - Insertion is first-write-wins: once a suffix has a folder, later
///   observations for the same suffix are ignored. Many files share a
///   suffix; the map keeps one canonical folder per suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceFolderMap {
    entries: IndexMap<String, String>,
}

impl Default for NamespaceFolderMap {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceFolderMap {
    /// Create a map holding only the guaranteed empty-suffix entry.
    #[must_use]
    pub fn new() -> Self {
        let mut entries = IndexMap::new();
        entries.insert(String::new(), String::new());
        Self { entries }
    }

    /// Record a folder for a suffix. First write wins.
    pub fn record(&mut self, suffix: impl Into<String>, folder: impl Into<String>) {
        let suffix = suffix.into();
        self.entries.entry(suffix).or_insert_with(|| folder.into());
    }

    /// Folder for a suffix, compared case-insensitively.
    #[must_use]
    pub fn get(&self, suffix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(suffix))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over (suffix, folder) entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries, including the empty suffix.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: the empty-suffix entry is guaranteed.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// One buildable unit of the codebase.
///
/// Owned by the analysis collaborator; graft only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Module name (unique within the codebase)
    pub name: String,

    /// Absolute path to the module's build manifest
    pub manifest_path: PathBuf,

    /// Root namespace of the module
    pub root_namespace: String,

    /// Namespaces declared by the module's files
    pub namespaces: Vec<String>,

    /// Names of modules this module depends on
    pub dependencies: Vec<String>,

    /// Namespace suffix → folder map, relative to the module root
    pub folder_map: NamespaceFolderMap,

    /// Whether this module holds tests rather than production code
    pub is_test_module: bool,
}

impl ModuleDescriptor {
    /// Create a descriptor with an empty folder map.
    ///
    /// # Errors
    /// Returns [`LayoutError`] when the name is empty or the manifest path
    /// has no parent directory.
    pub fn new(
        name: impl Into<String>,
        manifest_path: impl Into<PathBuf>,
        root_namespace: impl Into<String>,
    ) -> Result<Self, LayoutError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LayoutError::EmptyModuleName);
        }
        let manifest_path = manifest_path.into();
        if manifest_path.parent().is_none() {
            return Err(LayoutError::ManifestWithoutParent(manifest_path));
        }
        Ok(Self {
            name,
            manifest_path,
            root_namespace: root_namespace.into(),
            namespaces: Vec::new(),
            dependencies: Vec::new(),
            folder_map: NamespaceFolderMap::new(),
            is_test_module: false,
        })
    }

    /// Directory containing the module's manifest.
    #[must_use]
    pub fn root_folder(&self) -> &Path {
        self.manifest_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
    }

    /// Whether this module's dependency list names `other`.
    #[must_use]
    pub fn depends_on(&self, other: &str) -> bool {
        self.dependencies
            .iter()
            .any(|d| d.eq_ignore_ascii_case(other))
    }
}
