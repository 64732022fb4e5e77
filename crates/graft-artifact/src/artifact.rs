//! Generated artifact model
//!
//! Defines [`GeneratedArtifact`], the unit of generated content a deployment
//! consumes. Artifact content is untrusted generator output; graft treats it
//! as opaque text except for the inspection in [`crate::inspect`].

use crate::inspect::ContentPatterns;
use serde::{Deserialize, Serialize};

/// Errors related to artifact construction
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Declared path was empty or whitespace
    #[error("artifact has an empty declared path")]
    EmptyPath,

    /// Content was empty
    #[error("artifact '{0}' has empty content")]
    EmptyContent(String),
}

/// One unit of generated source text slated for deployment.
///
/// The declared path is whatever the generator produced. It is **not**
/// authoritative: the target path resolver computes where the artifact
/// really belongs, and only falls back to the declared path when every
/// structured resolution tier fails.
///
/// Consumed once per deployment and not retained afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Relative path as produced by the generator (not authoritative)
    pub declared_path: String,

    /// Generated source text
    pub content: String,

    /// Whether this artifact modifies an existing file (method-level merge)
    /// rather than introducing a new one
    pub is_modification: bool,

    /// Method to replace when `is_modification` is set
    pub target_method: Option<String>,

    /// Type the target method belongs to, when known
    pub target_type: Option<String>,

    /// Whether this artifact is test scaffolding
    pub is_test_artifact: bool,

    /// Real implementation namespace, for rebinding placeholder imports in
    /// test scaffolding after deployment
    pub real_namespace: Option<String>,

    /// Real implementation type name paired with `real_namespace`
    pub real_type: Option<String>,
}

impl GeneratedArtifact {
    /// Create a new-file artifact.
    ///
    /// # Errors
    /// Returns [`ArtifactError::EmptyPath`] or [`ArtifactError::EmptyContent`]
    /// when the generator handed us nothing usable.
    pub fn new(
        declared_path: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, ArtifactError> {
        let declared_path = declared_path.into();
        if declared_path.trim().is_empty() {
            return Err(ArtifactError::EmptyPath);
        }
        let content = content.into();
        if content.is_empty() {
            return Err(ArtifactError::EmptyContent(declared_path));
        }
        Ok(Self {
            declared_path,
            content,
            is_modification: false,
            target_method: None,
            target_type: None,
            is_test_artifact: false,
            real_namespace: None,
            real_type: None,
        })
    }

    /// Mark this artifact as a modification of an existing file.
    #[must_use]
    pub fn as_modification(mut self, target_method: impl Into<String>) -> Self {
        self.is_modification = true;
        self.target_method = Some(target_method.into());
        self
    }

    /// Set the type the target method belongs to.
    #[must_use]
    pub fn with_target_type(mut self, target_type: impl Into<String>) -> Self {
        self.target_type = Some(target_type.into());
        self
    }

    /// Mark this artifact as test scaffolding, optionally bound to the real
    /// implementation namespace/type it should reference after deployment.
    #[must_use]
    pub fn as_test(
        mut self,
        real_namespace: Option<String>,
        real_type: Option<String>,
    ) -> Self {
        self.is_test_artifact = true;
        self.real_namespace = real_namespace;
        self.real_type = real_type;
        self
    }

    /// File name component of the declared path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.declared_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.declared_path)
    }

    /// Declared path split into segments, empty segments dropped.
    ///
    /// Both separators are accepted since generator output mixes them.
    #[must_use]
    pub fn path_segments(&self) -> Vec<&str> {
        self.declared_path
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Namespace declared inside the artifact content, if any.
    ///
    /// The first `namespace`/`package` declaration wins; generated files
    /// carry at most one.
    #[must_use]
    pub fn declared_namespace(&self, patterns: &ContentPatterns) -> Option<String> {
        patterns.declared_namespace(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_empty_path() {
        assert!(matches!(
            GeneratedArtifact::new("  ", "class A { }"),
            Err(ArtifactError::EmptyPath)
        ));
    }

    #[test]
    fn rejects_empty_content() {
        assert!(matches!(
            GeneratedArtifact::new("A/B.cs", ""),
            Err(ArtifactError::EmptyContent(_))
        ));
    }

    #[test]
    fn file_name_handles_both_separators() {
        let a = GeneratedArtifact::new("Acme\\Sub/File.cs", "x").unwrap();
        assert_eq!(a.file_name(), "File.cs");
        assert_eq!(a.path_segments(), vec!["Acme", "Sub", "File.cs"]);
    }

    #[test]
    fn builder_flags_compose() {
        let a = GeneratedArtifact::new("M/T.cs", "class T { }")
            .unwrap()
            .as_modification("Handle")
            .with_target_type("T")
            .as_test(Some("Acme.Real".into()), Some("RealThing".into()));
        assert!(a.is_modification);
        assert!(a.is_test_artifact);
        assert_eq!(a.target_method.as_deref(), Some("Handle"));
        assert_eq!(a.real_namespace.as_deref(), Some("Acme.Real"));
    }
}
