//! Content inspection patterns
//!
//! Compiled pattern tables for pulling structure out of generated text.
//! Built once (process-wide defaults via `Lazy`) and passed by reference;
//! never mutable global state.

use once_cell::sync::Lazy;
use regex::Regex;

static NAMESPACE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:namespace|package)\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)",
    )
    .expect("namespace pattern is valid")
});

static USING_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:using|import)\s+(?:static\s+)?([A-Za-z_][A-Za-z0-9_.]*)\s*;")
        .expect("using pattern is valid")
});

/// Compiled patterns for inspecting artifact content.
///
/// Covers the dotted-namespace, brace-delimited source family the generator
/// emits (`namespace X;`, `namespace X {`, `package X;`).
#[derive(Debug, Clone)]
pub struct ContentPatterns {
    namespace_decl: Regex,
    using_decl: Regex,
}

impl Default for ContentPatterns {
    fn default() -> Self {
        Self {
            namespace_decl: NAMESPACE_DECL.clone(),
            using_decl: USING_DECL.clone(),
        }
    }
}

impl ContentPatterns {
    /// Create with custom declaration patterns.
    ///
    /// `namespace_decl` must expose the dotted namespace as capture group 1;
    /// `using_decl` must expose the imported namespace as capture group 1.
    #[must_use]
    pub fn new(namespace_decl: Regex, using_decl: Regex) -> Self {
        Self {
            namespace_decl,
            using_decl,
        }
    }

    /// First namespace declared in `content`, if any.
    #[must_use]
    pub fn declared_namespace(&self, content: &str) -> Option<String> {
        self.namespace_decl
            .captures(content)
            .map(|c| c[1].to_string())
    }

    /// Every namespace imported by a using/import directive in `content`.
    #[must_use]
    pub fn imported_namespaces(&self, content: &str) -> Vec<String> {
        self.using_decl
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect()
    }
}
