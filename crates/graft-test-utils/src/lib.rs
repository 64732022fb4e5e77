//! Testing utilities for the graft workspace
//!
//! Shared fixtures: temporary codebase trees with modules and manifests,
//! canned source texts, and executable fake build/test tools.

#![allow(missing_docs)]

use graft_artifact::GeneratedArtifact;
use graft_layout::ModuleDescriptor;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Initialise tracing for tests, once per process. Honors `RUST_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A temporary codebase tree with modules and manifests.
pub struct TestCodebase {
    dir: TempDir,
}

impl TestCodebase {
    pub fn new() -> Self {
        init_test_logging();
        Self {
            dir: TempDir::new().expect("create temp codebase"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create a module directory with an empty manifest and return its
    /// descriptor. `rel_dir` is relative to the codebase root.
    pub fn add_module(
        &self,
        name: &str,
        rel_dir: &str,
        root_namespace: &str,
        dependencies: &[&str],
    ) -> ModuleDescriptor {
        let module_dir = self.root().join(rel_dir);
        fs::create_dir_all(&module_dir).expect("create module dir");
        let manifest_path = module_dir.join(format!("{name}.manifest"));
        fs::write(&manifest_path, "# sources\n").expect("write manifest");

        let mut module =
            ModuleDescriptor::new(name, manifest_path, root_namespace).expect("descriptor");
        module.dependencies = dependencies.iter().map(|d| (*d).to_string()).collect();
        module
    }

    /// Write a file under the codebase root, creating parent directories.
    pub fn write_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, content).expect("write file");
        path
    }

    pub fn read_file(&self, rel_path: &str) -> String {
        fs::read_to_string(self.root().join(rel_path)).expect("read file")
    }
}

impl Default for TestCodebase {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal class source in the dotted-namespace, brace-delimited family.
pub fn class_source(namespace: &str, class_name: &str) -> String {
    format!(
        "namespace {namespace};\n\npublic class {class_name}\n{{\n    public int Get()\n    {{\n        return 1;\n    }}\n}}\n"
    )
}

/// Test-class source carrying a test-marker attribute.
pub fn test_class_source(namespace: &str, class_name: &str) -> String {
    format!(
        "using Placeholder.Target;\n\nnamespace {namespace};\n\n[TestClass]\npublic class {class_name}\n{{\n    [TestMethod]\n    public void Passes()\n    {{\n        Assert.IsTrue(true);\n    }}\n}}\n"
    )
}

/// Artifact for a brand-new file.
pub fn new_file_artifact(declared_path: &str, namespace: &str, class_name: &str) -> GeneratedArtifact {
    GeneratedArtifact::new(declared_path, class_source(namespace, class_name))
        .expect("artifact")
}

/// Write an executable shell script to use as a fake external tool.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{script}\n")).expect("write tool script");
    let mut perms = fs::metadata(&path).expect("tool metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod tool script");
    path
}
