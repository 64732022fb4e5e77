//! Error types for verification
//!
//! Only setup-level problems surface as errors: a tool that cannot be
//! found, a module path that does not exist, or cancellation. Per-module
//! build and test failures are outcomes, not errors.

use std::path::PathBuf;

/// Fatal verification errors.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Cancellation was signalled between units of work
    #[error("verification cancelled")]
    Cancelled,

    /// The external tool was not found at any candidate path and the
    /// discovery command produced nothing usable
    #[error("external tool not found; searched {searched:?}")]
    ToolNotFound {
        /// Candidate paths that were checked
        searched: Vec<PathBuf>,
    },

    /// A module named in the build set has no manifest on disk
    #[error("module '{module}' manifest missing at '{path}'")]
    MissingModulePath {
        /// Module name
        module: String,
        /// Expected manifest path
        path: PathBuf,
    },
}
