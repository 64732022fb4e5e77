//! External tool discovery
//!
//! Replaces hard-coded tool search paths with an injected locator: an
//! ordered list of candidate paths, then an optional discovery command
//! (`which`-style) whose first output line is taken as the tool path.

use crate::error::VerifyError;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Finds the external build/test tool. Injected at construction of the
/// orchestrators; a miss is a fatal setup error for the whole call.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    candidates: Vec<PathBuf>,
    discovery_command: Option<(String, Vec<String>)>,
}

impl ToolLocator {
    /// Locator over an ordered list of candidate paths.
    #[must_use]
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            discovery_command: None,
        }
    }

    /// Add a discovery command tried after the candidates, e.g.
    /// `("which", ["buildtool"])`.
    #[must_use]
    pub fn with_discovery_command(
        mut self,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        self.discovery_command = Some((program.into(), args));
        self
    }

    /// Resolve the tool path.
    ///
    /// # Errors
    /// [`VerifyError::ToolNotFound`] when no candidate exists and the
    /// discovery command yields nothing usable.
    pub async fn locate(&self) -> Result<PathBuf, VerifyError> {
        for candidate in &self.candidates {
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
        }

        if let Some((program, args)) = &self.discovery_command {
            if let Some(found) = self.discover(program, args).await {
                return Ok(found);
            }
        }

        Err(VerifyError::ToolNotFound {
            searched: self.candidates.clone(),
        })
    }

    async fn discover(&self, program: &str, args: &[String]) -> Option<PathBuf> {
        let run = Command::new(program).args(args).output();
        let output = tokio::time::timeout(Duration::from_secs(10), run)
            .await
            .ok()?
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next()?.trim();
        if line.is_empty() {
            return None;
        }
        let path = PathBuf::from(line);
        path.is_file().then_some(path)
    }
}
