//! Dependency-aware build orchestrator
//!
//! Rebuilds the modules a deployment touched, plus their direct dependents,
//! in that order. Dependent detection is one level deep on purpose:
//! transitive dependents are not rebuilt, and extending this to the
//! transitive closure would change observable build sets and must be an
//! explicit, separate mode.

use crate::error::VerifyError;
use crate::locate::ToolLocator;
use crate::subprocess::{SubprocessInvoker, ToolInvoker};
use graft_deploy::CancelToken;
use graft_layout::ModuleDescriptor;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Build invocation configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Build configuration name passed to the tool (`--configuration`)
    pub configuration: String,
    /// Per-module build timeout
    pub timeout: Duration,
    /// Substrings in combined output that mark a failed build even when
    /// the tool exits zero. Matched case-insensitively per line; defaults
    /// are failure-shaped so a clean summary like `0 Error(s)` never trips
    /// them.
    pub error_markers: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            configuration: "Debug".to_string(),
            timeout: Duration::from_secs(300),
            error_markers: vec![
                ": error ".to_string(),
                "error CS".to_string(),
                "Build FAILED".to_string(),
            ],
        }
    }
}

/// Result of building one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutcome {
    /// Module that was built
    pub module: String,
    /// Exit code zero and no error markers in the output
    pub success: bool,
    /// True when a *dependent* module failed: it built cleanly before the
    /// change, so the change broke a consumer
    pub is_breaking_change: bool,
    /// True when the build was killed by the timeout
    pub timed_out: bool,
    /// Combined captured output
    pub output: String,
    /// Short failure description, when the build failed
    pub error_summary: Option<String>,
}

/// Aggregate of one build run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    /// Per-module outcomes in build order
    pub outcomes: Vec<BuildOutcome>,
    /// True when every module built cleanly
    pub success: bool,
    /// True when any dependent module failed
    pub breaking_change_detected: bool,
}

/// Compute the build set and order: touched modules in discovery order,
/// then their direct dependents in graph order, de-duplicated.
#[must_use]
pub fn compute_build_order<'a>(
    modules: &'a [ModuleDescriptor],
    touched: &[&str],
) -> Vec<&'a ModuleDescriptor> {
    fn push_unique<'m>(module: &'m ModuleDescriptor, order: &mut Vec<&'m ModuleDescriptor>) {
        if !order
            .iter()
            .any(|o| o.name.eq_ignore_ascii_case(&module.name))
        {
            order.push(module);
        }
    }

    let mut order: Vec<&ModuleDescriptor> = Vec::new();
    for name in touched {
        if let Some(module) = modules
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
        {
            push_unique(module, &mut order);
        }
    }

    // One level only: modules that directly reference a touched module.
    let touched_count = order.len();
    for module in modules {
        let depends_on_touched = order[..touched_count]
            .iter()
            .any(|t| module.depends_on(&t.name));
        if depends_on_touched {
            push_unique(module, &mut order);
        }
    }
    order
}

/// Invokes the external build tool per module, in dependency-aware order.
pub struct BuildOrchestrator {
    locator: ToolLocator,
    config: BuildConfig,
    invoker: Arc<dyn ToolInvoker>,
}

impl BuildOrchestrator {
    /// Create an orchestrator with an injected tool locator.
    #[must_use]
    pub fn new(locator: ToolLocator, config: BuildConfig) -> Self {
        Self {
            locator,
            config,
            invoker: Arc::new(SubprocessInvoker),
        }
    }

    /// Substitute the tool invoker.
    #[must_use]
    pub fn with_invoker(mut self, invoker: Arc<dyn ToolInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    /// Build the touched modules and their direct dependents.
    ///
    /// Individual build failures never stop the run; each module gets an
    /// outcome and the report aggregates them. A failing dependent flips
    /// the breaking-change flag.
    ///
    /// # Errors
    /// - [`VerifyError::ToolNotFound`] when the build tool cannot be located
    /// - [`VerifyError::MissingModulePath`] when a module in the build set
    ///   has no manifest on disk (checked up front; nothing partial is
    ///   attempted)
    /// - [`VerifyError::Cancelled`] between modules
    pub async fn build_affected(
        &self,
        modules: &[ModuleDescriptor],
        touched: &[&str],
        cancel: &CancelToken,
    ) -> Result<BuildReport, VerifyError> {
        let tool = self.locator.locate().await?;
        let order = compute_build_order(modules, touched);

        for module in &order {
            if !module.manifest_path.is_file() {
                return Err(VerifyError::MissingModulePath {
                    module: module.name.clone(),
                    path: module.manifest_path.clone(),
                });
            }
        }

        let mut report = BuildReport {
            outcomes: Vec::with_capacity(order.len()),
            success: true,
            breaking_change_detected: false,
        };

        for module in order {
            if cancel.is_cancelled() {
                return Err(VerifyError::Cancelled);
            }
            let is_dependent = !touched
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&module.name));
            let outcome = self.build_one(&tool, module, is_dependent).await;
            if !outcome.success {
                report.success = false;
                if outcome.is_breaking_change {
                    report.breaking_change_detected = true;
                }
            }
            report.outcomes.push(outcome);
        }
        Ok(report)
    }

    async fn build_one(
        &self,
        tool: &std::path::Path,
        module: &ModuleDescriptor,
        is_dependent: bool,
    ) -> BuildOutcome {
        tracing::info!(module = %module.name, dependent = is_dependent, "building module");
        let args = vec![
            module.manifest_path.display().to_string(),
            "--configuration".to_string(),
            self.config.configuration.clone(),
        ];

        let result = self
            .invoker
            .invoke(tool, &args, Some(module.root_folder()), self.config.timeout)
            .await;

        let (output, timed_out, exit_code) = match result {
            Ok(out) => (out.combined(), out.timed_out, out.exit_code),
            Err(e) => (format!("spawn failed: {e}"), false, -1),
        };

        let marker_hit = self.first_marker_line(&output);
        let success = !timed_out && exit_code == 0 && marker_hit.is_none();
        let error_summary = if success {
            None
        } else if timed_out {
            Some(format!(
                "build timed out after {}s",
                self.config.timeout.as_secs()
            ))
        } else {
            marker_hit.or_else(|| Some(format!("build tool exited with code {exit_code}")))
        };

        if !success {
            tracing::error!(
                module = %module.name,
                dependent = is_dependent,
                summary = error_summary.as_deref().unwrap_or(""),
                "module build failed"
            );
        }
        BuildOutcome {
            module: module.name.clone(),
            success,
            is_breaking_change: is_dependent && !success,
            timed_out,
            output,
            error_summary,
        }
    }

    /// First output line containing a known error marker.
    fn first_marker_line(&self, output: &str) -> Option<String> {
        let lowered_markers: Vec<String> = self
            .config
            .error_markers
            .iter()
            .map(|m| m.to_ascii_lowercase())
            .collect();
        output.lines().find_map(|line| {
            let lowered = line.to_ascii_lowercase();
            lowered_markers
                .iter()
                .any(|m| lowered.contains(m))
                .then(|| line.trim().to_string())
        })
    }
}
