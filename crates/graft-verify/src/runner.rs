//! Parallel verification runner
//!
//! Runs only the test units a deployment introduced, per test module,
//! under a bounded-concurrency policy: a semaphore admits at most N
//! concurrent test-runner subprocesses, results land in a thread-safe
//! append-only map, and aggregation happens after a join barrier.
//!
//! Failure classification: a failing test whose class is one of the newly
//! deployed units is a "new test failure"; any other failing test is an
//! "existing test failure" and raises the breaking-change flag, because
//! that test passed before the change.

use crate::error::VerifyError;
use crate::locate::ToolLocator;
use crate::results::{parse_results_file, parse_text_output, TestCaseResult, TestStatus};
use crate::subprocess::{SubprocessInvoker, ToolInvoker};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use graft_deploy::{CancelToken, DeploymentRecord};
use graft_layout::ModuleDescriptor;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use uuid::Uuid;

static CLASS_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*(?:(?:public|internal|sealed|partial|static)\s+)*class\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("class pattern is valid")
});

static NAMESPACE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*namespace\s+([A-Za-z_][A-Za-z0-9_.]*)").expect("namespace pattern is valid")
});

/// Patterns and conventions for recognising test units in source text.
#[derive(Debug, Clone)]
pub struct TestUnitPatterns {
    class_decl: Regex,
    namespace_decl: Regex,
    /// Attribute names that mark a class as a test class
    test_markers: Vec<String>,
    /// Class-name suffixes treated as tests by naming convention
    test_suffixes: Vec<String>,
}

impl Default for TestUnitPatterns {
    fn default() -> Self {
        Self {
            class_decl: CLASS_DECL.clone(),
            namespace_decl: NAMESPACE_DECL.clone(),
            test_markers: vec![
                "TestClass".to_string(),
                "TestFixture".to_string(),
                "Fact".to_string(),
            ],
            test_suffixes: vec!["Tests".to_string(), "Test".to_string()],
        }
    }
}

/// Extract fully qualified test-unit names (`Namespace.Class`) from one
/// deployed test file's text.
///
/// A class counts as a test unit when a test-marker attribute appears in
/// the lines just above its declaration, or when its name carries a test
/// suffix. Each class is paired with the nearest preceding namespace.
#[must_use]
pub fn extract_test_units(content: &str, patterns: &TestUnitPatterns) -> Vec<String> {
    let mut units = Vec::new();
    for class_match in patterns.class_decl.captures_iter(content) {
        let class_name = &class_match[1];
        let decl_start = class_match.get(0).map_or(0, |m| m.start());

        let marked = has_marker_above(content, decl_start, &patterns.test_markers);
        let suffixed = patterns
            .test_suffixes
            .iter()
            .any(|s| class_name.ends_with(s.as_str()));
        if !(marked || suffixed) {
            continue;
        }

        let namespace = patterns
            .namespace_decl
            .captures_iter(&content[..decl_start])
            .last()
            .map(|c| c[1].to_string());
        let unit = match namespace {
            Some(ns) => format!("{ns}.{class_name}"),
            None => class_name.to_string(),
        };
        if !units.contains(&unit) {
            units.push(unit);
        }
    }
    units
}

fn has_marker_above(content: &str, decl_start: usize, markers: &[String]) -> bool {
    // Scan the contiguous attribute/comment block right above the class.
    let mut lines: Vec<&str> = content[..decl_start].lines().collect();
    while let Some(line) = lines.pop() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('[') || trimmed.starts_with("//") {
            if markers.iter().any(|m| trimmed.contains(m.as_str())) {
                return true;
            }
            continue;
        }
        break;
    }
    false
}

/// Test run configuration.
#[derive(Debug, Clone)]
pub struct TestRunConfig {
    /// Maximum concurrent test-runner subprocesses
    pub max_concurrency: usize,
    /// Per-module test run timeout
    pub timeout: Duration,
    /// Where the compiled test binary sits relative to the module root;
    /// `{MODULE}` is replaced with the module name
    pub binary_relative_template: String,
    /// Directory for results files; defaults to the system temp dir
    pub results_dir: PathBuf,
}

impl Default for TestRunConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            timeout: Duration::from_secs(120),
            binary_relative_template: "bin/{MODULE}.tests".to_string(),
            results_dir: std::env::temp_dir(),
        }
    }
}

/// Outcome of one module's verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Test module name
    pub module: String,
    /// When the runner subprocess was started (after the semaphore slot
    /// was acquired)
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the module's run in milliseconds
    pub duration_ms: u64,
    /// Newly deployed test units this run was scoped to
    pub units: Vec<String>,
    /// Per-test results
    pub cases: Vec<TestCaseResult>,
    /// Failing tests belonging to the newly deployed units
    pub new_failures: usize,
    /// Failing tests outside the newly deployed units
    pub existing_failures: usize,
    /// True when any existing test failed
    pub is_breaking_change: bool,
    /// Runner-level failure (spawn error, timeout, missing binary)
    pub error: Option<String>,
}

impl TestOutcome {
    /// Count of passed tests.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Count of failed tests.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// Count of skipped tests.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }
}

/// Aggregate of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionSummary {
    /// Per-module outcomes, in module discovery order
    pub outcomes: Vec<TestOutcome>,
    /// Total tests executed
    pub total: usize,
    /// Total passed
    pub passed: usize,
    /// Total failed
    pub failed: usize,
    /// Total skipped
    pub skipped: usize,
    /// True when any module saw an existing test fail
    pub is_breaking_change: bool,
    /// True when every test passed and no runner-level failure occurred
    pub success: bool,
}

/// Runs newly deployed test units with bounded concurrency.
pub struct VerificationRunner {
    locator: ToolLocator,
    config: TestRunConfig,
    patterns: TestUnitPatterns,
    invoker: Arc<dyn ToolInvoker>,
}

impl VerificationRunner {
    /// Create a runner with an injected tool locator.
    #[must_use]
    pub fn new(locator: ToolLocator, config: TestRunConfig) -> Self {
        Self {
            locator,
            config,
            patterns: TestUnitPatterns::default(),
            invoker: Arc::new(SubprocessInvoker),
        }
    }

    /// Substitute the tool invoker.
    #[must_use]
    pub fn with_invoker(mut self, invoker: Arc<dyn ToolInvoker>) -> Self {
        self.invoker = invoker;
        self
    }

    /// Override the test-unit recognition patterns.
    #[must_use]
    pub fn with_patterns(mut self, patterns: TestUnitPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Verify the test modules touched by `record`.
    ///
    /// Test files are grouped by owning test module, the new test units
    /// are extracted from their deployed text, and one runner subprocess
    /// per module executes only those units. At most
    /// `config.max_concurrency` subprocesses run at a time.
    ///
    /// # Errors
    /// - [`VerifyError::ToolNotFound`] when the test runner tool is missing
    /// - [`VerifyError::Cancelled`] when the token fired; modules already
    ///   verified are not reported
    pub async fn run(
        &self,
        record: &DeploymentRecord,
        modules: &[ModuleDescriptor],
        cancel: &CancelToken,
    ) -> Result<TestExecutionSummary, VerifyError> {
        let tool = self.locator.locate().await?;
        let work = self.collect_work(record, modules).await;
        tracing::info!(
            modules = work.len(),
            limit = self.config.max_concurrency,
            "starting verification"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let results: Arc<DashMap<String, TestOutcome>> = Arc::new(DashMap::new());

        let tasks = work.iter().map(|(module, units)| {
            let semaphore = Arc::clone(&semaphore);
            let results = Arc::clone(&results);
            let tool = tool.clone();
            let cancel = cancel.clone();
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                if cancel.is_cancelled() {
                    return;
                }
                let outcome = self.run_module(&tool, module, units).await;
                results.insert(module.name.clone(), outcome);
            }
        });
        futures::future::join_all(tasks).await;

        if cancel.is_cancelled() {
            return Err(VerifyError::Cancelled);
        }

        // Aggregate in module discovery order, not completion order.
        let mut summary = TestExecutionSummary {
            outcomes: Vec::new(),
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            is_breaking_change: false,
            success: true,
        };
        for (module, _) in &work {
            if let Some((_, outcome)) = results.remove(&module.name) {
                summary.total += outcome.cases.len();
                summary.passed += outcome.passed();
                summary.failed += outcome.failed();
                summary.skipped += outcome.skipped();
                summary.is_breaking_change |= outcome.is_breaking_change;
                summary.success &= outcome.error.is_none() && outcome.failed() == 0;
                summary.outcomes.push(outcome);
            }
        }
        Ok(summary)
    }

    /// Group the record's test files by owning test module and extract
    /// the deployed test units from their on-disk text.
    async fn collect_work<'m>(
        &self,
        record: &DeploymentRecord,
        modules: &'m [ModuleDescriptor],
    ) -> Vec<(&'m ModuleDescriptor, Vec<String>)> {
        let mut work = Vec::new();
        for module in modules.iter().filter(|m| m.is_test_module) {
            let mut units: Vec<String> = Vec::new();
            for file in record.test_files() {
                if !file.target_path.starts_with(module.root_folder()) {
                    continue;
                }
                match tokio::fs::read_to_string(&file.target_path).await {
                    Ok(content) => {
                        for unit in extract_test_units(&content, &self.patterns) {
                            if !units.contains(&unit) {
                                units.push(unit);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            file = %file.target_path.display(),
                            error = %e,
                            "could not read deployed test file"
                        );
                    }
                }
            }
            if !units.is_empty() {
                work.push((module, units));
            }
        }
        work
    }

    async fn run_module(
        &self,
        tool: &Path,
        module: &ModuleDescriptor,
        units: &[String],
    ) -> TestOutcome {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut outcome = TestOutcome {
            module: module.name.clone(),
            started_at,
            duration_ms: 0,
            units: units.to_vec(),
            cases: Vec::new(),
            new_failures: 0,
            existing_failures: 0,
            is_breaking_change: false,
            error: None,
        };

        let binary = module.root_folder().join(
            self.config
                .binary_relative_template
                .replace("{MODULE}", &module.name),
        );
        if !binary.is_file() {
            outcome.error = Some(format!("test binary not found at '{}'", binary.display()));
            outcome.duration_ms = millis_since(clock);
            tracing::error!(module = %module.name, "test binary missing");
            return outcome;
        }

        let results_path = self
            .config
            .results_dir
            .join(format!("graft-results-{}.json", Uuid::new_v4()));
        let args = vec![
            binary.display().to_string(),
            "--filter".to_string(),
            units.join("|"),
            "--results".to_string(),
            results_path.display().to_string(),
        ];

        tracing::info!(module = %module.name, units = units.len(), "running test units");
        let run = self
            .invoker
            .invoke(tool, &args, Some(module.root_folder()), self.config.timeout)
            .await;

        match run {
            Ok(output) if output.timed_out => {
                outcome.error = Some(format!(
                    "test run timed out after {}s",
                    self.config.timeout.as_secs()
                ));
            }
            Ok(output) => {
                let cases = parse_results_file(&results_path)
                    .unwrap_or_else(|| parse_text_output(&output.combined()));
                self.classify(&mut outcome, cases, units);
                if output.exit_code != 0 && outcome.cases.iter().all(|c| c.status != TestStatus::Failed)
                {
                    // Non-zero exit with no failing test parsed: surface it.
                    outcome.error =
                        Some(format!("test runner exited with code {}", output.exit_code));
                }
            }
            Err(e) => {
                outcome.error = Some(format!("failed to start test runner: {e}"));
            }
        }
        let _ = std::fs::remove_file(&results_path);

        outcome.duration_ms = millis_since(clock);
        outcome
    }

    fn classify(&self, outcome: &mut TestOutcome, cases: Vec<TestCaseResult>, units: &[String]) {
        for case in &cases {
            if case.status != TestStatus::Failed {
                continue;
            }
            let is_new = units
                .iter()
                .any(|u| case.name == *u || case.name.starts_with(&format!("{u}.")));
            if is_new {
                outcome.new_failures += 1;
            } else {
                outcome.existing_failures += 1;
                outcome.is_breaking_change = true;
            }
        }
        outcome.cases = cases;
    }
}

#[allow(clippy::cast_possible_truncation)]
fn millis_since(clock: Instant) -> u64 {
    clock.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_marked_and_suffixed_classes_with_namespace() {
        let content = "namespace Acme.Billing.Tests;\n\n[TestClass]\npublic class InvoiceChecks\n{\n}\n\npublic class HelperTests\n{\n}\n\npublic class NotATestHelper\n{\n}\n";
        let units = extract_test_units(content, &TestUnitPatterns::default());
        assert_eq!(
            units,
            vec![
                "Acme.Billing.Tests.InvoiceChecks",
                "Acme.Billing.Tests.HelperTests"
            ]
        );
    }

    #[test]
    fn class_without_namespace_uses_bare_name() {
        let content = "[TestFixture]\nclass LooseTests { }\n";
        let units = extract_test_units(content, &TestUnitPatterns::default());
        assert_eq!(units, vec!["LooseTests"]);
    }

    #[test]
    fn marker_must_be_adjacent_to_class() {
        // The attribute belongs to the first class only.
        let content = "namespace N;\n[TestClass]\nclass First { }\n\nclass Plain { }\n";
        let units = extract_test_units(content, &TestUnitPatterns::default());
        assert_eq!(units, vec!["N.First"]);
    }

    #[test]
    fn classification_separates_new_from_existing() {
        let runner = VerificationRunner::new(
            ToolLocator::new(Vec::new()),
            TestRunConfig::default(),
        );
        let units = vec!["Ns.NewTests".to_string()];
        let cases = vec![
            TestCaseResult {
                name: "Ns.NewTests.Works".into(),
                status: TestStatus::Failed,
                duration_ms: 1,
                message: None,
            },
            TestCaseResult {
                name: "Ns.LegacyTests.Breaks".into(),
                status: TestStatus::Failed,
                duration_ms: 1,
                message: None,
            },
            TestCaseResult {
                name: "Ns.LegacyTests.StillFine".into(),
                status: TestStatus::Passed,
                duration_ms: 1,
                message: None,
            },
        ];
        let mut outcome = TestOutcome {
            module: "M".into(),
            started_at: Utc::now(),
            duration_ms: 0,
            units: units.clone(),
            cases: Vec::new(),
            new_failures: 0,
            existing_failures: 0,
            is_breaking_change: false,
            error: None,
        };
        runner.classify(&mut outcome, cases, &units);
        assert_eq!(outcome.new_failures, 1);
        assert_eq!(outcome.existing_failures, 1);
        assert!(outcome.is_breaking_change);
    }
}
