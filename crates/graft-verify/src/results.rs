//! Test result parsing
//!
//! The external test runner is asked to write a structured (JSON) results
//! file. That file is parsed preferentially; when it is absent or
//! malformed, the runner's text output is pattern-matched as a fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static TEXT_RESULT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(Passed|Failed|Skipped)[!:]?\s+([A-Za-z_][A-Za-z0-9_.]*)")
        .expect("text result pattern is valid")
});

/// Per-test status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
}

/// One test case result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    /// Fully qualified test name (`Namespace.Class.Method`)
    pub name: String,
    /// Outcome
    pub status: TestStatus,
    /// Duration in milliseconds, when reported
    pub duration_ms: u64,
    /// Failure message, when reported
    pub message: Option<String>,
}

/// Structured results file schema, as the external runner writes it.
/// Count fields are recomputed from the per-test list, so only `tests`
/// is read here.
#[derive(Debug, Deserialize)]
struct StructuredResults {
    tests: Vec<StructuredTest>,
}

#[derive(Debug, Deserialize)]
struct StructuredTest {
    name: String,
    outcome: String,
    duration_ms: Option<u64>,
    message: Option<String>,
}

/// Parse the structured results file.
///
/// Returns `None` when the file is absent or not parseable, which tells
/// the caller to fall back to text parsing.
#[must_use]
pub(crate) fn parse_results_file(path: &Path) -> Option<Vec<TestCaseResult>> {
    let text = std::fs::read_to_string(path).ok()?;
    let parsed: StructuredResults = serde_json::from_str(&text).ok()?;
    Some(
        parsed
            .tests
            .into_iter()
            .filter_map(|t| {
                let status = match t.outcome.to_ascii_lowercase().as_str() {
                    "passed" | "pass" => TestStatus::Passed,
                    "failed" | "fail" => TestStatus::Failed,
                    "skipped" | "skip" | "notexecuted" => TestStatus::Skipped,
                    _ => return None,
                };
                Some(TestCaseResult {
                    name: t.name,
                    status,
                    duration_ms: t.duration_ms.unwrap_or(0),
                    message: t.message,
                })
            })
            .collect(),
    )
}

/// Fallback: scrape per-test lines from the runner's text output.
#[must_use]
pub(crate) fn parse_text_output(output: &str) -> Vec<TestCaseResult> {
    TEXT_RESULT_LINE
        .captures_iter(output)
        .map(|caps| {
            let status = match &caps[1] {
                "Passed" => TestStatus::Passed,
                "Failed" => TestStatus::Failed,
                _ => TestStatus::Skipped,
            };
            TestCaseResult {
                name: caps[2].to_string(),
                status,
                duration_ms: 0,
                message: None,
            }
        })
        .collect()
}
