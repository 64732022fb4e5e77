//! Verification runner against fake external test tools.
//!
//! The fake tool receives `<binary> --filter <units> --results <path>`:
//! `$1` is the test binary, `$3` the unit filter, `$5` the results path.

#![cfg(unix)]

use graft_deploy::{CancelToken, DeploymentRecord, FileCopyOutcome};
use graft_layout::{ModuleDescriptor, ResolutionConfidence};
use graft_test_utils::{fake_tool, TestCodebase};
use graft_verify::{TestRunConfig, ToolLocator, VerificationRunner, VerifyError};
use pretty_assertions::assert_eq;
use std::path::Path;

/// One test module with a deployed test class and a (placeholder) test
/// binary at the location the default config expects.
fn test_module(
    codebase: &TestCodebase,
    name: &str,
    namespace: &str,
    class: &str,
) -> (ModuleDescriptor, DeploymentRecord) {
    let rel_dir = format!("tests/{name}");
    let mut module = codebase.add_module(name, &rel_dir, namespace, &[]);
    module.is_test_module = true;

    let source = format!(
        "namespace {namespace};\n\n[TestClass]\npublic class {class}\n{{\n    [TestMethod]\n    public void Passes() {{ }}\n}}\n"
    );
    let file = codebase.write_file(&format!("{rel_dir}/{class}.cs"), &source);
    codebase.write_file(&format!("{rel_dir}/bin/{name}.tests"), "");

    let mut record = DeploymentRecord::start();
    record.files.push(deployed_test_file(&file, name));
    (module, record)
}

fn deployed_test_file(path: &Path, module: &str) -> FileCopyOutcome {
    FileCopyOutcome {
        declared_path: path.display().to_string(),
        target_path: path.to_path_buf(),
        module: Some(module.to_string()),
        confidence: ResolutionConfidence::Exact,
        created: true,
        merged: false,
        degraded_merge: false,
        is_test_artifact: true,
        error: None,
    }
}

fn runner(tool: std::path::PathBuf, config: TestRunConfig) -> VerificationRunner {
    VerificationRunner::new(ToolLocator::new(vec![tool]), config)
}

#[tokio::test]
async fn runs_new_units_and_parses_structured_results() {
    let codebase = TestCodebase::new();
    let (module, record) =
        test_module(&codebase, "Billing.Tests", "Acme.Billing.Tests", "InvoiceTests");
    let tool = fake_tool(
        codebase.root(),
        "testtool",
        r#"printf '{"tests":[{"name":"%s.Passes","outcome":"passed","duration_ms":5},{"name":"%s.Validates","outcome":"passed","duration_ms":3}]}' "$3" "$3" > "$5""#,
    );

    let summary = runner(tool, TestRunConfig::default())
        .run(&record, &[module], &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 1);
    assert_eq!(
        summary.outcomes[0].units,
        vec!["Acme.Billing.Tests.InvoiceTests"]
    );
    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 2);
    assert!(summary.success);
    assert!(!summary.is_breaking_change);
}

#[tokio::test]
async fn existing_test_failure_is_a_breaking_change() {
    let codebase = TestCodebase::new();
    let (module, record) =
        test_module(&codebase, "Billing.Tests", "Acme.Billing.Tests", "InvoiceTests");
    // The new unit passes; a test outside it regressed.
    let tool = fake_tool(
        codebase.root(),
        "testtool",
        r#"printf '{"tests":[{"name":"%s.Passes","outcome":"passed","duration_ms":5},{"name":"Acme.Legacy.OldTests.Old","outcome":"failed","duration_ms":2,"message":"regressed"}]}' "$3" > "$5""#,
    );

    let summary = runner(tool, TestRunConfig::default())
        .run(&record, &[module], &CancelToken::new())
        .await
        .unwrap();

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.new_failures, 0);
    assert_eq!(outcome.existing_failures, 1);
    assert!(outcome.is_breaking_change);
    assert!(summary.is_breaking_change);
    assert!(!summary.success);
}

#[tokio::test]
async fn new_test_failure_is_not_a_breaking_change() {
    let codebase = TestCodebase::new();
    let (module, record) =
        test_module(&codebase, "Billing.Tests", "Acme.Billing.Tests", "InvoiceTests");
    let tool = fake_tool(
        codebase.root(),
        "testtool",
        r#"printf '{"tests":[{"name":"%s.Broken","outcome":"failed","duration_ms":2,"message":"assert"}]}' "$3" > "$5"; exit 1"#,
    );

    let summary = runner(tool, TestRunConfig::default())
        .run(&record, &[module], &CancelToken::new())
        .await
        .unwrap();

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.new_failures, 1);
    assert_eq!(outcome.existing_failures, 0);
    assert!(!outcome.is_breaking_change);
    assert!(!summary.is_breaking_change);
    assert!(!summary.success);
}

#[tokio::test]
async fn falls_back_to_text_output_when_results_file_is_missing() {
    let codebase = TestCodebase::new();
    let (module, record) =
        test_module(&codebase, "Billing.Tests", "Acme.Billing.Tests", "InvoiceTests");
    // No results file written; only per-test lines on stdout.
    let tool = fake_tool(
        codebase.root(),
        "testtool",
        r#"echo "Passed $3.Passes"; echo "Skipped $3.Later""#,
    );

    let summary = runner(tool, TestRunConfig::default())
        .run(&record, &[module], &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.success);
}

#[tokio::test]
async fn concurrency_stays_within_the_limit() {
    let codebase = TestCodebase::new();
    let mut modules = Vec::new();
    let mut record = DeploymentRecord::start();
    for i in 0..5 {
        let (module, mut one) = test_module(
            &codebase,
            &format!("Mod{i}.Tests"),
            &format!("Acme.Mod{i}.Tests"),
            "WidgetTests",
        );
        modules.push(module);
        record.files.append(&mut one.files);
    }
    let tool = fake_tool(
        codebase.root(),
        "testtool",
        r#"sleep 0.3; printf '{"tests":[{"name":"%s.Passes","outcome":"passed","duration_ms":1}]}' "$3" > "$5""#,
    );

    let summary = runner(tool, TestRunConfig::default())
        .run(&record, &modules, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 5);
    assert_eq!(summary.total, 5);
    assert!(summary.success);
    assert!(max_concurrent(&summary.outcomes) <= 2);
}

/// Maximum number of module runs in flight at any instant, from the
/// recorded start timestamps and durations.
fn max_concurrent(outcomes: &[graft_verify::TestOutcome]) -> usize {
    let mut events: Vec<(i64, i64)> = Vec::new();
    for outcome in outcomes {
        let start = outcome.started_at.timestamp_millis();
        let dur = i64::try_from(outcome.duration_ms).unwrap();
        events.push((start, 1));
        events.push((start + dur, -1));
    }
    events.sort();
    let mut current = 0i64;
    let mut peak = 0i64;
    for (_, delta) in events {
        current += delta;
        peak = peak.max(current);
    }
    usize::try_from(peak).unwrap()
}

#[tokio::test]
async fn missing_test_binary_fails_that_module_only() {
    let codebase = TestCodebase::new();
    let (alpha, record_a) =
        test_module(&codebase, "Alpha.Tests", "Acme.Alpha.Tests", "AlphaTests");
    let (beta, record_b) = test_module(&codebase, "Beta.Tests", "Acme.Beta.Tests", "BetaTests");
    std::fs::remove_file(beta.root_folder().join("bin/Beta.Tests.tests")).unwrap();

    let mut record = record_a;
    record.files.extend(record_b.files);

    let tool = fake_tool(
        codebase.root(),
        "testtool",
        r#"printf '{"tests":[{"name":"%s.Passes","outcome":"passed","duration_ms":1}]}' "$3" > "$5""#,
    );

    let summary = runner(tool, TestRunConfig::default())
        .run(&record, &[alpha, beta], &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    assert!(summary.outcomes[0].error.is_none());
    assert!(summary.outcomes[1].error.is_some());
    assert!(!summary.success);
}

#[tokio::test]
async fn cancelled_token_aborts_the_run() {
    let codebase = TestCodebase::new();
    let (module, record) =
        test_module(&codebase, "Billing.Tests", "Acme.Billing.Tests", "InvoiceTests");
    let tool = fake_tool(codebase.root(), "testtool", "exit 0");

    let cancel = CancelToken::new();
    cancel.cancel();
    let result = runner(tool, TestRunConfig::default())
        .run(&record, &[module], &cancel)
        .await;

    assert!(matches!(result, Err(VerifyError::Cancelled)));
}
