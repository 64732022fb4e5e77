//! End-to-end deployment and rollback against a real temp codebase.

use graft_artifact::GeneratedArtifact;
use graft_deploy::{CancelToken, DeployConfig, DeployError, DeploymentEngine};
use graft_test_utils::{new_file_artifact, test_class_source, TestCodebase};
use pretty_assertions::assert_eq;

fn engine(codebase: &TestCodebase) -> DeploymentEngine {
    DeploymentEngine::new(DeployConfig::new(codebase.root()))
}

#[tokio::test]
async fn deploys_new_file_and_amends_manifest() {
    let codebase = TestCodebase::new();
    let module = codebase.add_module("Acme.Billing", "src/Acme.Billing", "Acme.Billing", &[]);
    let modules = vec![module];

    let artifact = new_file_artifact(
        "generated/InvoiceService.cs",
        "Acme.Billing",
        "InvoiceService",
    );

    let record = engine(&codebase)
        .deploy(&[artifact], &modules, &CancelToken::new())
        .await
        .unwrap();

    assert!(record.success);
    assert_eq!(record.files.len(), 1);
    assert!(record.files[0].created);
    assert_eq!(record.files[0].module.as_deref(), Some("Acme.Billing"));

    let written = codebase.read_file("src/Acme.Billing/InvoiceService.cs");
    assert!(written.contains("class InvoiceService"));

    let manifest = codebase.read_file("src/Acme.Billing/Acme.Billing.manifest");
    assert!(manifest.contains("InvoiceService.cs"));
}

#[tokio::test]
async fn modification_merges_method_in_place() {
    let codebase = TestCodebase::new();
    let module = codebase.add_module("Acme.Billing", "src/Acme.Billing", "Acme.Billing", &[]);
    let modules = vec![module];

    codebase.write_file(
        "src/Acme.Billing/InvoiceService.cs",
        "namespace Acme.Billing;\n\n// keep me\npublic class InvoiceService\n{\n    public int Get()\n    {\n        return 1;\n    }\n}\n",
    );

    let artifact = GeneratedArtifact::new(
        "generated/InvoiceService.cs",
        "namespace Acme.Billing;\n\npublic class InvoiceService\n{\n    public int Get()\n    {\n        return 42;\n    }\n}\n",
    )
    .unwrap()
    .as_modification("Get");

    let record = engine(&codebase)
        .deploy(&[artifact], &modules, &CancelToken::new())
        .await
        .unwrap();

    assert!(record.success);
    assert!(!record.files[0].created);
    assert!(record.files[0].merged);
    assert!(!record.files[0].degraded_merge);

    let merged = codebase.read_file("src/Acme.Billing/InvoiceService.cs");
    assert!(merged.contains("return 42;"));
    assert!(merged.contains("// keep me"));
    assert!(!merged.contains("return 1;"));
}

#[tokio::test]
async fn deploying_same_artifact_twice_is_idempotent() {
    let codebase = TestCodebase::new();
    let module = codebase.add_module("Acme.Billing", "src/Acme.Billing", "Acme.Billing", &[]);
    let modules = vec![module];

    let artifact = new_file_artifact(
        "generated/InvoiceService.cs",
        "Acme.Billing",
        "InvoiceService",
    );

    let eng = engine(&codebase);
    let first = eng
        .deploy(std::slice::from_ref(&artifact), &modules, &CancelToken::new())
        .await
        .unwrap();
    let content_after_first = codebase.read_file("src/Acme.Billing/InvoiceService.cs");
    let manifest_after_first = codebase.read_file("src/Acme.Billing/Acme.Billing.manifest");

    let second = eng
        .deploy(&[artifact], &modules, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(
        first.files[0].target_path,
        second.files[0].target_path
    );
    assert!(!second.files[0].created);
    assert_eq!(
        codebase.read_file("src/Acme.Billing/InvoiceService.cs"),
        content_after_first
    );
    // Second run adds no duplicate manifest entries.
    assert_eq!(
        codebase.read_file("src/Acme.Billing/Acme.Billing.manifest"),
        manifest_after_first
    );
}

#[tokio::test]
async fn rollback_deletes_created_files_only() {
    let codebase = TestCodebase::new();
    let module = codebase.add_module("Acme.Billing", "src/Acme.Billing", "Acme.Billing", &[]);
    let modules = vec![module];

    codebase.write_file(
        "src/Acme.Billing/Existing.cs",
        "namespace Acme.Billing;\n\npublic class Existing\n{\n    public int Get()\n    {\n        return 1;\n    }\n}\n",
    );
    let manifest_before = codebase.read_file("src/Acme.Billing/Acme.Billing.manifest");

    let artifacts = vec![
        new_file_artifact("generated/NewOne.cs", "Acme.Billing", "NewOne"),
        new_file_artifact("generated/NewTwo.cs", "Acme.Billing.Sub", "NewTwo"),
        GeneratedArtifact::new(
            "generated/Existing.cs",
            "namespace Acme.Billing;\n\npublic class Existing\n{\n    public int Get()\n    {\n        return 99;\n    }\n}\n",
        )
        .unwrap()
        .as_modification("Get"),
    ];

    let eng = engine(&codebase);
    let record = eng
        .deploy(&artifacts, &modules, &CancelToken::new())
        .await
        .unwrap();
    assert!(record.success);
    assert_eq!(record.created_files().len(), 2);

    let rollback = eng.rollback(&record);
    assert!(rollback.is_clean(), "errors: {:?}", rollback.errors);
    assert_eq!(rollback.deleted_files.len(), 2);

    // Created files are gone, the emptied sub-directory is pruned.
    assert!(!codebase.root().join("src/Acme.Billing/NewOne.cs").exists());
    assert!(!codebase.root().join("src/Acme.Billing/Sub").exists());

    // The merged file keeps its post-merge content.
    let existing = codebase.read_file("src/Acme.Billing/Existing.cs");
    assert!(existing.contains("return 99;"));

    // Manifest is back to its pre-deployment entry list.
    assert_eq!(
        codebase.read_file("src/Acme.Billing/Acme.Billing.manifest"),
        manifest_before
    );
}

#[tokio::test]
async fn record_round_trips_through_json() {
    let codebase = TestCodebase::new();
    let module = codebase.add_module("Acme.Billing", "src/Acme.Billing", "Acme.Billing", &[]);
    let modules = vec![module];

    let artifact = new_file_artifact(
        "generated/InvoiceService.cs",
        "Acme.Billing",
        "InvoiceService",
    );

    let record = engine(&codebase)
        .deploy(&[artifact], &modules, &CancelToken::new())
        .await
        .unwrap();

    let json = serde_json::to_string(&record).unwrap();
    let parsed: graft_deploy::DeploymentRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}

#[tokio::test]
async fn cancelled_token_stops_before_any_work() {
    let codebase = TestCodebase::new();
    let module = codebase.add_module("Acme.Billing", "src/Acme.Billing", "Acme.Billing", &[]);
    let modules = vec![module];

    let cancel = CancelToken::new();
    cancel.cancel();

    let artifact = new_file_artifact(
        "generated/InvoiceService.cs",
        "Acme.Billing",
        "InvoiceService",
    );

    let err = engine(&codebase)
        .deploy(&[artifact], &modules, &cancel)
        .await
        .unwrap_err();
    match err {
        DeployError::Cancelled { record } => assert!(record.files.is_empty()),
        other => panic!("expected cancellation, got {other}"),
    }
    assert!(!codebase
        .root()
        .join("src/Acme.Billing/InvoiceService.cs")
        .exists());
}

#[tokio::test]
async fn missing_codebase_root_is_fatal() {
    let config = DeployConfig::new("/definitely/not/a/real/root");
    let engine = DeploymentEngine::new(config);
    let artifact = new_file_artifact("a/A.cs", "Acme.Billing", "A");
    let err = engine
        .deploy(&[artifact], &[], &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::MissingCodebaseRoot(_)));
}

#[tokio::test]
async fn test_artifact_gets_rebound_imports() {
    let codebase = TestCodebase::new();
    let module = codebase.add_module(
        "Acme.Billing.Tests",
        "tests/Acme.Billing.Tests",
        "Acme.Billing.Tests",
        &["Acme.Billing"],
    );
    let modules = vec![module];

    let artifact = GeneratedArtifact::new(
        "generated/InvoiceServiceTests.cs",
        test_class_source("Acme.Billing.Tests", "InvoiceServiceTests"),
    )
    .unwrap()
    .as_test(Some("Acme.Billing".into()), Some("InvoiceService".into()));

    let record = engine(&codebase)
        .deploy(&[artifact], &modules, &CancelToken::new())
        .await
        .unwrap();
    assert!(record.success);

    let written = codebase.read_file("tests/Acme.Billing.Tests/InvoiceServiceTests.cs");
    assert!(written.contains("using Acme.Billing;"));
    assert!(!written.contains("Placeholder.Target"));
}
