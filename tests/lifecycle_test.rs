//! Tests for the case lifecycle orchestrator against the in-memory service
//!
//! Covers:
//! - Phase traces for accepted and rejected creates
//! - Pre-clean removal of leftover experiments
//! - The full negative matrix running green against the stub
//! - Duplicate-name double-create flow
//! - Whole-document rejection when a multi-experiment document repeats a name
//! - Cleanup on failed verdicts and on transport errors

use async_trait::async_trait;
use kruize_conformance::harness::case::{CaseField, CaseMatrix, FieldState, TestCase};
use kruize_conformance::harness::client::{ExperimentService, HttpResult};
use kruize_conformance::harness::contract::{
    duplicate_message, ServiceStatus, CREATE_SUCCESS_MESSAGE,
};
use kruize_conformance::harness::document::{self, DocumentStore};
use kruize_conformance::harness::error::{HarnessError, HarnessResult};
use kruize_conformance::harness::fixtures::baseline_value;
use kruize_conformance::harness::lifecycle::{LifecyclePhase, LifecycleRunner};
use kruize_conformance::harness::stub::InMemoryExperimentService;
use kruize_conformance::harness::validator::Expectation;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn store(scratch: &TempDir) -> DocumentStore {
    DocumentStore::new(scratch.path(), "lifecycle")
}

fn write_baseline(store: &DocumentStore, case: &str) -> PathBuf {
    store.write(case, &document::render_baseline()).unwrap()
}

#[tokio::test]
async fn test_accepted_case_walks_the_full_bracket() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = InMemoryExperimentService::new();
    let runner = LifecycleRunner::new(&service);

    let path = write_baseline(&store, "sanity");
    let expected = Expectation::created().with_message(CREATE_SUCCESS_MESSAGE);
    let outcome = runner.run_case("sanity", &path, &expected, false).await.unwrap();

    assert!(outcome.verdict.passed, "{:?}", outcome.verdict);
    assert_eq!(
        outcome.phases,
        vec![
            LifecyclePhase::Clean,
            LifecyclePhase::Creating,
            LifecyclePhase::Created,
            LifecyclePhase::Cleaning,
            LifecyclePhase::Clean,
        ]
    );
    assert_eq!(service.registered_count().await, 0, "cleanup must remove the experiment");
}

#[tokio::test]
async fn test_rejected_case_walks_the_rejection_branch() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = InMemoryExperimentService::new();
    let runner = LifecycleRunner::new(&service);

    let case = TestCase::single_field(
        "blank_experiment_name",
        400,
        CaseField::ExperimentName,
        FieldState::Blank,
    );
    let path = store.write(&case.name, &document::render_case(&case)).unwrap();
    let outcome = runner
        .run_case(&case.name, &path, &Expectation::from_case(&case), false)
        .await
        .unwrap();

    assert!(outcome.verdict.passed, "{:?}", outcome.verdict);
    assert_eq!(
        outcome.phases,
        vec![
            LifecyclePhase::Clean,
            LifecyclePhase::Creating,
            LifecyclePhase::Rejected,
            LifecyclePhase::Cleaning,
            LifecyclePhase::Clean,
        ]
    );
}

#[tokio::test]
async fn test_pre_clean_removes_leftover_experiment() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = InMemoryExperimentService::new();
    let runner = LifecycleRunner::new(&service);

    // A stale registration from some earlier, interrupted run
    let path = write_baseline(&store, "leftover");
    service.create(&path, false).await.unwrap();
    assert_eq!(service.registered_count().await, 1);

    let expected = Expectation::created().with_message(CREATE_SUCCESS_MESSAGE);
    let outcome = runner.run_case("leftover", &path, &expected, false).await.unwrap();

    assert!(
        outcome.verdict.passed,
        "stale experiment must not turn the create into a duplicate: {:?}",
        outcome.verdict
    );
    assert_eq!(service.registered_count().await, 0);
}

#[tokio::test]
async fn test_full_negative_matrix_passes_against_stub() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = InMemoryExperimentService::new();
    let runner = LifecycleRunner::new(&service);

    for case in CaseMatrix::default_negative() {
        let path = store.write(&case.name, &document::render_case(&case)).unwrap();
        let outcome = runner
            .run_case(&case.name, &path, &Expectation::from_case(&case), false)
            .await
            .unwrap();
        assert!(
            outcome.verdict.passed,
            "{} failed: {:?}",
            case.name,
            outcome.verdict.failed_checks().collect::<Vec<_>>()
        );
    }

    assert_eq!(service.registered_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_flow_creates_twice_without_cleaning_between() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = InMemoryExperimentService::new();
    let runner = LifecycleRunner::new(&service);

    let path = write_baseline(&store, "duplicate");
    let name = baseline_value(CaseField::ExperimentName);
    let outcome = runner.run_duplicate("duplicate", &path, name).await.unwrap();

    assert!(outcome.verdict.passed, "{:?}", outcome.verdict);
    assert_eq!(
        outcome.phases,
        vec![
            LifecyclePhase::Clean,
            LifecyclePhase::Creating,
            LifecyclePhase::Created,
            LifecyclePhase::Creating,
            LifecyclePhase::Rejected,
            LifecyclePhase::Cleaning,
            LifecyclePhase::Clean,
        ]
    );

    let checks: Vec<&str> = outcome.verdict.checks.iter().map(|c| c.check.as_str()).collect();
    assert!(checks.contains(&"first_status_code"));
    assert!(checks.contains(&"second_message"));
    assert_eq!(service.registered_count().await, 0);
}

#[tokio::test]
async fn test_multi_document_repeating_a_name_is_rejected_whole() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = InMemoryExperimentService::new();

    // Two definitions, one experiment name between them
    let mut doc = document::render_multi(2);
    let repeated = doc[0]["experiment_name"].as_str().unwrap().to_string();
    doc[1]["experiment_name"] = serde_json::Value::String(repeated.clone());
    let path = store.write("repeated_name", &doc).unwrap();

    let result = service.create(&path, false).await.unwrap();

    assert_eq!(result.status_code, 400);
    assert_eq!(result.status, Some(ServiceStatus::Error));
    assert_eq!(result.message.as_deref(), Some(duplicate_message(&repeated).as_str()));
    assert_eq!(
        service.registered_count().await,
        0,
        "a rejected document must not register any of its definitions"
    );
}

#[tokio::test]
async fn test_failed_verdict_still_cleans_up() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = InMemoryExperimentService::new();
    let runner = LifecycleRunner::new(&service);

    // Wrong on purpose: the baseline document is accepted, not rejected
    let path = write_baseline(&store, "mismatch");
    let outcome = runner
        .run_case("mismatch", &path, &Expectation::rejected(), false)
        .await
        .unwrap();

    assert!(!outcome.verdict.passed);
    let failed: Vec<_> = outcome.verdict.failed_checks().collect();
    assert!(failed.iter().any(|c| c.check == "status_code" && c.actual == "201"));
    assert_eq!(service.registered_count().await, 0, "cleanup runs even when checks fail");
}

struct FailingCreate {
    deletes: AtomicUsize,
}

#[async_trait]
impl ExperimentService for FailingCreate {
    async fn create(&self, _document: &Path, _invalid_header: bool) -> HarnessResult<HttpResult> {
        Err(HarnessError::transport(
            "http://kruize.invalid/createExperiment",
            "connection refused",
        ))
    }

    async fn delete(&self, _document: &Path) -> HarnessResult<HttpResult> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResult {
            status_code: 400,
            status: Some(ServiceStatus::Error),
            message: Some("Experiment not found".to_string()),
            headers: HashMap::new(),
        })
    }
}

#[tokio::test]
async fn test_transport_error_propagates_after_cleanup() {
    let scratch = TempDir::new().unwrap();
    let store = store(&scratch);
    let service = FailingCreate {
        deletes: AtomicUsize::new(0),
    };
    let runner = LifecycleRunner::new(&service);

    let path = write_baseline(&store, "unreachable");
    let expected = Expectation::created();
    let err = runner
        .run_case("unreachable", &path, &expected, false)
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::Transport { .. }), "{:?}", err);
    assert_eq!(
        service.deletes.load(Ordering::SeqCst),
        2,
        "both the pre-clean and the closing delete must run"
    );
}
