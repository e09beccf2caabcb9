//! Named scenario flows beyond the negative matrix
//!
//! Each scenario drives the lifecycle orchestrator against the service under
//! test and records one `CaseReport` per sub-case. Scenario names are stable
//! so a `--scenario` filter can select a single flow.

use super::case::CaseField;
use super::client::ExperimentService;
use super::contract::{ServiceStatus, CREATE_SUCCESS_MESSAGE, MANDATORY_MISSING_PREFIX};
use super::document::{self, ConflictPair, DocumentStore};
use super::error::{HarnessError, HarnessResult};
use super::fixtures::{baseline_value, HarnessConfig};
use super::lifecycle::{CaseOutcome, LifecyclePhase, LifecycleRunner};
use super::report::ReportBuilder;
use super::validator::{validate, Expectation};
use std::time::Instant;

/// Scenario slug for the CSV-driven negative matrix
///
/// The matrix runs from the case source rather than from this suite, but it
/// shares the filter namespace with the named scenarios below.
pub const NEGATIVE_MATRIX_SCENARIO: &str = "negative_matrix";

/// Named scenarios in execution order
const NAMES: [&str; 9] = [
    "sanity_create",
    "duplicate_name",
    "multiple_experiments_one_document",
    "many_documents_distinct_names",
    "shared_deployment_namespace",
    "profile_and_slo_conflict",
    "deployment_and_selector_conflict",
    "invalid_content_type",
    "mandatory_fields",
];

/// Mandatory-field scenario table: field key and the outcome the service
/// reports once that key (plus the usual slo/selector trim) is removed.
///
/// `selector` and `slo` rows succeed because the full document still carries
/// the other member of each exclusive pair after the drop.
const MANDATORY_FIELD_ROWS: [(&str, ServiceStatus); 9] = [
    ("experiment_name", ServiceStatus::Error),
    ("deployment_name", ServiceStatus::Error),
    ("selector", ServiceStatus::Success),
    ("namespace", ServiceStatus::Error),
    ("performanceProfile", ServiceStatus::Error),
    ("slo", ServiceStatus::Success),
    ("recommendation_settings", ServiceStatus::Error),
    ("deployment_name_selector", ServiceStatus::Error),
    ("performanceProfile_slo", ServiceStatus::Error),
];

/// Every name accepted by a scenario filter
pub fn scenario_names() -> Vec<&'static str> {
    let mut names = vec![NEGATIVE_MATRIX_SCENARIO];
    names.extend(NAMES);
    names
}

/// Whether `name` is selected by an optional filter
pub fn selected(filter: Option<&str>, name: &str) -> bool {
    filter.map(|f| f == name).unwrap_or(true)
}

/// Document keys removed for one mandatory-field row
///
/// The combined rows drop both members of the pair plus the remaining
/// counterpart field, matching how the service is probed for each gap.
pub fn mandatory_drop_keys(field: &str) -> HarnessResult<Vec<&'static str>> {
    match field {
        "performanceProfile_slo" => Ok(vec!["performanceProfile", "slo", "deployment_name"]),
        "deployment_name_selector" => Ok(vec!["deployment_name", "selector", "slo"]),
        "experiment_name" => Ok(vec!["slo", "selector", "experiment_name"]),
        "deployment_name" => Ok(vec!["slo", "selector", "deployment_name"]),
        "selector" => Ok(vec!["slo", "selector"]),
        "namespace" => Ok(vec!["slo", "selector", "namespace"]),
        "performanceProfile" => Ok(vec!["slo", "selector", "performanceProfile"]),
        "slo" => Ok(vec!["slo", "selector"]),
        "recommendation_settings" => Ok(vec!["slo", "selector", "recommendation_settings"]),
        other => Err(HarnessError::config(format!(
            "Unknown mandatory field: {}",
            other
        ))),
    }
}

/// Runs the named scenarios against one service
pub struct ScenarioSuite<'a> {
    service: &'a dyn ExperimentService,
    store: &'a DocumentStore,
    many_documents: usize,
    shared_deployment: usize,
    multi_definitions: usize,
}

impl<'a> ScenarioSuite<'a> {
    pub fn new(
        service: &'a dyn ExperimentService,
        store: &'a DocumentStore,
        config: &HarnessConfig,
    ) -> Self {
        ScenarioSuite {
            service,
            store,
            many_documents: config.many_documents,
            shared_deployment: config.shared_deployment,
            multi_definitions: config.multi_definitions,
        }
    }

    /// Run every scenario the filter selects; the rest are reported skipped.
    ///
    /// Failures never abort the suite: harness errors become `error` case
    /// reports and the next scenario still runs.
    pub async fn run_all(&self, filter: Option<&str>, report: &mut ReportBuilder) {
        for name in NAMES {
            if !selected(filter, name) {
                report.add_skipped(name);
                continue;
            }
            log::info!("scenario {} starting", name);
            let result = match name {
                "sanity_create" => self.sanity_create(report).await,
                "duplicate_name" => self.duplicate_name(report).await,
                "multiple_experiments_one_document" => {
                    self.multiple_experiments_one_document(report).await
                }
                "many_documents_distinct_names" => {
                    self.many_documents_distinct_names(report).await
                }
                "shared_deployment_namespace" => self.shared_deployment_namespace(report).await,
                "profile_and_slo_conflict" => {
                    self.conflict(report, "profile_and_slo_conflict", ConflictPair::ProfileAndSlo)
                        .await
                }
                "deployment_and_selector_conflict" => {
                    self.conflict(
                        report,
                        "deployment_and_selector_conflict",
                        ConflictPair::DeploymentAndSelector,
                    )
                    .await
                }
                "invalid_content_type" => self.invalid_content_type(report).await,
                "mandatory_fields" => self.mandatory_fields(report).await,
                _ => unreachable!("scenario dispatch out of sync with NAMES"),
            };
            if let Err(e) = result {
                log::error!("scenario {} aborted: {}", name, e);
                report.add_error(name, &e);
            }
        }
    }

    fn record(&self, report: &mut ReportBuilder, case: &str, result: HarnessResult<CaseOutcome>) {
        match result {
            Ok(outcome) => report.add_outcome(&outcome),
            Err(e) => {
                log::error!("[{}] aborted: {}", case, e);
                report.add_error(case, &e);
            }
        }
    }

    /// Baseline document registers cleanly
    async fn sanity_create(&self, report: &mut ReportBuilder) -> HarnessResult<()> {
        let runner = LifecycleRunner::new(self.service);
        let path = self.store.write("sanity_create", &document::render_baseline())?;
        let expected = Expectation::created().with_message(CREATE_SUCCESS_MESSAGE);
        let result = runner
            .run_case("sanity_create", &path, &expected, false)
            .await;
        self.record(report, "sanity_create", result);
        Ok(())
    }

    /// Second create with the same name is rejected as a duplicate
    async fn duplicate_name(&self, report: &mut ReportBuilder) -> HarnessResult<()> {
        let runner = LifecycleRunner::new(self.service);
        let path = self.store.write("duplicate_name", &document::render_baseline())?;
        let name = baseline_value(CaseField::ExperimentName);
        let result = runner.run_duplicate("duplicate_name", &path, name).await;
        self.record(report, "duplicate_name", result);
        Ok(())
    }

    /// One document carrying several experiment definitions registers in a
    /// single call
    async fn multiple_experiments_one_document(
        &self,
        report: &mut ReportBuilder,
    ) -> HarnessResult<()> {
        let runner = LifecycleRunner::new(self.service);
        let doc = document::render_multi(self.multi_definitions);
        let path = self.store.write("multiple_experiments_one_document", &doc)?;
        let expected = Expectation::created().with_message(CREATE_SUCCESS_MESSAGE);
        let result = runner
            .run_case("multiple_experiments_one_document", &path, &expected, false)
            .await;
        self.record(report, "multiple_experiments_one_document", result);
        Ok(())
    }

    /// Distinct documents with index-suffixed names each run a full lifecycle
    async fn many_documents_distinct_names(
        &self,
        report: &mut ReportBuilder,
    ) -> HarnessResult<()> {
        let runner = LifecycleRunner::new(self.service);
        for index in 0..self.many_documents {
            let case = format!("many_documents_{}", index);
            let doc = document::render_indexed(index, true);
            let path = self.store.write(&case, &doc)?;
            let expected = Expectation::created().with_message(CREATE_SUCCESS_MESSAGE);
            let result = runner.run_case(&case, &path, &expected, false).await;
            self.record(report, &case, result);
        }
        Ok(())
    }

    /// Experiments differing only in name coexist on one deployment and
    /// namespace; cleanup runs after all creates so they actually coexist.
    async fn shared_deployment_namespace(&self, report: &mut ReportBuilder) -> HarnessResult<()> {
        let expected = Expectation::created().with_message(CREATE_SUCCESS_MESSAGE);
        let mut outcomes: Vec<(String, CaseOutcome)> = Vec::new();
        let mut paths = Vec::new();

        for index in 0..self.shared_deployment {
            let case = format!("shared_deployment_{}", index);
            let doc = document::render_indexed(index, false);
            let path = match self.store.write(&case, &doc) {
                Ok(p) => p,
                Err(e) => {
                    self.record(report, &case, Err(e));
                    continue;
                }
            };

            let started = Instant::now();
            let mut phases = vec![LifecyclePhase::Clean];
            if let Err(e) = self.service.delete(&path).await {
                self.record(report, &case, Err(e));
                continue;
            }
            phases.push(LifecyclePhase::Creating);
            paths.push(path.clone());

            match self.service.create(&path, false).await {
                Ok(observed) => {
                    phases.push(if observed.is_success() {
                        LifecyclePhase::Created
                    } else {
                        LifecyclePhase::Rejected
                    });
                    let verdict = validate(&case, &expected, &observed);
                    outcomes.push((
                        case,
                        CaseOutcome {
                            verdict,
                            phases,
                            duration_ms: started.elapsed().as_millis() as u64,
                        },
                    ));
                }
                Err(e) => self.record(report, &case, Err(e)),
            }
        }

        for path in &paths {
            if let Err(e) = self.service.delete(path).await {
                log::warn!("shared deployment cleanup failed for {}: {}", path.display(), e);
            }
        }

        for (case, mut outcome) in outcomes {
            outcome.phases.push(LifecyclePhase::Cleaning);
            outcome.phases.push(LifecyclePhase::Clean);
            self.record(report, &case, Ok(outcome));
        }
        Ok(())
    }

    /// Both members of a mutually exclusive pair present is rejected
    async fn conflict(
        &self,
        report: &mut ReportBuilder,
        case: &str,
        pair: ConflictPair,
    ) -> HarnessResult<()> {
        let runner = LifecycleRunner::new(self.service);
        let path = self.store.write(case, &document::render_conflict(pair))?;
        let result = runner
            .run_case(case, &path, &Expectation::rejected(), false)
            .await;
        self.record(report, case, result);
        Ok(())
    }

    /// Valid payload posted as XML is rejected
    async fn invalid_content_type(&self, report: &mut ReportBuilder) -> HarnessResult<()> {
        let runner = LifecycleRunner::new(self.service);
        let path = self.store.write("invalid_content_type", &document::render_baseline())?;
        let result = runner
            .run_case("invalid_content_type", &path, &Expectation::rejected(), true)
            .await;
        self.record(report, "invalid_content_type", result);
        Ok(())
    }

    /// Nine-row mandatory field table against the full document
    async fn mandatory_fields(&self, report: &mut ReportBuilder) -> HarnessResult<()> {
        let runner = LifecycleRunner::new(self.service);
        for (field, expected_status) in MANDATORY_FIELD_ROWS {
            let case = format!("mandatory_{}", field);
            let mut doc = document::render_full();
            document::drop_fields(&mut doc, &mandatory_drop_keys(field)?);
            let path = self.store.write(&case, &doc)?;

            let expected = match expected_status {
                ServiceStatus::Success => {
                    Expectation::created().with_message(CREATE_SUCCESS_MESSAGE)
                }
                ServiceStatus::Error => {
                    Expectation::rejected().with_message_prefix(MANDATORY_MISSING_PREFIX)
                }
            };
            let result = runner.run_case(&case, &path, &expected, false).await;
            self.record(report, &case, result);
        }
        Ok(())
    }
}
