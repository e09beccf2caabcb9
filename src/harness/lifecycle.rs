//! Case lifecycle orchestration
//!
//! Brackets every case with guaranteed cleanup:
//!
//! ```text
//! CLEAN ──delete──▶ CREATING ──create──▶ CREATED | REJECTED
//!                                              │
//!                                   CLEANING ──delete──▶ CLEAN
//! ```
//!
//! The pre-clean delete removes any stale experiment left by an earlier
//! run; its response is logged, never asserted. The closing delete runs
//! regardless of the create outcome and regardless of the verdict, so the
//! service's experiment namespace is returned to its prior state even
//! when a case fails.

use super::client::ExperimentService;
use super::validator::{validate, CaseVerdict, Expectation};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Phase of the case lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Clean,
    Creating,
    Created,
    Rejected,
    Cleaning,
}

/// Result of one bracketed case
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    /// Validation verdict
    pub verdict: CaseVerdict,

    /// Phase trace in execution order
    pub phases: Vec<LifecyclePhase>,

    /// Wall-clock duration of the bracket
    pub duration_ms: u64,
}

/// Drives cases through the delete-create-assert-delete bracket
pub struct LifecycleRunner<'a> {
    service: &'a dyn ExperimentService,
}

impl<'a> LifecycleRunner<'a> {
    pub fn new(service: &'a dyn ExperimentService) -> Self {
        LifecycleRunner { service }
    }

    /// Run one case: pre-clean, create, validate, clean up
    ///
    /// Transport errors propagate after the cleanup delete has run.
    pub async fn run_case(
        &self,
        case_name: &str,
        document: &Path,
        expected: &Expectation,
        invalid_header: bool,
    ) -> super::error::HarnessResult<CaseOutcome> {
        let started = Instant::now();
        let mut phases = vec![LifecyclePhase::Clean];

        self.pre_clean(case_name, document).await?;
        phases.push(LifecyclePhase::Creating);

        let created = match self.service.create(document, invalid_header).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("[{}] create failed: {}", case_name, e);
                self.finish(case_name, document).await;
                return Err(e);
            }
        };

        phases.push(if created.is_success() {
            LifecyclePhase::Created
        } else {
            LifecyclePhase::Rejected
        });
        log::info!(
            "[{}] create returned {} ({})",
            case_name,
            created.status_code,
            created
                .status
                .map(|s| s.as_str())
                .unwrap_or("no status field")
        );

        let verdict = validate(case_name, expected, &created);

        phases.push(LifecyclePhase::Cleaning);
        self.finish(case_name, document).await;
        phases.push(LifecyclePhase::Clean);

        Ok(CaseOutcome {
            verdict,
            phases,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Duplicate-name flow: create twice with no intervening delete
    ///
    /// The first create must register; the second must be rejected with
    /// the canonical duplicate message for `experiment_name`.
    pub async fn run_duplicate(
        &self,
        case_name: &str,
        document: &Path,
        experiment_name: &str,
    ) -> super::error::HarnessResult<CaseOutcome> {
        let started = Instant::now();
        let mut phases = vec![LifecyclePhase::Clean];

        self.pre_clean(case_name, document).await?;
        phases.push(LifecyclePhase::Creating);

        let first = match self.service.create(document, false).await {
            Ok(result) => result,
            Err(e) => {
                self.finish(case_name, document).await;
                return Err(e);
            }
        };
        phases.push(if first.is_success() {
            LifecyclePhase::Created
        } else {
            LifecyclePhase::Rejected
        });

        phases.push(LifecyclePhase::Creating);
        let second = match self.service.create(document, false).await {
            Ok(result) => result,
            Err(e) => {
                self.finish(case_name, document).await;
                return Err(e);
            }
        };
        phases.push(if second.is_success() {
            LifecyclePhase::Created
        } else {
            LifecyclePhase::Rejected
        });

        let first_expected = Expectation::created()
            .with_message(super::contract::CREATE_SUCCESS_MESSAGE);
        let second_expected = Expectation::duplicate(experiment_name);

        let verdict = CaseVerdict::merge(
            case_name,
            vec![
                validate(case_name, &first_expected, &first).staged("first"),
                validate(case_name, &second_expected, &second).staged("second"),
            ],
        );

        phases.push(LifecyclePhase::Cleaning);
        self.finish(case_name, document).await;
        phases.push(LifecyclePhase::Clean);

        Ok(CaseOutcome {
            verdict,
            phases,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Best-effort delete before create; the response is informational
    async fn pre_clean(
        &self,
        case_name: &str,
        document: &Path,
    ) -> super::error::HarnessResult<()> {
        let result = self.service.delete(document).await?;
        log::debug!(
            "[{}] pre-clean delete returned {}",
            case_name,
            result.status_code
        );
        Ok(())
    }

    /// Closing delete; failures are logged, never propagated
    async fn finish(&self, case_name: &str, document: &Path) {
        match self.service.delete(document).await {
            Ok(result) => {
                log::debug!(
                    "[{}] cleanup delete returned {}",
                    case_name,
                    result.status_code
                );
            }
            Err(e) => {
                log::warn!("[{}] cleanup delete failed: {}", case_name, e);
            }
        }
    }
}
