//! Expectation checks against observed results
//!
//! Compares an observed [`HttpResult`] with a case's expectation and
//! produces structured pass/fail results. A mismatch fails the case, not
//! the harness run; each failed check names the case and carries both the
//! expected and the actual value.

use super::case::TestCase;
use super::client::HttpResult;
use super::contract::{self, ServiceStatus};
use serde::{Deserialize, Serialize};

/// Expected outcome of a create call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    /// Expected HTTP status code
    pub status_code: u16,

    /// Expected `status` field
    pub status: ServiceStatus,

    /// Exact expected `message`, when a scenario pins it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Expected `message` prefix, when a scenario pins only the prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_prefix: Option<String>,
}

impl Expectation {
    /// Experiment registered: 201 with SUCCESS
    pub fn created() -> Self {
        Expectation {
            status_code: contract::SUCCESS_STATUS_CODE,
            status: ServiceStatus::Success,
            message: None,
            message_prefix: None,
        }
    }

    /// Request rejected: 400 with ERROR
    pub fn rejected() -> Self {
        Expectation {
            status_code: contract::ERROR_STATUS_CODE,
            status: ServiceStatus::Error,
            message: None,
            message_prefix: None,
        }
    }

    /// Rejection for a duplicate experiment name
    pub fn duplicate(experiment_name: &str) -> Self {
        Expectation::rejected().with_message(contract::duplicate_message(experiment_name))
    }

    /// Expectation for a tabular case: status code from the row, status
    /// derived from the code family, no message pinned
    pub fn from_case(case: &TestCase) -> Self {
        Expectation {
            status_code: case.expected_status_code,
            status: case.expected_status,
            message: None,
            message_prefix: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_message_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.message_prefix = Some(prefix.into());
        self
    }
}

/// One expectation check with expected and actual values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// What was checked
    pub check: String,

    /// Whether the check passed
    pub passed: bool,

    /// Expected value
    pub expected: String,

    /// Observed value
    pub actual: String,
}

impl CheckResult {
    fn compare(check: &str, expected: impl ToString, actual: impl ToString) -> Self {
        let expected = expected.to_string();
        let actual = actual.to_string();
        CheckResult {
            check: check.to_string(),
            passed: expected == actual,
            expected,
            actual,
        }
    }
}

/// Verdict for one case, carrying every check that ran
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseVerdict {
    /// Case name
    pub case: String,

    /// Whether every check passed
    pub passed: bool,

    /// Individual check results
    pub checks: Vec<CheckResult>,
}

impl CaseVerdict {
    /// Prefix every check name with a stage label, for flows that issue
    /// more than one call per case
    pub fn staged(mut self, stage: &str) -> Self {
        for check in &mut self.checks {
            check.check = format!("{}_{}", stage, check.check);
        }
        self
    }

    /// Merge verdicts for one case into a single verdict
    pub fn merge(case: impl Into<String>, verdicts: Vec<CaseVerdict>) -> Self {
        let passed = verdicts.iter().all(|v| v.passed);
        let checks = verdicts.into_iter().flat_map(|v| v.checks).collect();
        CaseVerdict {
            case: case.into(),
            passed,
            checks,
        }
    }

    /// Checks that did not pass
    pub fn failed_checks(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Missing-value spelling in check output
const NONE_VALUE: &str = "(none)";

/// Check an observed result against an expectation
pub fn validate(case: &str, expected: &Expectation, observed: &HttpResult) -> CaseVerdict {
    let mut checks = Vec::new();

    checks.push(CheckResult::compare(
        "status_code",
        expected.status_code,
        observed.status_code,
    ));

    checks.push(CheckResult::compare(
        "status",
        expected.status.as_str(),
        observed
            .status
            .map(|s| s.as_str())
            .unwrap_or(NONE_VALUE),
    ));

    if let Some(ref message) = expected.message {
        checks.push(CheckResult::compare(
            "message",
            message,
            observed.message.as_deref().unwrap_or(NONE_VALUE),
        ));
    }

    if let Some(ref prefix) = expected.message_prefix {
        let actual = observed.message.as_deref().unwrap_or(NONE_VALUE);
        checks.push(CheckResult {
            check: "message_prefix".to_string(),
            passed: actual.starts_with(prefix),
            expected: format!("{}...", prefix),
            actual: actual.to_string(),
        });
    }

    let passed = checks.iter().all(|c| c.passed);
    CaseVerdict {
        case: case.to_string(),
        passed,
        checks,
    }
}
