//! Run report generation
//!
//! Collects per-case outcomes into a run report and writes it in multiple
//! formats:
//! - Text (human-readable console output)
//! - JSON (machine-readable)
//! - JUnit XML (CI/CD integration)

use super::error::HarnessError;
use super::lifecycle::CaseOutcome;
use super::validator::CheckResult;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestReport {
    /// Harness name
    pub application: String,

    /// Run ID
    pub run_id: String,

    /// Start time (ISO 8601)
    pub start_time: String,

    /// End time (ISO 8601)
    pub end_time: String,

    /// Total duration in milliseconds
    pub duration_ms: u64,

    /// Summary statistics
    pub summary: RunSummary,

    /// Per-case results
    pub cases: Vec<CaseReport>,
}

/// Summary statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total cases executed
    pub total: usize,

    /// Cases that passed
    pub passed: usize,

    /// Cases with failed checks
    pub failed: usize,

    /// Cases that were skipped
    pub skipped: usize,

    /// Cases aborted by harness errors
    pub errors: usize,

    /// Total checks run
    pub total_checks: usize,

    /// Checks that passed
    pub passed_checks: usize,

    /// Checks that failed
    pub failed_checks: usize,
}

/// Report for a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    /// Case name
    pub name: String,

    /// Case status
    pub status: CaseStatus,

    /// Execution time in milliseconds
    pub duration_ms: u64,

    /// Error message when the case aborted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Check results
    pub checks: Vec<CheckReport>,
}

/// Case execution status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    Failed,
    Error,
    Skipped,
}

/// Report for a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// What was checked
    pub check: String,

    /// Whether it passed
    pub passed: bool,

    /// Expected value
    pub expected: String,

    /// Observed value
    pub actual: String,
}

impl From<&CheckResult> for CheckReport {
    fn from(result: &CheckResult) -> Self {
        CheckReport {
            check: result.check.clone(),
            passed: result.passed,
            expected: result.expected.clone(),
            actual: result.actual.clone(),
        }
    }
}

/// Accumulates case outcomes into a report
pub struct ReportBuilder {
    application: String,
    run_id: String,
    cases: Vec<CaseReport>,
    start_time: chrono::DateTime<chrono::Utc>,
}

impl ReportBuilder {
    pub fn new(application: &str, run_id: &str) -> Self {
        ReportBuilder {
            application: application.to_string(),
            run_id: run_id.to_string(),
            cases: Vec::new(),
            start_time: chrono::Utc::now(),
        }
    }

    /// Record a case that ran to a verdict
    pub fn add_outcome(&mut self, outcome: &CaseOutcome) {
        let status = if outcome.verdict.passed {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };
        self.cases.push(CaseReport {
            name: outcome.verdict.case.clone(),
            status,
            duration_ms: outcome.duration_ms,
            error: None,
            checks: outcome.verdict.checks.iter().map(CheckReport::from).collect(),
        });
    }

    /// Record a case aborted by a harness error
    pub fn add_error(&mut self, case_name: &str, error: &HarnessError) {
        self.cases.push(CaseReport {
            name: case_name.to_string(),
            status: CaseStatus::Error,
            duration_ms: 0,
            error: Some(error.to_string()),
            checks: Vec::new(),
        });
    }

    /// Record a case excluded by the scenario filter
    pub fn add_skipped(&mut self, case_name: &str) {
        self.cases.push(CaseReport {
            name: case_name.to_string(),
            status: CaseStatus::Skipped,
            duration_ms: 0,
            error: None,
            checks: Vec::new(),
        });
    }

    /// Number of cases recorded so far
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Generate the final report
    pub fn build(&self) -> TestReport {
        let end_time = chrono::Utc::now();
        let duration = end_time - self.start_time;

        TestReport {
            application: self.application.clone(),
            run_id: self.run_id.clone(),
            start_time: self.start_time.to_rfc3339(),
            end_time: end_time.to_rfc3339(),
            duration_ms: duration.num_milliseconds().max(0) as u64,
            summary: self.summarize(),
            cases: self.cases.clone(),
        }
    }

    fn summarize(&self) -> RunSummary {
        let count = |status: CaseStatus| {
            self.cases.iter().filter(|c| c.status == status).count()
        };

        let total_checks: usize = self.cases.iter().map(|c| c.checks.len()).sum();
        let passed_checks = self
            .cases
            .iter()
            .flat_map(|c| &c.checks)
            .filter(|c| c.passed)
            .count();

        RunSummary {
            total: self.cases.len(),
            passed: count(CaseStatus::Passed),
            failed: count(CaseStatus::Failed),
            skipped: count(CaseStatus::Skipped),
            errors: count(CaseStatus::Error),
            total_checks,
            passed_checks,
            failed_checks: total_checks - passed_checks,
        }
    }
}

impl TestReport {
    /// Whether the run should fail the process
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0 || self.summary.errors > 0
    }
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
    Junit,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "junit" | "xml" => Ok(OutputFormat::Junit),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Write report to output
pub fn write_report(
    report: &TestReport,
    format: OutputFormat,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => write_text_report(report, writer),
        OutputFormat::Json => write_json_report(report, writer),
        OutputFormat::Junit => write_junit_report(report, writer),
    }
}

/// Write text format report
fn write_text_report(report: &TestReport, writer: &mut dyn Write) -> std::io::Result<()> {
    writeln!(writer, "\n🧪 Kruize Conformance Report")?;
    writeln!(writer, "════════════════════════════════════════")?;
    writeln!(writer, "Application: {}", report.application)?;
    writeln!(writer, "Run ID: {}", report.run_id)?;
    writeln!(writer, "Duration: {}ms", report.duration_ms)?;
    writeln!(writer)?;

    writeln!(writer, "📊 Summary")?;
    writeln!(writer, "─────────────────────────────────────────")?;
    writeln!(
        writer,
        "Cases: {} total, {} passed, {} failed, {} errors, {} skipped",
        report.summary.total,
        report.summary.passed,
        report.summary.failed,
        report.summary.errors,
        report.summary.skipped
    )?;
    writeln!(
        writer,
        "Checks: {} total, {} passed, {} failed",
        report.summary.total_checks,
        report.summary.passed_checks,
        report.summary.failed_checks
    )?;
    writeln!(writer)?;

    writeln!(writer, "📋 Case Results")?;
    writeln!(writer, "─────────────────────────────────────────")?;

    for case in &report.cases {
        let status_icon = match case.status {
            CaseStatus::Passed => "✅",
            CaseStatus::Failed => "❌",
            CaseStatus::Error => "💥",
            CaseStatus::Skipped => "⏭️",
        };

        writeln!(writer, "\n{} {} ({}ms)", status_icon, case.name, case.duration_ms)?;

        if let Some(ref error) = case.error {
            writeln!(writer, "   ERROR: {}", error)?;
        }

        for check in &case.checks {
            if check.passed {
                continue;
            }
            writeln!(writer, "   ✗ {}", check.check)?;
            writeln!(writer, "      Expected: {}", check.expected)?;
            writeln!(writer, "      Actual:   {}", check.actual)?;
        }
    }

    writeln!(writer)?;
    if report.has_failures() {
        writeln!(
            writer,
            "❌ {} failures, {} errors",
            report.summary.failed, report.summary.errors
        )?;
    } else {
        writeln!(writer, "🎉 ALL CASES PASSED!")?;
    }

    Ok(())
}

/// Write JSON format report
fn write_json_report(report: &TestReport, writer: &mut dyn Write) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    writeln!(writer, "{}", json)
}

/// Write JUnit XML format report
fn write_junit_report(report: &TestReport, writer: &mut dyn Write) -> std::io::Result<()> {
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        writer,
        r#"<testsuites name="{}" tests="{}" failures="{}" errors="{}" time="{:.3}">"#,
        escape_xml(&report.application),
        report.summary.total,
        report.summary.failed,
        report.summary.errors,
        report.duration_ms as f64 / 1000.0
    )?;

    writeln!(
        writer,
        r#"  <testsuite name="{}" tests="{}" failures="{}" errors="{}" skipped="{}" time="{:.3}">"#,
        escape_xml(&report.application),
        report.cases.len(),
        report.summary.failed,
        report.summary.errors,
        report.summary.skipped,
        report.duration_ms as f64 / 1000.0
    )?;

    for case in &report.cases {
        writeln!(
            writer,
            r#"    <testcase name="{}" classname="{}" time="{:.3}">"#,
            escape_xml(&case.name),
            escape_xml(&report.application),
            case.duration_ms as f64 / 1000.0
        )?;

        match case.status {
            CaseStatus::Failed => {
                for check in case.checks.iter().filter(|c| !c.passed) {
                    writeln!(
                        writer,
                        r#"      <failure type="{}" message="{}">"#,
                        escape_xml(&check.check),
                        escape_xml(&format!("{} mismatch", check.check))
                    )?;
                    writeln!(writer, "Expected: {}", escape_xml(&check.expected))?;
                    writeln!(writer, "Actual: {}", escape_xml(&check.actual))?;
                    writeln!(writer, "      </failure>")?;
                }
            }
            CaseStatus::Error => {
                if let Some(ref error) = case.error {
                    writeln!(
                        writer,
                        r#"      <error message="{}">{}</error>"#,
                        escape_xml(error),
                        escape_xml(error)
                    )?;
                }
            }
            CaseStatus::Skipped => {
                writeln!(writer, "      <skipped/>")?;
            }
            CaseStatus::Passed => {}
        }

        writeln!(writer, "    </testcase>")?;
    }

    writeln!(writer, "  </testsuite>")?;
    writeln!(writer, "</testsuites>")?;

    Ok(())
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
