//! Suite assembly behind the command line binary
//!
//! The binary parses flags and prints; everything that actually runs lives
//! here so integration tests can drive a full suite against the in-memory
//! stub service.

use super::case::{CaseMatrix, CaseSource, TestCase};
use super::client::{ExperimentService, HttpExperimentService};
use super::document::{self, DocumentStore};
use super::error::{HarnessError, HarnessResult};
use super::fixtures::{ClusterContext, HarnessConfig};
use super::lifecycle::LifecycleRunner;
use super::report::{ReportBuilder, TestReport};
use super::scenarios::{scenario_names, selected, ScenarioSuite, NEGATIVE_MATRIX_SCENARIO};
use super::validator::Expectation;
use std::path::{Path, PathBuf};

/// Name reported as the application in run reports
pub const APPLICATION_NAME: &str = "kruize-conformance";

/// Settings for one `run` invocation, CLI flags layered over the config file
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Optional YAML config file
    pub config_file: Option<PathBuf>,

    /// Kruize base URL override
    pub base_url: Option<String>,

    /// Cluster type override (minikube or openshift)
    pub cluster_type: Option<String>,

    /// Request timeout override in seconds
    pub timeout_secs: Option<u64>,

    /// CSV case file for the negative matrix; generated when absent
    pub cases_file: Option<PathBuf>,

    /// Run only the named scenario
    pub scenario_filter: Option<String>,
}

impl RunConfig {
    /// Load the config file (or defaults) and apply CLI overrides
    pub fn resolve(&self) -> HarnessResult<HarnessConfig> {
        let mut config = match &self.config_file {
            Some(path) => HarnessConfig::from_file(path)?,
            None => HarnessConfig::default(),
        };

        if let Some(ref url) = self.base_url {
            config.base_url = Some(url.clone());
        }
        if let Some(ref cluster) = self.cluster_type {
            config.cluster_type = cluster.parse().map_err(HarnessError::config)?;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }

        config.validate()?;
        Ok(config)
    }
}

fn check_filter(filter: Option<&str>) -> HarnessResult<()> {
    if let Some(name) = filter {
        let names = scenario_names();
        if !names.contains(&name) {
            return Err(HarnessError::config(format!(
                "Unknown scenario: {} (known: {})",
                name,
                names.join(", ")
            )));
        }
    }
    Ok(())
}

/// Short run identifier used in scratch paths and reports
pub fn new_run_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}

/// Run the full suite against a live Kruize endpoint
pub async fn run_suite(run: &RunConfig) -> HarnessResult<TestReport> {
    let config = run.resolve()?;
    let context = ClusterContext::resolve(&config)?;
    log::info!(
        "targeting {} cluster at {}",
        context.cluster_type,
        context.base_url
    );

    let service = HttpExperimentService::new(&context)?;
    run_suite_with(
        &service,
        &config,
        run.cases_file.as_deref(),
        run.scenario_filter.as_deref(),
    )
    .await
}

/// Run the full suite against any service implementation
pub async fn run_suite_with(
    service: &dyn ExperimentService,
    config: &HarnessConfig,
    cases_file: Option<&Path>,
    filter: Option<&str>,
) -> HarnessResult<TestReport> {
    check_filter(filter)?;

    let run_id = new_run_id();
    let store = DocumentStore::new(&config.scratch_dir, &run_id);
    let mut report = ReportBuilder::new(APPLICATION_NAME, &run_id);
    log::info!("run {} writing documents under {}", run_id, store.run_dir().display());

    if selected(filter, NEGATIVE_MATRIX_SCENARIO) {
        run_matrix(service, &store, cases_file, &mut report).await?;
    } else {
        report.add_skipped(NEGATIVE_MATRIX_SCENARIO);
    }

    let suite = ScenarioSuite::new(service, &store, config);
    suite.run_all(filter, &mut report).await;

    Ok(report.build())
}

/// Drive every matrix case through the lifecycle orchestrator
async fn run_matrix(
    service: &dyn ExperimentService,
    store: &DocumentStore,
    cases_file: Option<&Path>,
    report: &mut ReportBuilder,
) -> HarnessResult<()> {
    let runner = LifecycleRunner::new(service);

    match cases_file {
        Some(path) => {
            log::info!("loading matrix cases from {}", path.display());
            let source = CaseSource::new(path);
            for parsed in source.cases()? {
                match parsed {
                    Ok(case) => run_matrix_case(&runner, store, &case, report).await,
                    Err(e) => {
                        let name = match &e {
                            HarnessError::MalformedRow { line, .. } => {
                                format!("case_row_{}", line)
                            }
                            _ => "case_source".to_string(),
                        };
                        log::error!("[{}] {}", name, e);
                        report.add_error(&name, &e);
                    }
                }
            }
        }
        None => {
            for case in CaseMatrix::default_negative() {
                run_matrix_case(&runner, store, &case, report).await;
            }
        }
    }
    Ok(())
}

async fn run_matrix_case(
    runner: &LifecycleRunner<'_>,
    store: &DocumentStore,
    case: &TestCase,
    report: &mut ReportBuilder,
) {
    let doc = document::render_case(case);
    let expected = Expectation::from_case(case);

    let result = match store.write(&case.name, &doc) {
        Ok(path) => runner.run_case(&case.name, &path, &expected, false).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => report.add_outcome(&outcome),
        Err(e) => {
            log::error!("[{}] aborted: {}", case.name, e);
            report.add_error(&case.name, &e);
        }
    }
}

/// Write the default negative matrix as a CSV template
pub fn init_cases(output: &Path) -> HarnessResult<usize> {
    let cases = CaseMatrix::default_negative();
    CaseMatrix::write_csv(&cases, output)?;
    Ok(cases.len())
}

/// Result of validating a case file without running it
#[derive(Debug)]
pub struct CaseFileCheck {
    /// Cases that parsed cleanly
    pub valid: Vec<String>,

    /// One line per rejected row
    pub problems: Vec<String>,
}

impl CaseFileCheck {
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Parse every row of a case file and collect the problems
pub fn validate_cases(path: &Path) -> HarnessResult<CaseFileCheck> {
    let source = CaseSource::new(path);
    let mut check = CaseFileCheck {
        valid: Vec::new(),
        problems: Vec::new(),
    };

    for parsed in source.cases()? {
        match parsed {
            Ok(case) => check.valid.push(case.name),
            Err(e) => check.problems.push(e.to_string()),
        }
    }
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_filter() {
        assert!(check_filter(None).is_ok());
        assert!(check_filter(Some("negative_matrix")).is_ok());
        assert!(check_filter(Some("sanity_create")).is_ok());
        let err = check_filter(Some("bogus")).unwrap_err();
        assert!(err.to_string().contains("Unknown scenario"));
        assert!(err.to_string().contains("negative_matrix"));
    }

    #[test]
    fn test_new_run_id_short() {
        let id = new_run_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_run_id());
    }

    #[test]
    fn test_run_config_overrides() {
        let run = RunConfig {
            base_url: Some("http://kruize:8080".to_string()),
            cluster_type: Some("openshift".to_string()),
            timeout_secs: Some(5),
            ..RunConfig::default()
        };
        let config = run.resolve().unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://kruize:8080"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_run_config_rejects_bad_cluster() {
        let run = RunConfig {
            cluster_type: Some("bare-metal".to_string()),
            ..RunConfig::default()
        };
        assert!(run.resolve().is_err());
    }

    #[test]
    fn test_run_config_layers_flags_over_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("harness.yaml");
        std::fs::write(
            &path,
            "cluster_type: openshift\nbase_url: http://from-file:8080\ntimeout_secs: 45\n",
        )
        .unwrap();

        let run = RunConfig {
            config_file: Some(path),
            base_url: Some("http://from-flag:8080".to_string()),
            ..RunConfig::default()
        };
        let config = run.resolve().unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://from-flag:8080"));
        assert_eq!(config.timeout_secs, 45);
    }
}
