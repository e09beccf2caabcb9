//! # kruize-conformance
//!
//! A black-box conformance harness for the Kruize resource-optimization
//! service, focused on the `createExperiment` REST API. Cases come from a
//! CSV matrix or from built-in scenario flows; every case renders a JSON
//! experiment document, runs a delete → create → validate → delete
//! lifecycle against the target cluster, and lands in a text, JSON or
//! JUnit report.
//!
//! ## Features
//!
//! - **Field matrix**: 42 generated negative cases (blank/null/absent for
//!   every experiment field), or your own CSV with the same columns
//! - **Scenario flows**: sanity create, duplicate names, mutually exclusive
//!   pairs, invalid content type, the mandatory-field table
//! - **Guaranteed cleanup**: every case pre-cleans and post-cleans, so a
//!   failing run never leaks experiments into the next one
//! - **Pluggable service**: the HTTP client and the in-memory stub both
//!   implement [`harness::client::ExperimentService`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kruize_conformance::harness::cli::{run_suite, RunConfig};
//! use kruize_conformance::harness::report::{write_report, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let run = RunConfig {
//!         base_url: Some("http://localhost:8080".to_string()),
//!         ..RunConfig::default()
//!     };
//!
//!     let report = run_suite(&run).await?;
//!     write_report(&report, OutputFormat::Text, &mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub mod harness;

// Re-export main API at crate root for easy access
pub use harness::{
    CaseField,
    CaseMatrix,
    CaseOutcome,
    CaseSource,
    // Fixtures
    ClusterContext,
    ClusterType,
    DocumentStore,
    // Trait and implementations
    ExperimentService,
    Expectation,
    FieldState,
    HarnessConfig,
    // Errors
    HarnessError,
    HarnessResult,
    HttpExperimentService,
    HttpResult,
    InMemoryExperimentService,
    // Lifecycle
    LifecycleRunner,
    // Reporting
    ReportBuilder,
    ScenarioSuite,
    ServiceStatus,
    // Core types
    TestCase,
    TestReport,
};
