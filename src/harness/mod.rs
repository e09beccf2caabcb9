//! Kruize createExperiment Conformance Harness
//!
//! A black-box conformance suite for the Kruize `createExperiment` REST API
//! that provides:
//! - CSV-driven negative matrix over every experiment field
//! - JSON document rendering with absent/null/blank substitution
//! - Lifecycle-orchestrated runs with guaranteed cleanup
//! - Named scenario flows (duplicates, conflicts, mandatory fields)
//! - Text, JSON and JUnit reports
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Conformance Run Flow                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  1. Resolve config & cluster context (URL, timeout, scratch)    │
//! │  2. Load matrix cases from CSV (or generate the default 42)     │
//! │  3. For each case:                                              │
//! │     a. Render the experiment document from its field states     │
//! │     b. Write it under the per-run scratch directory             │
//! │     c. Delete → create → validate → delete (lifecycle)          │
//! │  4. Run named scenarios (sanity, duplicate, conflicts, ...)     │
//! │  5. Generate report                                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! # Run the whole suite
//! kruize-test run --url http://localhost:8080
//!
//! # Run one scenario
//! kruize-test run --url http://localhost:8080 --scenario duplicate_name
//!
//! # Write the default matrix as an editable CSV
//! kruize-test init --output cases.csv
//!
//! # Check a CSV case file without touching a cluster
//! kruize-test validate cases.csv
//! ```

pub mod case;
pub mod cli;
pub mod client;
pub mod contract;
pub mod document;
pub mod error;
pub mod fixtures;
pub mod lifecycle;
pub mod report;
pub mod scenarios;
pub mod stub;
pub mod validator;

// Re-export main types for convenience
pub use case::{CaseField, CaseMatrix, CaseSource, FieldState, TestCase};
pub use client::{ExperimentService, HttpExperimentService, HttpResult};
pub use contract::ServiceStatus;
pub use document::DocumentStore;
pub use error::{HarnessError, HarnessResult};
pub use fixtures::{ClusterContext, ClusterType, HarnessConfig};
pub use lifecycle::{CaseOutcome, LifecyclePhase, LifecycleRunner};
pub use report::{OutputFormat, ReportBuilder, TestReport};
pub use scenarios::ScenarioSuite;
pub use stub::InMemoryExperimentService;
pub use validator::{CaseVerdict, Expectation};
