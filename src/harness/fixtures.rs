//! Run fixtures: harness configuration and cluster context
//!
//! Configuration is layered in order of precedence: built-in defaults,
//! then the optional YAML config file, then the `KRUIZE_URL` environment
//! variable, then explicit CLI flags. [`ClusterContext::resolve`] collapses
//! the layers into one immutable context for the session.

use super::case::CaseField;
use super::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable overriding the service base URL
pub const KRUIZE_URL_ENV: &str = "KRUIZE_URL";

/// Kind of cluster hosting the service under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterType {
    Minikube,
    Openshift,
}

impl std::str::FromStr for ClusterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minikube" => Ok(ClusterType::Minikube),
            "openshift" => Ok(ClusterType::Openshift),
            _ => Err(format!(
                "Unknown cluster type: {} (expected minikube or openshift)",
                s
            )),
        }
    }
}

impl std::fmt::Display for ClusterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterType::Minikube => write!(f, "minikube"),
            ClusterType::Openshift => write!(f, "openshift"),
        }
    }
}

/// Harness configuration, loadable from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Cluster hosting the service
    #[serde(default = "default_cluster_type")]
    pub cluster_type: ClusterType,

    /// Service base URL; `KRUIZE_URL` is consulted when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory for materialized documents; each run writes under its own
    /// run-id subdirectory
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Number of sequential documents in the distinct-names scenario
    #[serde(default = "default_many_documents")]
    pub many_documents: usize,

    /// Number of experiments sharing one deployment and namespace
    #[serde(default = "default_shared_deployment")]
    pub shared_deployment: usize,

    /// Number of definitions in the single multi-experiment document
    #[serde(default = "default_multi_definitions")]
    pub multi_definitions: usize,
}

fn default_cluster_type() -> ClusterType {
    ClusterType::Minikube
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_many_documents() -> usize {
    10
}

fn default_shared_deployment() -> usize {
    5
}

fn default_multi_definitions() -> usize {
    5
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            cluster_type: default_cluster_type(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
            scratch_dir: default_scratch_dir(),
            many_documents: default_many_documents(),
            shared_deployment: default_shared_deployment(),
            multi_definitions: default_multi_definitions(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_yaml(&content, path.display().to_string())
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str, file_name: String) -> HarnessResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| HarnessError::Config {
            message: format!("{}: {}", file_name, e),
        })
    }

    /// Check the configuration for values no run can work with
    pub fn validate(&self) -> HarnessResult<()> {
        if self.timeout_secs == 0 {
            return Err(HarnessError::config("timeout_secs must be at least 1"));
        }
        if self.many_documents == 0 || self.shared_deployment == 0 || self.multi_definitions == 0 {
            return Err(HarnessError::config("scenario counts must be at least 1"));
        }
        Ok(())
    }
}

/// Resolved, immutable context for one harness session
#[derive(Debug, Clone)]
pub struct ClusterContext {
    pub cluster_type: ClusterType,
    pub base_url: Url,
    pub timeout: Duration,
    pub scratch_dir: PathBuf,
}

impl ClusterContext {
    /// Collapse configuration layers into a session context
    ///
    /// The base URL must come from the config (file or flag) or from
    /// `KRUIZE_URL`; the harness never discovers service endpoints itself.
    pub fn resolve(config: &HarnessConfig) -> HarnessResult<Self> {
        let raw_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var(KRUIZE_URL_ENV).ok())
            .ok_or_else(|| {
                HarnessError::config(format!(
                    "no service base URL: set base_url in the config, pass --url, or export {}",
                    KRUIZE_URL_ENV
                ))
            })?;

        let base_url = Url::parse(&raw_url).map_err(|e| {
            HarnessError::config(format!("invalid base URL '{}': {}", raw_url, e))
        })?;

        Ok(ClusterContext {
            cluster_type: config.cluster_type,
            base_url,
            timeout: Duration::from_secs(config.timeout_secs),
            scratch_dir: config.scratch_dir.clone(),
        })
    }

    /// Content type to send, honoring the invalid-header switch
    pub fn content_type(&self, invalid_header: bool) -> &'static str {
        if invalid_header {
            super::contract::CONTENT_TYPE_REJECTED
        } else {
            super::contract::CONTENT_TYPE_JSON
        }
    }
}

// ==================== Baseline fixture values ====================

/// Valid baseline value for a templated field
///
/// A document rendered entirely from these values is accepted by the
/// service with the canonical success message.
pub fn baseline_value(field: CaseField) -> &'static str {
    match field {
        CaseField::ExperimentName => "quarkus-resteasy-kruize-min-http-response-time-db",
        CaseField::DeploymentName => "tfb-qrh-sample",
        CaseField::Namespace => "default",
        CaseField::PerformanceProfile => "resource-optimization-openshift",
        CaseField::SloClass => "response_time",
        CaseField::Direction => "minimize",
        CaseField::Mode => "monitor",
        CaseField::TargetCluster => "remote",
        CaseField::Image => "kruize/tfb-qrh:1.13.2.F_et17",
        CaseField::ContainerName => "tfb-server",
        CaseField::MeasurementDuration => "15min",
        CaseField::Threshold => "0.1",
        CaseField::MatchLabel => "app.kubernetes.io/name",
        CaseField::MatchLabelValue => "tfb-qrh-deployment",
    }
}
