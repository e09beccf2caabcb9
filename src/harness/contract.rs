//! Service contract constants for the Kruize createExperiment API
//!
//! Canonical endpoint paths, status codes, status strings, and response
//! messages that the conformance checks match against. These values are
//! fixed by the service; the harness never invents its own.

use serde::{Deserialize, Serialize};

// ==================== Endpoints ====================

/// Path for experiment registration (POST) and removal (DELETE)
pub const CREATE_EXPERIMENT_PATH: &str = "/createExperiment";

// ==================== Status codes ====================

/// Status code returned when an experiment is registered
pub const SUCCESS_STATUS_CODE: u16 = 201;

/// Status code returned when the service rejects a request
pub const ERROR_STATUS_CODE: u16 = 400;

// ==================== Content types ====================

/// Content type the service accepts
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type the service is known to reject
pub const CONTENT_TYPE_REJECTED: &str = "application/xml";

// ==================== Response messages ====================

/// Message returned on successful experiment registration
pub const CREATE_SUCCESS_MESSAGE: &str =
    "Experiment registered successfully with Kruize. View registered experiments at /listExperiments";

/// Prefix of the rejection message when mandatory parameters are missing
pub const MANDATORY_MISSING_PREFIX: &str = "Mandatory parameters missing ";

/// Rejection message for an experiment name that is already registered
pub fn duplicate_message(experiment_name: &str) -> String {
    format!("Experiment name : {} is duplicate", experiment_name)
}

// ==================== Status field ====================

/// Value of the `status` field in the service response envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Success,
    Error,
}

impl ServiceStatus {
    /// Wire spelling of the status value
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Success => "SUCCESS",
            ServiceStatus::Error => "ERROR",
        }
    }

    /// Parse a status string from a response body, tolerating unknown values
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUCCESS" => Some(ServiceStatus::Success),
            "ERROR" => Some(ServiceStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
