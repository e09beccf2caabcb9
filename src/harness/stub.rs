//! In-memory experiment service for offline tests
//!
//! Emulates the contract the conformance checks assert on: mandatory
//! field validation, mutually exclusive pairs, name uniqueness with the
//! canonical duplicate message, and idempotent-from-the-harness delete.
//! Lifecycle and scenario tests run against this stub without a network.

use super::client::{ExperimentService, HttpResult};
use super::contract::{
    duplicate_message, ServiceStatus, CREATE_SUCCESS_MESSAGE, ERROR_STATUS_CODE,
    MANDATORY_MISSING_PREFIX, SUCCESS_STATUS_CODE,
};
use super::document::experiment_names;
use super::error::{HarnessError, HarnessResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory service with the same observable contract as the live API
#[derive(Clone, Default)]
pub struct InMemoryExperimentService {
    experiments: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryExperimentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of experiments currently registered
    pub async fn registered_count(&self) -> usize {
        self.experiments.read().await.len()
    }

    /// Whether an experiment name is currently registered
    pub async fn is_registered(&self, name: &str) -> bool {
        self.experiments.read().await.contains(name)
    }

    fn read_document(document: &Path) -> HarnessResult<String> {
        std::fs::read_to_string(document).map_err(|e| HarnessError::io(document, e))
    }
}

fn envelope_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(
        "content-type".to_string(),
        super::contract::CONTENT_TYPE_JSON.to_string(),
    );
    headers
}

fn accepted(message: &str) -> HttpResult {
    HttpResult {
        status_code: SUCCESS_STATUS_CODE,
        status: Some(ServiceStatus::Success),
        message: Some(message.to_string()),
        headers: envelope_headers(),
    }
}

fn rejected(message: impl Into<String>) -> HttpResult {
    HttpResult {
        status_code: ERROR_STATUS_CODE,
        status: Some(ServiceStatus::Error),
        message: Some(message.into()),
        headers: envelope_headers(),
    }
}

fn missing(field: &str) -> String {
    format!("{}[{}]", MANDATORY_MISSING_PREFIX, field)
}

/// A key present with a non-null value, blank included
fn is_set(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(|v| !v.is_null())
}

/// Required string field: present, a string, and non-empty
fn required_string<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(missing(key)),
    }
}

/// Required field of any scalar type: present, non-null, and not blank
fn required_present(obj: &Map<String, Value>, key: &str) -> Result<(), String> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(missing(key)),
        Some(Value::String(s)) if s.is_empty() => Err(missing(key)),
        Some(_) => Ok(()),
    }
}

/// Validate one experiment definition, returning its name on success and
/// the rejection message on failure
fn validate_definition(def: &Value) -> Result<String, String> {
    let obj = def
        .as_object()
        .ok_or_else(|| "Invalid input JSON data".to_string())?;

    // Mutually exclusive pairs
    if is_set(obj, "performanceProfile") && is_set(obj, "slo") {
        return Err("Invalid input JSON data: both performanceProfile and slo are set".to_string());
    }
    if is_set(obj, "deployment_name") && is_set(obj, "selector") {
        return Err(
            "Invalid input JSON data: both deployment_name and selector are set".to_string(),
        );
    }

    let name = required_string(obj, "experiment_name")?.to_string();
    required_string(obj, "namespace")?;
    required_string(obj, "mode")?;
    required_string(obj, "targetCluster")?;

    // Optimization goal: performanceProfile, or a complete slo object
    if is_set(obj, "slo") {
        let slo = obj
            .get("slo")
            .and_then(Value::as_object)
            .ok_or_else(|| missing("slo"))?;
        required_string(slo, "slo_class")?;
        required_string(slo, "direction")?;
    } else {
        required_string(obj, "performanceProfile")?;
    }

    // Target workload: deployment_name, or a complete selector object
    if is_set(obj, "selector") {
        let selector = obj
            .get("selector")
            .and_then(Value::as_object)
            .ok_or_else(|| missing("selector"))?;
        required_string(selector, "matchLabel")?;
        required_string(selector, "matchLabelValue")?;
    } else {
        required_string(obj, "deployment_name")?;
    }

    let containers = obj
        .get("containers")
        .and_then(Value::as_array)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| missing("containers"))?;
    for container in containers {
        let container = container
            .as_object()
            .ok_or_else(|| missing("containers"))?;
        required_string(container, "image")?;
        required_string(container, "container_name")?;
    }

    let trial = obj
        .get("trial_settings")
        .and_then(Value::as_object)
        .ok_or_else(|| missing("trial_settings"))?;
    required_present(trial, "measurement_duration")?;

    let recommendation = obj
        .get("recommendation_settings")
        .and_then(Value::as_object)
        .ok_or_else(|| missing("recommendation_settings"))?;
    required_present(recommendation, "threshold")?;

    Ok(name)
}

#[async_trait]
impl ExperimentService for InMemoryExperimentService {
    async fn create(&self, document: &Path, invalid_header: bool) -> HarnessResult<HttpResult> {
        if invalid_header {
            return Ok(rejected(format!(
                "Unsupported content type: {}",
                super::contract::CONTENT_TYPE_REJECTED
            )));
        }

        let payload = Self::read_document(document)?;
        let doc: Value = match serde_json::from_str(&payload) {
            Ok(doc) => doc,
            Err(_) => return Ok(rejected("Invalid input JSON data")),
        };
        let definitions = match doc.as_array() {
            Some(defs) if !defs.is_empty() => defs,
            _ => return Ok(rejected("Invalid input JSON data")),
        };

        let mut registry = self.experiments.write().await;
        let mut accepted_names = Vec::with_capacity(definitions.len());

        for def in definitions {
            let name = match validate_definition(def) {
                Ok(name) => name,
                Err(message) => return Ok(rejected(message)),
            };
            if registry.contains(&name) || accepted_names.contains(&name) {
                return Ok(rejected(duplicate_message(&name)));
            }
            accepted_names.push(name);
        }

        for name in accepted_names {
            registry.insert(name);
        }
        Ok(accepted(CREATE_SUCCESS_MESSAGE))
    }

    async fn delete(&self, document: &Path) -> HarnessResult<HttpResult> {
        let payload = Self::read_document(document)?;
        let doc: Value = match serde_json::from_str(&payload) {
            Ok(doc) => doc,
            Err(_) => return Ok(rejected("Invalid input JSON data")),
        };

        let names = experiment_names(&doc);
        if names.is_empty() {
            return Ok(rejected("Experiment not found"));
        }

        let mut registry = self.experiments.write().await;
        let mut not_found = Vec::new();
        for name in &names {
            if !registry.remove(name) {
                not_found.push(name.clone());
            }
        }

        if not_found.is_empty() {
            Ok(accepted("Experiment deleted successfully"))
        } else {
            Ok(rejected(format!(
                "Experiment not found: {}",
                not_found.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_definition_baseline_passes() {
        let doc = crate::harness::document::render_baseline();
        let def = &doc.as_array().unwrap()[0];
        let name = validate_definition(def).unwrap();
        assert_eq!(name, "quarkus-resteasy-kruize-min-http-response-time-db");
    }

    #[test]
    fn test_validate_definition_rejects_blank_and_null() {
        let mut doc = crate::harness::document::render_baseline();
        doc[0]["namespace"] = json!("");
        let err = validate_definition(&doc[0]).unwrap_err();
        assert!(err.starts_with(MANDATORY_MISSING_PREFIX), "{}", err);
        assert!(err.contains("namespace"), "{}", err);

        let mut doc = crate::harness::document::render_baseline();
        doc[0]["mode"] = Value::Null;
        let err = validate_definition(&doc[0]).unwrap_err();
        assert!(err.contains("mode"), "{}", err);
    }

    #[test]
    fn test_validate_definition_rejects_conflicts() {
        use crate::harness::document::{render_conflict, ConflictPair};

        let doc = render_conflict(ConflictPair::ProfileAndSlo);
        let err = validate_definition(&doc[0]).unwrap_err();
        assert!(err.contains("performanceProfile"), "{}", err);

        let doc = render_conflict(ConflictPair::DeploymentAndSelector);
        let err = validate_definition(&doc[0]).unwrap_err();
        assert!(err.contains("selector"), "{}", err);
    }

    #[test]
    fn test_validate_definition_accepts_slo_and_selector_fallbacks() {
        let mut doc = crate::harness::document::render_full();
        crate::harness::document::drop_fields(&mut doc, &["performanceProfile", "deployment_name"]);
        let name = validate_definition(&doc[0]).unwrap();
        assert!(!name.is_empty());
    }

    #[test]
    fn test_validate_definition_requires_container_fields() {
        let mut doc = crate::harness::document::render_baseline();
        doc[0]["containers"] = json!([]);
        assert!(validate_definition(&doc[0]).unwrap_err().contains("containers"));

        let mut doc = crate::harness::document::render_baseline();
        doc[0]["containers"][0]["image"] = json!("");
        assert!(validate_definition(&doc[0]).unwrap_err().contains("image"));
    }
}
