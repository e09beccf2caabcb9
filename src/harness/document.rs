//! Experiment document rendering and materialization
//!
//! Renders the fixed experiment-definition JSON schema from case field
//! states and writes each document to a deterministic per-case path under
//! the run's scratch directory. Substitution policy: `Blank` serializes as
//! `""`, `Null` as JSON null, `Absent` omits the key.

use super::case::{CaseField, FieldState, TestCase};
use super::error::{HarnessError, HarnessResult};
use super::fixtures::baseline_value;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Insert a field state into a JSON object, honoring the absent case
fn insert_state(obj: &mut Map<String, Value>, key: &str, state: &FieldState) {
    match state {
        FieldState::Absent => {}
        FieldState::Null => {
            obj.insert(key.to_string(), Value::Null);
        }
        FieldState::Blank => {
            obj.insert(key.to_string(), json!(""));
        }
        FieldState::Value(v) => {
            obj.insert(key.to_string(), json!(v));
        }
    }
}

fn baseline_state(field: CaseField) -> FieldState {
    FieldState::Value(baseline_value(field).to_string())
}

/// Build one experiment definition from case field states
///
/// The baseline shape carries `performanceProfile` and `deployment_name`.
/// A case that moves an `slo` or `selector` field away from baseline
/// switches to the alternate member of the pair, so the rendered document
/// exercises exactly the field under test instead of tripping the
/// mutual-exclusion rejection.
fn definition_from(case: &TestCase) -> Map<String, Value> {
    let uses_slo =
        case.overrides(CaseField::SloClass) || case.overrides(CaseField::Direction);
    let uses_selector =
        case.overrides(CaseField::MatchLabel) || case.overrides(CaseField::MatchLabelValue);

    let mut def = Map::new();
    insert_state(&mut def, "experiment_name", &case.state(CaseField::ExperimentName));

    if uses_selector {
        let mut selector = Map::new();
        insert_state(&mut selector, "matchLabel", &case.state(CaseField::MatchLabel));
        insert_state(
            &mut selector,
            "matchLabelValue",
            &case.state(CaseField::MatchLabelValue),
        );
        def.insert("selector".to_string(), Value::Object(selector));
    } else {
        insert_state(&mut def, "deployment_name", &case.state(CaseField::DeploymentName));
    }

    insert_state(&mut def, "namespace", &case.state(CaseField::Namespace));

    if uses_slo {
        let mut slo = Map::new();
        insert_state(&mut slo, "slo_class", &case.state(CaseField::SloClass));
        insert_state(&mut slo, "direction", &case.state(CaseField::Direction));
        def.insert("slo".to_string(), Value::Object(slo));
    } else {
        insert_state(
            &mut def,
            "performanceProfile",
            &case.state(CaseField::PerformanceProfile),
        );
    }

    insert_state(&mut def, "mode", &case.state(CaseField::Mode));
    insert_state(&mut def, "targetCluster", &case.state(CaseField::TargetCluster));

    let mut container = Map::new();
    insert_state(&mut container, "image", &case.state(CaseField::Image));
    insert_state(&mut container, "container_name", &case.state(CaseField::ContainerName));
    def.insert("containers".to_string(), json!([Value::Object(container)]));

    let mut trial = Map::new();
    insert_state(
        &mut trial,
        "measurement_duration",
        &case.state(CaseField::MeasurementDuration),
    );
    def.insert("trial_settings".to_string(), Value::Object(trial));

    let mut recommendation = Map::new();
    insert_state(&mut recommendation, "threshold", &case.state(CaseField::Threshold));
    def.insert(
        "recommendation_settings".to_string(),
        Value::Object(recommendation),
    );

    def
}

fn baseline_definition() -> Map<String, Value> {
    let empty = TestCase {
        name: String::new(),
        expected_status_code: super::contract::SUCCESS_STATUS_CODE,
        expected_status: super::contract::ServiceStatus::Success,
        fields: Default::default(),
    };
    definition_from(&empty)
}

/// Render a single-definition document for a case
pub fn render_case(case: &TestCase) -> Value {
    Value::Array(vec![Value::Object(definition_from(case))])
}

/// Render the valid baseline document
pub fn render_baseline() -> Value {
    Value::Array(vec![Value::Object(baseline_definition())])
}

/// Mutually exclusive pairs an experiment definition may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPair {
    /// Both `performanceProfile` and `slo`
    ProfileAndSlo,
    /// Both `deployment_name` and `selector`
    DeploymentAndSelector,
}

/// Render a baseline document with both members of a pair present
pub fn render_conflict(pair: ConflictPair) -> Value {
    let mut def = baseline_definition();
    match pair {
        ConflictPair::ProfileAndSlo => {
            def.insert("slo".to_string(), baseline_slo());
        }
        ConflictPair::DeploymentAndSelector => {
            def.insert("selector".to_string(), baseline_selector());
        }
    }
    Value::Array(vec![Value::Object(def)])
}

/// Render the over-specified document used by the mandatory-field
/// scenarios, carrying both members of both pairs before keys are dropped
pub fn render_full() -> Value {
    let mut def = baseline_definition();
    def.insert("slo".to_string(), baseline_slo());
    def.insert("selector".to_string(), baseline_selector());
    Value::Array(vec![Value::Object(def)])
}

fn baseline_slo() -> Value {
    json!({
        "slo_class": baseline_value(CaseField::SloClass),
        "direction": baseline_value(CaseField::Direction),
    })
}

fn baseline_selector() -> Value {
    json!({
        "matchLabel": baseline_value(CaseField::MatchLabel),
        "matchLabelValue": baseline_value(CaseField::MatchLabelValue),
    })
}

/// Remove keys from every definition in a document
pub fn drop_fields(doc: &mut Value, keys: &[&str]) {
    if let Some(definitions) = doc.as_array_mut() {
        for def in definitions {
            if let Some(obj) = def.as_object_mut() {
                for key in keys {
                    obj.remove(*key);
                }
            }
        }
    }
}

/// Render one document with `count` definitions, each with a distinct
/// experiment name and container image/name pair
pub fn render_multi(count: usize) -> Value {
    let definitions = (0..count)
        .map(|i| {
            let mut def = baseline_definition();
            suffix_field(&mut def, "experiment_name", i);
            if let Some(containers) = def.get_mut("containers").and_then(Value::as_array_mut) {
                for container in containers {
                    if let Some(obj) = container.as_object_mut() {
                        suffix_in(obj, "image", i);
                        suffix_in(obj, "container_name", i);
                    }
                }
            }
            Value::Object(def)
        })
        .collect();
    Value::Array(definitions)
}

/// Render a single-definition document derived from the baseline by
/// suffixing the index onto the experiment name, and onto the deployment
/// name and namespace when `rename_deployment` is set
pub fn render_indexed(index: usize, rename_deployment: bool) -> Value {
    let mut def = baseline_definition();
    suffix_field(&mut def, "experiment_name", index);
    if rename_deployment {
        suffix_field(&mut def, "deployment_name", index);
        suffix_field(&mut def, "namespace", index);
    }
    Value::Array(vec![Value::Object(def)])
}

fn suffix_field(def: &mut Map<String, Value>, key: &str, index: usize) {
    suffix_in(def, key, index);
}

fn suffix_in(obj: &mut Map<String, Value>, key: &str, index: usize) {
    if let Some(Value::String(s)) = obj.get_mut(key) {
        s.push_str(&format!("_{}", index));
    }
}

/// Experiment names defined in a document, in definition order
pub fn experiment_names(doc: &Value) -> Vec<String> {
    doc.as_array()
        .map(|definitions| {
            definitions
                .iter()
                .filter_map(|def| def.get("experiment_name"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ==================== Materialization ====================

/// Writes rendered documents under one run's scratch directory
///
/// The path for a case is deterministic:
/// `<scratch>/<run_id>/create_exp_<case>.json`.
pub struct DocumentStore {
    run_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(scratch_dir: &Path, run_id: &str) -> Self {
        DocumentStore {
            run_dir: scratch_dir.join(run_id),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Deterministic path for a case's materialized document
    pub fn case_path(&self, case_name: &str) -> PathBuf {
        self.run_dir.join(format!("create_exp_{}.json", case_name))
    }

    /// Materialize a document, creating the run directory on first use
    pub fn write(&self, case_name: &str, doc: &Value) -> HarnessResult<PathBuf> {
        std::fs::create_dir_all(&self.run_dir)
            .map_err(|e| HarnessError::io(&self.run_dir, e))?;

        let path = self.case_path(case_name);
        let payload = serde_json::to_string_pretty(doc).map_err(|e| HarnessError::Render {
            case: case_name.to_string(),
            message: format!("failed to serialize document: {}", e),
        })?;
        std::fs::write(&path, payload).map_err(|e| HarnessError::io(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::case::{CaseField, FieldState, TestCase};

    fn first(doc: &Value) -> &Map<String, Value> {
        doc.as_array().unwrap()[0].as_object().unwrap()
    }

    #[test]
    fn test_baseline_shape() {
        let doc = render_baseline();
        let def = first(&doc);
        assert_eq!(
            def["experiment_name"],
            json!("quarkus-resteasy-kruize-min-http-response-time-db")
        );
        assert_eq!(def["deployment_name"], json!("tfb-qrh-sample"));
        assert_eq!(def["performanceProfile"], json!("resource-optimization-openshift"));
        assert!(!def.contains_key("slo"));
        assert!(!def.contains_key("selector"));
        assert_eq!(def["containers"][0]["container_name"], json!("tfb-server"));
        assert_eq!(def["trial_settings"]["measurement_duration"], json!("15min"));
        assert_eq!(def["recommendation_settings"]["threshold"], json!("0.1"));
    }

    #[test]
    fn test_substitution_policy() {
        let blank =
            TestCase::single_field("blank_namespace", 400, CaseField::Namespace, FieldState::Blank);
        assert_eq!(first(&render_case(&blank))["namespace"], json!(""));

        let null =
            TestCase::single_field("null_namespace", 400, CaseField::Namespace, FieldState::Null);
        assert_eq!(first(&render_case(&null))["namespace"], Value::Null);

        let absent = TestCase::single_field(
            "absent_namespace",
            400,
            CaseField::Namespace,
            FieldState::Absent,
        );
        assert!(!first(&render_case(&absent)).contains_key("namespace"));
    }

    #[test]
    fn test_slo_case_switches_shape() {
        let case =
            TestCase::single_field("blank_slo_class", 400, CaseField::SloClass, FieldState::Blank);
        let doc = render_case(&case);
        let def = first(&doc);
        assert!(!def.contains_key("performanceProfile"));
        assert_eq!(def["slo"]["slo_class"], json!(""));
        assert_eq!(def["slo"]["direction"], json!("minimize"));
        // Deployment side is untouched
        assert_eq!(def["deployment_name"], json!("tfb-qrh-sample"));
        assert!(!def.contains_key("selector"));
    }

    #[test]
    fn test_selector_case_switches_shape() {
        let case = TestCase::single_field(
            "absent_matchLabel",
            400,
            CaseField::MatchLabel,
            FieldState::Absent,
        );
        let doc = render_case(&case);
        let def = first(&doc);
        assert!(!def.contains_key("deployment_name"));
        assert!(!def["selector"].as_object().unwrap().contains_key("matchLabel"));
        assert_eq!(def["selector"]["matchLabelValue"], json!("tfb-qrh-deployment"));
        assert_eq!(def["performanceProfile"], json!("resource-optimization-openshift"));
    }

    #[test]
    fn test_conflict_documents() {
        let doc = render_conflict(ConflictPair::ProfileAndSlo);
        let def = first(&doc);
        assert!(def.contains_key("performanceProfile"));
        assert!(def.contains_key("slo"));
        assert!(!def.contains_key("selector"));

        let doc = render_conflict(ConflictPair::DeploymentAndSelector);
        let def = first(&doc);
        assert!(def.contains_key("deployment_name"));
        assert!(def.contains_key("selector"));
        assert!(!def.contains_key("slo"));
    }

    #[test]
    fn test_full_document_and_drops() {
        let mut doc = render_full();
        {
            let def = first(&doc);
            assert!(def.contains_key("performanceProfile"));
            assert!(def.contains_key("slo"));
            assert!(def.contains_key("deployment_name"));
            assert!(def.contains_key("selector"));
        }

        drop_fields(&mut doc, &["slo", "selector", "namespace"]);
        let def = first(&doc);
        assert!(!def.contains_key("slo"));
        assert!(!def.contains_key("selector"));
        assert!(!def.contains_key("namespace"));
        assert!(def.contains_key("performanceProfile"));
    }

    #[test]
    fn test_multi_document_distinct_definitions() {
        let doc = render_multi(3);
        let names = experiment_names(&doc);
        assert_eq!(names.len(), 3);
        assert_eq!(
            names[1],
            "quarkus-resteasy-kruize-min-http-response-time-db_1"
        );

        let defs = doc.as_array().unwrap();
        let images: Vec<_> = defs
            .iter()
            .map(|d| d["containers"][0]["image"].as_str().unwrap().to_string())
            .collect();
        let unique: std::collections::HashSet<_> = images.iter().collect();
        assert_eq!(unique.len(), 3, "container images must be distinct");
    }

    #[test]
    fn test_indexed_document() {
        let doc = render_indexed(2, true);
        let def = first(&doc);
        assert_eq!(
            def["experiment_name"],
            json!("quarkus-resteasy-kruize-min-http-response-time-db_2")
        );
        assert_eq!(def["deployment_name"], json!("tfb-qrh-sample_2"));
        assert_eq!(def["namespace"], json!("default_2"));

        let doc = render_indexed(4, false);
        let def = first(&doc);
        assert_eq!(def["deployment_name"], json!("tfb-qrh-sample"));
        assert_eq!(def["namespace"], json!("default"));
    }

    #[test]
    fn test_experiment_names_skips_unnamed() {
        let doc = json!([
            {"experiment_name": "exp-a"},
            {"experiment_name": null},
            {"deployment_name": "d"},
            {"experiment_name": "exp-b"},
        ]);
        assert_eq!(experiment_names(&doc), vec!["exp-a", "exp-b"]);
        assert!(experiment_names(&json!({})).is_empty());
    }
}
