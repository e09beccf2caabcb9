//! Experiment service client
//!
//! `ExperimentService` is the seam between the lifecycle logic and the
//! wire: the reqwest implementation talks to a live service, the in-memory
//! stub serves offline tests. Non-2xx responses are data, not errors;
//! only network-layer failures surface as [`HarnessError::Transport`].

use super::contract::{ServiceStatus, CREATE_EXPERIMENT_PATH};
use super::document::experiment_names;
use super::error::{HarnessError, HarnessResult};
use super::fixtures::ClusterContext;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;

/// Outcome of one remote call, including rejections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpResult {
    /// HTTP status code
    pub status_code: u16,

    /// `status` field of the response envelope, absent when the body is
    /// not the service's JSON envelope
    pub status: Option<ServiceStatus>,

    /// `message` field of the response envelope
    pub message: Option<String>,

    /// Response headers
    pub headers: HashMap<String, String>,
}

impl HttpResult {
    /// Whether the call landed in the 2xx family
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Service response envelope; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Create/delete operations against the experiment API
#[async_trait]
pub trait ExperimentService: Send + Sync {
    /// Register the experiments defined in a materialized document
    ///
    /// With `invalid_header` set, the request carries a content type the
    /// service is known to reject, exercising header validation.
    async fn create(&self, document: &Path, invalid_header: bool) -> HarnessResult<HttpResult>;

    /// Remove every experiment named in a materialized document
    ///
    /// Idempotent from the harness side: a rejection for an absent
    /// experiment is an ordinary result, not an error.
    async fn delete(&self, document: &Path) -> HarnessResult<HttpResult>;
}

/// reqwest-backed implementation talking to a live service
pub struct HttpExperimentService {
    endpoint: String,
    client: Client,
    json_content_type: &'static str,
    rejected_content_type: &'static str,
}

impl HttpExperimentService {
    pub fn new(context: &ClusterContext) -> HarnessResult<Self> {
        let client = Client::builder()
            .timeout(context.timeout)
            .build()
            .map_err(|e| HarnessError::config(format!("failed to build HTTP client: {}", e)))?;

        let base = context.base_url.as_str().trim_end_matches('/').to_string();
        Ok(HttpExperimentService {
            endpoint: format!("{}{}", base, CREATE_EXPERIMENT_PATH),
            client,
            json_content_type: context.content_type(false),
            rejected_content_type: context.content_type(true),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn into_result(&self, response: reqwest::Response) -> HarnessResult<HttpResult> {
        let status_code = response.status().as_u16();

        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            headers.insert(
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            );
        }

        let body = response
            .text()
            .await
            .map_err(|e| HarnessError::transport(&self.endpoint, e))?;

        let (status, message) = match serde_json::from_str::<ResponseEnvelope>(&body) {
            Ok(envelope) => (
                envelope.status.as_deref().and_then(ServiceStatus::parse),
                envelope.message,
            ),
            Err(_) => (None, None),
        };

        Ok(HttpResult {
            status_code,
            status,
            message,
            headers,
        })
    }

    fn read_document(&self, document: &Path) -> HarnessResult<String> {
        std::fs::read_to_string(document).map_err(|e| HarnessError::io(document, e))
    }
}

#[async_trait]
impl ExperimentService for HttpExperimentService {
    async fn create(&self, document: &Path, invalid_header: bool) -> HarnessResult<HttpResult> {
        let payload = self.read_document(document)?;
        let content_type = if invalid_header {
            self.rejected_content_type
        } else {
            self.json_content_type
        };

        log::debug!(
            "POST {} ({} bytes, content-type {})",
            self.endpoint,
            payload.len(),
            content_type
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, content_type)
            .body(payload)
            .send()
            .await
            .map_err(|e| HarnessError::transport(&self.endpoint, e))?;

        self.into_result(response).await
    }

    async fn delete(&self, document: &Path) -> HarnessResult<HttpResult> {
        let payload = self.read_document(document)?;
        let doc: serde_json::Value =
            serde_json::from_str(&payload).map_err(|e| HarnessError::Io {
                path: document.display().to_string(),
                message: format!("document is not valid JSON: {}", e),
            })?;

        let body: Vec<serde_json::Value> = experiment_names(&doc)
            .into_iter()
            .map(|name| json!({ "experiment_name": name }))
            .collect();

        log::debug!("DELETE {} ({} experiments)", self.endpoint, body.len());

        let response = self
            .client
            .delete(&self.endpoint)
            .header(CONTENT_TYPE, self.json_content_type)
            .json(&body)
            .send()
            .await
            .map_err(|e| HarnessError::transport(&self.endpoint, e))?;

        self.into_result(response).await
    }
}
