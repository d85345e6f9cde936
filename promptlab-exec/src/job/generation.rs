use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use promptlab_core::{BatchManifest, JobSpec, JsonPointer, JsonPointerError};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::job::http::{HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::runner::TaskError;

const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];
const ERROR_SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPrompt {
    pub job_id: String,
    pub image_id: String,
    pub model: String,
    pub prompt: String,
}

#[derive(Debug, thiserror::Error)]
pub enum JobBuildError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("invalid response pointer: {0}")]
    InvalidPointer(#[from] JsonPointerError),
}

/// Sends one image/model pair to the generation endpoint per call.
///
/// The client applies its own request timeout; the runner never times tasks
/// out, so a slow endpoint surfaces as a `Timeout` task error.
pub struct GenerationClient {
    http: Arc<dyn HttpClient>,
    endpoint: url::Url,
    instruction: String,
    headers: BTreeMap<String, String>,
    api_key: Option<SecretString>,
    response_pointer: Option<JsonPointer>,
    timeout: Duration,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("instruction", &self.instruction)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("response_pointer", &self.response_pointer)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenerationClient {
    pub fn from_manifest(
        manifest: &BatchManifest,
        http: Arc<dyn HttpClient>,
        api_key: Option<SecretString>,
    ) -> Result<Self, JobBuildError> {
        let endpoint = url::Url::parse(&manifest.endpoint)?;
        let response_pointer = manifest
            .response_pointer
            .as_deref()
            .map(JsonPointer::parse)
            .transpose()?;
        Ok(Self {
            http,
            endpoint,
            instruction: manifest.instruction().to_string(),
            headers: manifest.headers.clone(),
            api_key,
            response_pointer,
            timeout: Duration::from_millis(manifest.timeout_ms),
        })
    }

    pub async fn generate(&self, job: &JobSpec) -> Result<GeneratedPrompt, TaskError> {
        let media_type = media_type_for(&job.image_path).ok_or_else(|| {
            TaskError::permanent(format!(
                "unsupported image type: {}",
                job.image_path.display()
            ))
        })?;
        let bytes = tokio::fs::read(&job.image_path).await.map_err(|e| {
            TaskError::permanent(format!(
                "failed to read image {}: {e}",
                job.image_path.display()
            ))
        })?;

        let body = json!({
            "model": job.model,
            "instruction": self.instruction,
            "image": {
                "mediaType": media_type,
                "data": general_purpose::STANDARD.encode(&bytes),
            },
        });
        let body = serde_json::to_vec(&body)
            .map_err(|e| TaskError::permanent(format!("failed to encode request: {e}")))?;

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        for (k, v) in &self.headers {
            headers.insert(k.clone(), v.clone());
        }
        if let Some(key) = &self.api_key {
            headers.insert(
                "Authorization".to_string(),
                format!("Bearer {}", key.expose_secret()),
            );
        }

        tracing::debug!(job_id = %job.job_id, bytes = bytes.len(), "sending generation request");
        let resp = self
            .http
            .send(
                HttpRequest {
                    method: "POST".to_string(),
                    url: self.endpoint.clone(),
                    headers,
                    body,
                },
                self.timeout,
                MAX_RESPONSE_BYTES,
            )
            .await
            .map_err(|e| map_http_error(e, self.timeout))?;

        let prompt = self.extract_prompt(&resp)?;
        Ok(GeneratedPrompt {
            job_id: job.job_id.clone(),
            image_id: job.image_id.clone(),
            model: job.model.clone(),
            prompt,
        })
    }

    fn extract_prompt(&self, resp: &HttpResponse) -> Result<String, TaskError> {
        if !(200..300).contains(&resp.status) {
            let message = format!("HTTP {}: {}", resp.status, body_snippet(&resp.body));
            return Err(if RETRYABLE_STATUSES.contains(&resp.status) {
                TaskError::failed(message)
            } else {
                TaskError::permanent(message)
            });
        }

        let Some(pointer) = &self.response_pointer else {
            return Ok(String::from_utf8_lossy(&resp.body).trim().to_string());
        };

        let value: serde_json::Value = serde_json::from_slice(&resp.body)
            .map_err(|e| TaskError::permanent(format!("response is not valid JSON: {e}")))?;
        match pointer.resolve(&value) {
            Some(serde_json::Value::String(s)) => Ok(s.trim().to_string()),
            Some(other) => Ok(other.to_string()),
            None => Err(TaskError::permanent(format!(
                "response has no value at '{}'",
                pointer.as_str()
            ))),
        }
    }
}

/// Media type for the image extensions the generation endpoint accepts.
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn map_http_error(err: HttpError, timeout: Duration) -> TaskError {
    match err {
        HttpError::Timeout => {
            TaskError::timeout(format!("no response within {}ms", timeout.as_millis()))
        }
        HttpError::ResponseTooLarge { .. } => TaskError::permanent(err.to_string()),
        HttpError::Network(_) | HttpError::Other(_) => TaskError::failed(err.to_string()),
    }
}

fn body_snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(ERROR_SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
