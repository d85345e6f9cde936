use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use promptlab_core::{load_manifest_str, plan_jobs, BatchManifest, JobSpec};
use promptlab_exec::job::{HttpRequest, HttpResponse};
use promptlab_exec::{
    GenerationClient, HttpClient, HttpError, RetryConfig, RunConfig, TaskErrorKind, TaskRunner,
};
use secrecy::SecretString;
use tempfile::TempDir;

/// Replays canned responses and records every request it sees.
#[derive(Default)]
struct MockHttpClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<(HttpRequest, Duration)>>,
}

impl MockHttpClient {
    fn with(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        })
    }

    fn requests(&self) -> Vec<(HttpRequest, Duration)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(
        &self,
        req: HttpRequest,
        timeout: Duration,
        _max_response_bytes: usize,
    ) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push((req, timeout));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(HttpError::Other("no canned response left".into())))
    }
}

fn ok_json(body: &str) -> Result<HttpResponse, HttpError> {
    status(200, body)
}

fn status(code: u16, body: &str) -> Result<HttpResponse, HttpError> {
    Ok(HttpResponse {
        status: code,
        headers: Default::default(),
        body: body.as_bytes().to_vec(),
    })
}

struct Fixture {
    _dir: TempDir,
    manifest: BatchManifest,
    jobs: Vec<JobSpec>,
}

fn fixture(extra_yaml: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cat.png"), [1u8, 2, 3]).unwrap();
    std::fs::write(dir.path().join("dog.JPG"), [0xffu8, 0xd8]).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    let yaml = format!(
        r#"
endpoint: https://api.example.test/v1/describe
instruction: Write a short prompt for this image.
models: [vision-small]
images:
  - path: cat.png
  - path: dog.JPG
  - path: notes.txt
  - path: missing.png
timeoutMs: 1500
headers:
  X-Client: promptlab-tests
{extra_yaml}
"#
    );
    let manifest = load_manifest_str(&yaml).unwrap();
    let jobs = plan_jobs(&manifest, Some(dir.path()));
    Fixture {
        _dir: dir,
        manifest,
        jobs,
    }
}

#[tokio::test]
async fn sends_encoded_image_and_extracts_prompt() {
    let fx = fixture("responsePointer: /output/text");
    let http = MockHttpClient::with(vec![ok_json(
        r#"{"output": {"text": "  a tabby cat asleep on a windowsill \n"}}"#,
    )]);
    let client = GenerationClient::from_manifest(
        &fx.manifest,
        http.clone(),
        Some(SecretString::from("sk-test".to_string())),
    )
    .unwrap();

    let out = client.generate(&fx.jobs[0]).await.unwrap();
    assert_eq!(out.job_id, "cat@vision-small");
    assert_eq!(out.image_id, "cat");
    assert_eq!(out.model, "vision-small");
    assert_eq!(out.prompt, "a tabby cat asleep on a windowsill");

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    let (req, timeout) = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.url.as_str(), "https://api.example.test/v1/describe");
    assert_eq!(*timeout, Duration::from_millis(1500));
    assert_eq!(req.headers["Authorization"], "Bearer sk-test");
    assert_eq!(req.headers["Content-Type"], "application/json");
    assert_eq!(req.headers["X-Client"], "promptlab-tests");

    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(body["model"], "vision-small");
    assert_eq!(body["instruction"], "Write a short prompt for this image.");
    assert_eq!(body["image"]["mediaType"], "image/png");
    assert_eq!(body["image"]["data"], "AQID");
}

#[tokio::test]
async fn whole_body_is_the_prompt_without_a_pointer() {
    let fx = fixture("");
    let http = MockHttpClient::with(vec![ok_json("  a dog in the snow  ")]);
    let client = GenerationClient::from_manifest(&fx.manifest, http.clone(), None).unwrap();

    let out = client.generate(&fx.jobs[1]).await.unwrap();
    assert_eq!(out.prompt, "a dog in the snow");

    let (req, _) = &http.requests()[0];
    assert!(!req.headers.contains_key("Authorization"));
    let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(body["image"]["mediaType"], "image/jpeg");
}

#[tokio::test]
async fn non_string_pointer_values_are_rendered_as_json() {
    let fx = fixture("responsePointer: /tags");
    let http = MockHttpClient::with(vec![ok_json(r#"{"tags": ["cat", "window"]}"#)]);
    let client = GenerationClient::from_manifest(&fx.manifest, http, None).unwrap();

    let out = client.generate(&fx.jobs[0]).await.unwrap();
    assert_eq!(out.prompt, r#"["cat","window"]"#);
}

#[tokio::test]
async fn classifies_http_failures() {
    let fx = fixture("responsePointer: /text");
    let http = MockHttpClient::with(vec![
        status(503, "overloaded"),
        status(429, "slow down"),
        status(400, "unsupported image"),
        Err(HttpError::Timeout),
        Err(HttpError::Network("connection refused".into())),
        ok_json(r#"{"other": 1}"#),
        ok_json("not json"),
    ]);
    let client = GenerationClient::from_manifest(&fx.manifest, http, None).unwrap();
    let job = &fx.jobs[0];

    let e = client.generate(job).await.unwrap_err();
    assert_eq!(e.kind, TaskErrorKind::Failed);
    assert_eq!(e.message, "HTTP 503: overloaded");
    assert_eq!(
        client.generate(job).await.unwrap_err().kind,
        TaskErrorKind::Failed
    );

    let e = client.generate(job).await.unwrap_err();
    assert_eq!(e.kind, TaskErrorKind::Permanent);
    assert_eq!(e.message, "HTTP 400: unsupported image");

    let e = client.generate(job).await.unwrap_err();
    assert_eq!(e.kind, TaskErrorKind::Timeout);
    assert_eq!(e.message, "no response within 1500ms");

    assert_eq!(
        client.generate(job).await.unwrap_err().kind,
        TaskErrorKind::Failed
    );

    let e = client.generate(job).await.unwrap_err();
    assert_eq!(e.kind, TaskErrorKind::Permanent);
    assert!(e.message.contains("/text"));

    let e = client.generate(job).await.unwrap_err();
    assert_eq!(e.kind, TaskErrorKind::Permanent);
    assert!(e.message.starts_with("response is not valid JSON"));
}

#[tokio::test]
async fn bad_inputs_fail_before_any_request() {
    let fx = fixture("");
    let http = MockHttpClient::with(vec![]);
    let client = GenerationClient::from_manifest(&fx.manifest, http.clone(), None).unwrap();

    let e = client.generate(&fx.jobs[2]).await.unwrap_err();
    assert_eq!(e.kind, TaskErrorKind::Permanent);
    assert!(e.message.starts_with("unsupported image type"));

    let e = client.generate(&fx.jobs[3]).await.unwrap_err();
    assert_eq!(e.kind, TaskErrorKind::Permanent);
    assert!(e.message.starts_with("failed to read image"));

    assert!(http.requests().is_empty());
}

#[test]
fn debug_output_redacts_api_key() {
    let fx = fixture("");
    let client = GenerationClient::from_manifest(
        &fx.manifest,
        MockHttpClient::with(vec![]),
        Some(SecretString::from("sk-very-secret".to_string())),
    )
    .unwrap();
    let dbg = format!("{client:?}");
    assert!(!dbg.contains("sk-very-secret"));
    assert!(dbg.contains("[REDACTED]"));
}

#[tokio::test]
async fn runner_retries_transient_generation_failures() {
    let fx = fixture("responsePointer: /text");
    let http = MockHttpClient::with(vec![
        status(502, "bad gateway"),
        ok_json(r#"{"text": "a cat"}"#),
        status(500, "boom"),
        status(500, "boom"),
        ok_json(r#"{"text": "a dog"}"#),
    ]);
    let client = Arc::new(GenerationClient::from_manifest(&fx.manifest, http.clone(), None).unwrap());

    let tasks: Vec<_> = fx.jobs[..2]
        .iter()
        .map(|job| {
            let client = client.clone();
            move || {
                let client = client.clone();
                async move { client.generate(job).await }
            }
        })
        .collect();

    let res = TaskRunner::new(
        RunConfig::default()
            .with_concurrency(1)
            .with_retry(RetryConfig {
                retry_attempts: 2,
                base_delay: Duration::from_millis(1),
                jitter_ratio: 0.0,
                max_delay: None,
            }),
    )
    .run(&tasks)
    .await
    .unwrap();

    assert!(res.all_succeeded());
    assert_eq!(res.results[0].as_ref().unwrap().prompt, "a cat");
    assert_eq!(res.results[1].as_ref().unwrap().prompt, "a dog");
    assert_eq!(http.requests().len(), 5);
}
