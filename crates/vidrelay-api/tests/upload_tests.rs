//! HTTP tests for the upload and summary routes.
//!
//! The pipeline collaborators are replaced with in-process fakes, so these
//! tests need neither the dataset CLI nor a WebDriver endpoint.

use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vidrelay_api::{create_router, ApiConfig, AppState, Claims};
use vidrelay_dataset::{DatasetConfig, DatasetError, DatasetResult, PublishReceipt};
use vidrelay_models::NotebookRunMode;
use vidrelay_pipeline::{
    DatasetPublisher, NotebookRunner, PipelineResult, Secret, Summarizer, UploadLogger,
    UploadPipeline,
};
use vidrelay_webdriver::{BrowserError, WebDriverClient};

const SECRET: &str = "test-secret";
const BOUNDARY: &str = "vidrelay-test-boundary";

// =========================================================================
// Fakes
// =========================================================================

#[derive(Default)]
struct FakePublisher {
    fail: bool,
    published: Mutex<Vec<PathBuf>>,
    /// Directory listed repeatedly while publishing
    watch: Mutex<Option<PathBuf>>,
    seen: Mutex<BTreeSet<String>>,
}

#[async_trait]
impl DatasetPublisher for FakePublisher {
    async fn publish(&self, file: &Path) -> DatasetResult<PublishReceipt> {
        self.published.lock().unwrap().push(file.to_path_buf());

        let watch = self.watch.lock().unwrap().clone();
        if let Some(dir) = watch {
            for _ in 0..20 {
                if let Ok(entries) = std::fs::read_dir(&dir) {
                    let mut seen = self.seen.lock().unwrap();
                    for entry in entries.flatten() {
                        seen.insert(entry.file_name().to_string_lossy().to_string());
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }

        if self.fail {
            return Err(DatasetError::command_failed(
                "kaggle exited with status 1",
                Some("403 Forbidden".to_string()),
                Some(1),
            ));
        }
        Ok(PublishReceipt {
            mirrored_path: file.to_path_buf(),
            cli_output: "Dataset version is being created".to_string(),
            duration: Duration::from_millis(1),
        })
    }
}

#[derive(Default)]
struct FakeNotebook {
    fail: bool,
    delay: Duration,
    runs: Mutex<Vec<NotebookRunMode>>,
}

#[async_trait]
impl NotebookRunner for FakeNotebook {
    async fn has_session(&self) -> bool {
        !self.runs.lock().unwrap().is_empty() && !self.fail
    }

    async fn run(&self, mode: NotebookRunMode, _log: &UploadLogger) -> PipelineResult<()> {
        self.runs.lock().unwrap().push(mode);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(BrowserError::Timeout {
                locator: "css `[aria-label=\"More actions for (Bro123)\"]`".to_string(),
                waited_ms: 20_000,
            }
            .into());
        }
        Ok(())
    }

    async fn close(&self) {}
}

#[derive(Default)]
struct FakeSummarizer {
    replies: Mutex<VecDeque<PipelineResult<String>>>,
    calls: AtomicUsize,
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, prompt: &str, _log: &UploadLogger) -> PipelineResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.starts_with("Here are my snippet summaries: "));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("combined summary".to_string()))
    }
}

// =========================================================================
// Harness
// =========================================================================

struct TestApp {
    router: Router,
    publisher: Arc<FakePublisher>,
    notebook: Arc<FakeNotebook>,
    summarizer: Arc<FakeSummarizer>,
    pipeline: Arc<UploadPipeline>,
    upload_dir: PathBuf,
    mirror_dir: PathBuf,
    _tmp: TempDir,
}

fn build_app(
    publisher: FakePublisher,
    notebook: FakeNotebook,
    summarizer: FakeSummarizer,
    secret: Option<&str>,
) -> TestApp {
    build_app_with(publisher, notebook, summarizer, secret, |_| {})
}

fn build_app_with(
    publisher: FakePublisher,
    notebook: FakeNotebook,
    summarizer: FakeSummarizer,
    secret: Option<&str>,
    configure: impl FnOnce(&mut ApiConfig),
) -> TestApp {
    let tmp = TempDir::new().unwrap();
    let upload_dir = tmp.path().join("uploads");

    let publisher = Arc::new(publisher);
    let notebook = Arc::new(notebook);
    let summarizer = Arc::new(summarizer);
    let pipeline = Arc::new(UploadPipeline::new(
        publisher.clone(),
        notebook.clone(),
        summarizer.clone(),
    ));

    let mut config = ApiConfig {
        upload_dir: upload_dir.clone(),
        auth_jwt_secret: secret.map(Secret::new),
        rate_limit_rps: 1_000,
        ..ApiConfig::default()
    };
    configure(&mut config);
    let mirror_dir = tmp.path().join("mirror");
    let dataset = DatasetConfig {
        mirror_dir: mirror_dir.clone(),
        ..DatasetConfig::default()
    };
    // Nothing listens on the discard port
    let webdriver = WebDriverClient::new("http://127.0.0.1:9").unwrap();

    let state = AppState::from_parts(config, Arc::clone(&pipeline), webdriver, dataset);

    TestApp {
        router: create_router(state, None),
        publisher,
        notebook,
        summarizer,
        pipeline,
        upload_dir,
        mirror_dir,
        _tmp: tmp,
    }
}

fn default_app() -> TestApp {
    build_app(
        FakePublisher::default(),
        FakeNotebook::default(),
        FakeSummarizer::default(),
        Some(SECRET),
    )
}

fn token(secret: &str) -> String {
    let claims = Claims {
        sub: "user-1".to_string(),
        email: Some("user@example.com".to_string()),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

/// A multipart part: field name, optional filename, content.
type Part<'a> = (&'a str, Option<&'a str>, &'a str);

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>], bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {bearer}"));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}

fn output_request(form_body: &str, bearer: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload/output")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::from(form_body.to_string()))
        .unwrap()
}

fn summary_request(bearer: &str) -> Request<Body> {
    Request::builder()
        .uri("/upload/summary")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn files_in(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

// =========================================================================
// Authentication
// =========================================================================

#[tokio::test]
async fn test_upload_requires_authentication() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        upload_request(&[("file", Some("clip.mp4"), "video")], None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized access. Please log in.");

    let (status, _) = send(
        &app.router,
        upload_request(&[("file", Some("clip.mp4"), "video")], Some(&token("wrong"))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(app.publisher.published.lock().unwrap().is_empty());
    assert!(files_in(&app.upload_dir).is_empty());
}

#[tokio::test]
async fn test_no_secret_configured_rejects_all_tokens() {
    let app = build_app(
        FakePublisher::default(),
        FakeNotebook::default(),
        FakeSummarizer::default(),
        None,
    );

    let (status, _) = send(&app.router, summary_request(&token(SECRET))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =========================================================================
// Intake validation
// =========================================================================

#[tokio::test]
async fn test_disallowed_extension_is_rejected_before_any_write() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        upload_request(&[("file", Some("notes.txt"), "text")], Some(&token(SECRET))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("File type not allowed."));
    assert!(files_in(&app.upload_dir).is_empty());
    assert!(app.publisher.published.lock().unwrap().is_empty());
    assert!(app.notebook.runs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_file_part() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        upload_request(&[("comment", None, "hello")], Some(&token(SECRET))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part in form.");
}

#[tokio::test]
async fn test_empty_filename() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        upload_request(&[("file", Some(""), "")], Some(&token(SECRET))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No selected file.");
}

#[tokio::test]
async fn test_non_multipart_body_is_bad_request() {
    let app = default_app();

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(SECRET)))
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// =========================================================================
// Upload cycle
// =========================================================================

#[tokio::test]
async fn test_successful_upload_stores_publishes_and_triggers() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        upload_request(
            &[("file", Some("My Holiday Clip.MP4"), "fake video bytes")],
            Some(&token(SECRET)),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notebook_triggered"], true);
    assert!(body["summary"].is_null());

    let messages: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m.as_str().unwrap())
        .collect();
    assert_eq!(messages.len(), 3);
    assert!(messages[0].starts_with("File saved at "));
    assert!(messages[0].ends_with("My_Holiday_Clip.MP4"));
    assert_eq!(messages[1], "Video uploaded & dataset updated!");
    assert_eq!(messages[2], "Notebook re-run triggered successfully!");

    let stored = app.upload_dir.join("My_Holiday_Clip.MP4");
    assert_eq!(std::fs::read(&stored).unwrap(), b"fake video bytes");

    let published = app.publisher.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1);
    assert!(published[0].is_absolute());
    assert!(published[0].ends_with("My_Holiday_Clip.MP4"));

    assert_eq!(
        *app.notebook.runs.lock().unwrap(),
        vec![NotebookRunMode::Fresh]
    );
}

#[tokio::test]
async fn test_second_upload_reuses_notebook_session() {
    let app = default_app();

    for name in ["a.mp4", "b.mov"] {
        let (status, _) = send(
            &app.router,
            upload_request(&[("file", Some(name), "v")], Some(&token(SECRET))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(
        *app.notebook.runs.lock().unwrap(),
        vec![NotebookRunMode::Fresh, NotebookRunMode::Reuse]
    );
}

#[tokio::test]
async fn test_dataset_failure_skips_notebook() {
    let app = build_app(
        FakePublisher {
            fail: true,
            ..Default::default()
        },
        FakeNotebook::default(),
        FakeSummarizer::default(),
        Some(SECRET),
    );

    let (status, body) = send(
        &app.router,
        upload_request(&[("file", Some("clip.avi"), "v")], Some(&token(SECRET))),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Dataset update failed.");
    assert!(app.notebook.runs.lock().unwrap().is_empty());
    // The stored file is kept
    assert_eq!(files_in(&app.upload_dir), vec!["clip.avi".to_string()]);
}

#[tokio::test]
async fn test_notebook_failure_still_returns_ok() {
    let app = build_app(
        FakePublisher::default(),
        FakeNotebook {
            fail: true,
            ..Default::default()
        },
        FakeSummarizer::default(),
        Some(SECRET),
    );

    let (status, body) = send(
        &app.router,
        upload_request(&[("file", Some("clip.mp4"), "v")], Some(&token(SECRET))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notebook_triggered"], false);
    assert_eq!(body["messages"][2], "Notebook run failed or did not complete.");
}

// =========================================================================
// Summary relay
// =========================================================================

#[tokio::test]
async fn test_output_callback_then_summary_poll() {
    let app = default_app();
    let bearer = token(SECRET);

    let (status, body) = send(&app.router, summary_request(&bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["summary"].is_null());

    let (status, body) = send(
        &app.router,
        output_request("output=snippet+one.+snippet+two.", &bearer),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "combined summary");

    // Reading does not clear it
    for _ in 0..2 {
        let (_, body) = send(&app.router, summary_request(&bearer)).await;
        assert_eq!(body["summary"], "combined summary");
    }

    // The next upload carries it too
    let (_, body) = send(
        &app.router,
        upload_request(&[("file", Some("c.mp4"), "v")], Some(&bearer)),
    )
    .await;
    assert_eq!(body["summary"], "combined summary");
}

#[tokio::test]
async fn test_output_callback_validation() {
    let app = default_app();
    let bearer = token(SECRET);

    let (status, _) = send(&app.router, output_request("output=", &bearer)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, output_request("other=value", &bearer)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app.router, output_request("output=%20%0A%20", &bearer)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Notebook output is empty");

    assert_eq!(app.summarizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_summarizer_timeout_maps_to_gateway_timeout() {
    let summarizer = FakeSummarizer::default();
    summarizer
        .replies
        .lock()
        .unwrap()
        .push_back(Err(BrowserError::Timeout {
            locator: "css `[data-testid=\"send-button\"]`".to_string(),
            waited_ms: 20_000,
        }
        .into()));
    let app = build_app(
        FakePublisher::default(),
        FakeNotebook::default(),
        summarizer,
        Some(SECRET),
    );
    let bearer = token(SECRET);

    let (status, body) = send(&app.router, output_request("output=text", &bearer)).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].is_string());

    let (_, body) = send(&app.router, summary_request(&bearer)).await;
    assert!(body["summary"].is_null());
}

// =========================================================================
// Health and middleware
// =========================================================================

#[tokio::test]
async fn test_health_sets_security_and_request_id_headers() {
    let app = default_app();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_ready_reports_unreachable_webdriver() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        Request::builder().uri("/ready").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["webdriver"]["status"], "error");
    assert_eq!(body["checks"]["directories"]["status"], "ok");
}

#[tokio::test]
async fn test_ready_never_writes_into_dataset_mirror() {
    let app = default_app();
    std::fs::create_dir_all(&app.mirror_dir).unwrap();
    *app.publisher.watch.lock().unwrap() = Some(app.mirror_dir.clone());

    let upload = {
        let router = app.router.clone();
        tokio::spawn(async move {
            send(
                &router,
                upload_request(&[("file", Some("clip.mp4"), "v")], Some(&token(SECRET))),
            )
            .await
        })
    };

    let mut checks = Vec::new();
    for _ in 0..50 {
        let router = app.router.clone();
        checks.push(tokio::spawn(async move {
            send(
                &router,
                Request::builder().uri("/ready").body(Body::empty()).unwrap(),
            )
            .await
        }));
    }
    for check in checks {
        check.await.unwrap();
    }

    let (status, _) = upload.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(app.publisher.seen.lock().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(&app.mirror_dir).unwrap().count(), 0);
}

// =========================================================================
// Timeouts and concurrency
// =========================================================================

#[tokio::test]
async fn test_request_timeout_returns_json_and_cycle_completes() {
    let app = build_app_with(
        FakePublisher::default(),
        FakeNotebook {
            delay: Duration::from_millis(800),
            ..Default::default()
        },
        FakeSummarizer::default(),
        Some(SECRET),
        |config| config.request_timeout = Duration::from_millis(300),
    );

    let (status, body) = send(
        &app.router,
        upload_request(&[("file", Some("clip.mp4"), "v")], Some(&token(SECRET))),
    )
    .await;

    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["error"], "Request timed out");

    // The detached cycle still finishes and counts the upload
    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(app.pipeline.upload_count(), 1);
    assert_eq!(
        *app.notebook.runs.lock().unwrap(),
        vec![NotebookRunMode::Fresh]
    );
}

#[tokio::test]
async fn test_concurrent_uploads_with_same_name_never_truncate() {
    let app = default_app();
    let first = "a".repeat(64 * 1024);
    let second = "b".repeat(64 * 1024);

    let mut handles = Vec::new();
    for content in [first.clone(), second.clone()] {
        let router = app.router.clone();
        handles.push(tokio::spawn(async move {
            send(
                &router,
                upload_request(
                    &[("file", Some("clip.mp4"), content.as_str())],
                    Some(&token(SECRET)),
                ),
            )
            .await
        }));
    }
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let stored = std::fs::read_to_string(app.upload_dir.join("clip.mp4")).unwrap();
    assert!(stored == first || stored == second);
    assert_eq!(files_in(&app.upload_dir), vec!["clip.mp4".to_string()]);

    for path in app.publisher.published.lock().unwrap().iter() {
        assert!(path.ends_with("clip.mp4"));
    }
}
