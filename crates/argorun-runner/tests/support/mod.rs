use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures_util::StreamExt;
use serde_json::{Value, json};
use tar::{Builder, EntryType, Header};
use tokio::task::JoinHandle;

use argorun_core::{LogLevel, MetricsSink, ObjectStore, RunOutcome, StoreError, TaskSink};
use argorun_model::S3ArtifactConfig;
use argorun_runner::RunnerConfig;

pub const ACCESS_TOKEN: &str = "test-token";
pub const WORKFLOW_NAME: &str = "container-runner-x7f2k";

pub fn runner_config(base_url: &str) -> RunnerConfig {
    RunnerConfig {
        base_url: base_url.to_string(),
        access_token: ACCESS_TOKEN.into(),
        execution_namespace: "argo-workflows".into(),
        service_account_name: "service-account-2".into(),
        executor_service_account_name: "service-account".into(),
        workflow_pod_annotations: None,
        artifact_s3_config: S3ArtifactConfig {
            bucket: "test-bucket".into(),
            endpoint: "s3.local".into(),
            use_sdk_creds: false,
        },
        allowed_images: vec!["^my-image$".into()],
    }
}

/// In-memory object store that can impersonate the workflow engine by
/// producing an output archive whenever an input archive is uploaded.
pub struct MemoryStore {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub puts: Mutex<Vec<String>>,
    pub gets: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<Vec<String>>>,
    simulate_outputs: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            puts: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            simulate_outputs: false,
        }
    }

    pub fn with_engine_outputs() -> Self {
        Self {
            simulate_outputs: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, _bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.puts.lock().unwrap().push(key.to_string());
        let mut objects = self.objects.lock().unwrap();
        objects.insert(key.to_string(), body);
        if self.simulate_outputs && key.contains("/input-") {
            let output_key = key.replace("/input-", "/output-");
            objects.insert(output_key, engine_output_archive());
        }
        Ok(())
    }

    async fn get(&self, _bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.gets.lock().unwrap().push(key.to_string());
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::Backend(format!("no such key: {key}")))
    }

    async fn delete_batch(&self, _bucket: &str, keys: &[String]) -> Result<(), StoreError> {
        self.deletes.lock().unwrap().push(keys.to_vec());
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}

/// Output archive the way the engine produces it: everything wrapped in one
/// top-level directory, marker file included.
pub fn engine_output_archive() -> Bytes {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);

    let mut file = Header::new_gnu();
    file.set_entry_type(EntryType::Regular);
    file.set_size(4);
    file.set_mode(0o644);
    file.set_cksum();
    builder
        .append_data(&mut file, "out/result.txt", "done".as_bytes())
        .unwrap();

    let mut marker = Header::new_gnu();
    marker.set_entry_type(EntryType::Regular);
    marker.set_size(0);
    marker.set_mode(0o644);
    marker.set_cksum();
    builder
        .append_data(&mut marker, "out/__argo-tmp/__argo-tmp", std::io::empty())
        .unwrap();

    Bytes::from(builder.into_inner().unwrap().finish().unwrap())
}

#[derive(Default)]
pub struct RecordingSink {
    pub lines: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    pub fn contains(&self, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl TaskSink for RecordingSink {
    fn line(&self, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

#[derive(Default)]
pub struct CountingMetrics {
    pub running: AtomicI64,
    pub started: AtomicUsize,
    pub observations: Mutex<Vec<(String, RunOutcome, Duration)>>,
}

impl MetricsSink for CountingMetrics {
    fn inc_running(&self, _image: &str) {
        self.running.fetch_add(1, Ordering::SeqCst);
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn dec_running(&self, _image: &str) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }

    fn observe_run(&self, image: &str, outcome: RunOutcome, elapsed: Duration) {
        self.observations
            .lock()
            .unwrap()
            .push((image.to_string(), outcome, elapsed));
    }
}

/// Behavior and call counters of the mock workflow server.
pub struct MockState {
    pub fail_submission: bool,
    pub stall_events: bool,
    pub phase: String,
    pub message: Option<String>,
    pub submissions: AtomicUsize,
    pub status_requests: AtomicUsize,
    pub log_requests: AtomicUsize,
    pub event_requests: AtomicUsize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            fail_submission: false,
            stall_events: false,
            phase: "Succeeded".into(),
            message: None,
            submissions: AtomicUsize::new(0),
            status_requests: AtomicUsize::new(0),
            log_requests: AtomicUsize::new(0),
            event_requests: AtomicUsize::new(0),
        }
    }
}

impl MockState {
    pub fn finishing_in(phase: &str, message: &str) -> Self {
        Self {
            phase: phase.into(),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn rejecting_submissions() -> Self {
        Self {
            fail_submission: true,
            ..Self::default()
        }
    }

    pub fn with_stalled_events() -> Self {
        Self {
            stall_events: true,
            ..Self::default()
        }
    }
}

pub struct MockArgo {
    pub url: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockArgo {
    pub async fn start(state: MockState) -> Self {
        let state = Arc::new(state);
        let app = Router::new()
            .route("/api/v1/workflows/{namespace}", post(create_workflow))
            .route("/api/v1/workflows/{namespace}/{name}", get(workflow_status))
            .route("/api/v1/workflows/{namespace}/{name}/log", get(stream_logs))
            .route("/api/v1/stream/events/{namespace}", get(stream_events))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            handle,
        }
    }
}

impl Drop for MockArgo {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_workflow(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.submissions.fetch_add(1, Ordering::SeqCst);

    let expected = format!("Bearer {ACCESS_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return (StatusCode::FORBIDDEN, "forbidden").into_response();
    }
    if state.fail_submission {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "something went wrong: manifest rejected",
        )
            .into_response();
    }
    Json(json!({ "metadata": { "name": WORKFLOW_NAME } })).into_response()
}

async fn workflow_status(State(state): State<Arc<MockState>>) -> Json<Value> {
    state.status_requests.fetch_add(1, Ordering::SeqCst);
    let mut status = json!({ "phase": state.phase });
    if let Some(message) = &state.message {
        status["message"] = json!(message);
    }
    Json(json!({ "status": status }))
}

async fn stream_logs(State(state): State<Arc<MockState>>) -> Body {
    state.log_requests.fetch_add(1, Ordering::SeqCst);
    // delay long enough for the event subscription to deliver first
    let stream = futures_util::stream::once(async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok::<_, Infallible>(Bytes::from_static(
            concat!(
                "data: {\"result\":{\"content\":\"hello from the job\"}}\n",
                "data: {\"result\":{\"content\":\"\"}}\n",
                "data: {\"result\":{\"content\":\"all done\"}}\n",
            )
            .as_bytes(),
        ))
    });
    Body::from_stream(stream)
}

async fn stream_events(State(state): State<Arc<MockState>>) -> Body {
    state.event_requests.fetch_add(1, Ordering::SeqCst);
    if state.stall_events {
        // accept the connection but never produce response headers
        futures_util::future::pending::<()>().await;
    }
    let first = futures_util::stream::once(async {
        Ok::<_, Infallible>(Bytes::from_static(
            concat!(
                "data: {\"result\":{\"type\":\"Normal\",\"reason\":\"Started\",",
                "\"message\":\"Started container main\"}}\n",
                "data: {\"result\":{\"type\":\"Warning\",\"reason\":\"BackOff\",",
                "\"message\":\"restart pending\"}}\n",
            )
            .as_bytes(),
        ))
    });
    // stay open until the subscriber hangs up, like a real watch stream
    Body::from_stream(first.chain(futures_util::stream::pending()))
}
