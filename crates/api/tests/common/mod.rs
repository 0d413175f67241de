#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use eggbank_api::config::ServerConfig;
use eggbank_api::middleware::actor::USER_ID_HEADER;
use eggbank_api::router::build_app_router;
use eggbank_api::state::AppState;
use eggbank_db::blob::LocalBlobStore;
use eggbank_db::store::{patch, DocumentStore, MemoryDocumentStore, PATIENTS, RETRIEVAL_BATCHES};
use eggbank_pipeline::queue::{EvaluationTask, QueueError, TaskHandle, TaskQueue};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 64 * 1024,
    }
}

/// Task queue that only counts what was enqueued.
#[derive(Default)]
pub struct CountingQueue {
    enqueued: AtomicUsize,
}

impl CountingQueue {
    pub fn count(&self) -> usize {
        self.enqueued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskQueue for CountingQueue {
    async fn enqueue(&self, task: EvaluationTask) -> Result<TaskHandle, QueueError> {
        let id = self.enqueued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TaskHandle {
            id: id.to_string(),
            name: task.name(),
        })
    }
}

pub struct TestApp {
    _dir: tempfile::TempDir,
    pub router: Router,
    pub store: Arc<MemoryDocumentStore>,
    pub queue: Arc<CountingQueue>,
}

/// Build the full application router over an in-memory store, a temporary
/// blob directory and a counting queue.
pub fn build_test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryDocumentStore::new());
    let queue = Arc::new(CountingQueue::default());
    let config = test_config();
    let state = AppState::new(
        store.clone(),
        Arc::new(LocalBlobStore::new(dir.path())),
        queue.clone(),
        config.clone(),
    );
    TestApp {
        _dir: dir,
        router: build_app_router(state, &config),
        store,
        queue,
    }
}

impl TestApp {
    pub async fn seed_batch(&self, batch_id: &str, patient_id: &str) {
        self.store
            .set(
                PATIENTS,
                patient_id,
                patch(json!({"fullName": "Test Patient", "role": "donor", "stage": "retrieval"})),
            )
            .await
            .unwrap();
        self.store
            .set(RETRIEVAL_BATCHES, batch_id, patch(json!({"patientId": patient_id})))
            .await
            .unwrap();
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Request with the caller header set.
pub fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, "staff1")
        .body(body)
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, value: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, "staff1")
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Leading bytes of a JPEG file.
pub const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
