#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use eggbank_core::detection::{BoundingBox, Detection, DetectionClass};
use eggbank_db::blob::{BlobStore, LocalBlobStore};
use eggbank_db::models::frame::NewFrame;
use eggbank_db::repositories::FrameRepo;
use eggbank_db::store::{patch, DocumentStore, MemoryDocumentStore, PATIENTS, RETRIEVAL_BATCHES};
use eggbank_pipeline::batch::{BatchProcessor, BatchReport};
use eggbank_pipeline::frame::FrameProcessor;
use eggbank_pipeline::inference::{DetectionModel, InferenceAdapter, InferenceError, ModelLoader};
use eggbank_pipeline::orchestrator::EvaluationOrchestrator;
use eggbank_pipeline::queue::{EvaluationTask, QueueError, TaskHandle, TaskQueue};
use eggbank_pipeline::status::StatusReporter;
use eggbank_pipeline::PipelineError;
use serde_json::json;
use tokio_util::sync::CancellationToken;

pub const MODEL_VERSION: &str = "test-v1";

// ---------------------------------------------------------------------------
// Detection fixtures
// ---------------------------------------------------------------------------

fn detection(class: DetectionClass) -> Detection {
    Detection {
        class,
        confidence: 0.9,
        bbox: BoundingBox {
            x1: 1.0,
            y1: 1.0,
            x2: 10.0,
            y2: 10.0,
        },
    }
}

/// Oocyte with a polar body: classified MII.
pub fn mature() -> Vec<Detection> {
    vec![
        detection(DetectionClass::Oocyte),
        detection(DetectionClass::PolarBody),
    ]
}

/// Oocyte only: classified MI.
pub fn immature() -> Vec<Detection> {
    vec![detection(DetectionClass::Oocyte)]
}

// ---------------------------------------------------------------------------
// Fake detection model
// ---------------------------------------------------------------------------

/// Model answering per frame id (the blob file stem). Frames without a
/// scripted answer are immature.
#[derive(Default)]
pub struct FakeModel {
    answers: Mutex<HashMap<String, Vec<Detection>>>,
    calls: AtomicUsize,
}

impl FakeModel {
    pub fn answer(&self, frame_id: &str, detections: Vec<Detection>) {
        self.answers
            .lock()
            .unwrap()
            .insert(frame_id.to_string(), detections);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionModel for FakeModel {
    async fn detect(&self, image: &Path) -> Result<Vec<Detection>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(&stem)
            .cloned()
            .unwrap_or_else(immature))
    }
}

pub struct FakeLoader {
    model: Arc<FakeModel>,
    available: bool,
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(&self) -> Result<Arc<dyn DetectionModel>, InferenceError> {
        if self.available {
            Ok(self.model.clone())
        } else {
            Err(InferenceError::ModelUnavailable(
                "weights not found: models/missing.pth".to_string(),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Recording task queue
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<EvaluationTask>>,
    next_id: AtomicUsize,
}

impl RecordingQueue {
    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn drain(&self) -> Vec<EvaluationTask> {
        std::mem::take(&mut *self.tasks.lock().unwrap())
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, task: EvaluationTask) -> Result<TaskHandle, QueueError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let name = task.name();
        self.tasks.lock().unwrap().push(task);
        Ok(TaskHandle {
            id: id.to_string(),
            name,
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    _dir: tempfile::TempDir,
    pub store: Arc<MemoryDocumentStore>,
    pub blobs: Arc<LocalBlobStore>,
    pub queue: Arc<RecordingQueue>,
    pub model: Arc<FakeModel>,
    pub processor: BatchProcessor,
    pub orchestrator: EvaluationOrchestrator,
    pub reporter: StatusReporter,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_model(true)
    }

    /// Harness whose model loader always fails.
    pub fn without_model() -> Self {
        Self::with_model(false)
    }

    /// Harness running detection through `loader` instead of the fake
    /// model.
    pub fn with_loader(loader: Arc<dyn ModelLoader>) -> Self {
        Self::build(loader, Arc::new(FakeModel::default()))
    }

    fn with_model(available: bool) -> Self {
        let model = Arc::new(FakeModel::default());
        let loader = Arc::new(FakeLoader {
            model: model.clone(),
            available,
        });
        Self::build(loader, model)
    }

    fn build(loader: Arc<dyn ModelLoader>, model: Arc<FakeModel>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(LocalBlobStore::new(dir.path()));
        let queue = Arc::new(RecordingQueue::default());

        let inference = Arc::new(InferenceAdapter::new(loader));
        let frames = FrameProcessor::new(store.clone(), inference, MODEL_VERSION);
        let processor = BatchProcessor::new(store.clone(), blobs.clone(), frames);
        let orchestrator = EvaluationOrchestrator::new(store.clone(), queue.clone());
        let reporter = StatusReporter::new(store.clone());

        Self {
            _dir: dir,
            store,
            blobs,
            queue,
            model,
            processor,
            orchestrator,
            reporter,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Create a patient with `role` and a batch for them.
    pub async fn seed_batch(&self, batch_id: &str, patient_id: &str, role: &str) {
        self.store
            .set(
                PATIENTS,
                patient_id,
                patch(json!({"fullName": "Test Patient", "role": role, "stage": "retrieval"})),
            )
            .await
            .unwrap();
        self.store
            .set(
                RETRIEVAL_BATCHES,
                batch_id,
                patch(json!({
                    "patientId": patient_id,
                    "createdBy": "staff1",
                    "createdAt": Utc::now(),
                    "status": "pending",
                    "eligibilityStatus": "pending",
                })),
            )
            .await
            .unwrap();
    }

    /// Add a frame with a decodable image whose model answer is `detections`.
    pub async fn add_frame(&self, batch_id: &str, frame_id: &str, detections: Vec<Detection>) {
        self.model.answer(frame_id, detections);
        self.add_frame_bytes(batch_id, frame_id, &png_bytes()).await;
    }

    /// Add a frame whose stored image cannot be decoded.
    pub async fn add_unreadable_frame(&self, batch_id: &str, frame_id: &str) {
        self.add_frame_bytes(batch_id, frame_id, b"not an image").await;
    }

    async fn add_frame_bytes(&self, batch_id: &str, frame_id: &str, bytes: &[u8]) {
        let frame_url = self.blobs.store(batch_id, frame_id, bytes).await.unwrap();
        let input = NewFrame {
            batch_id: batch_id.to_string(),
            patient_id: "p1".to_string(),
            uploaded_by: "staff1".to_string(),
            uploaded_at: Utc::now(),
            frame_url,
        };
        FrameRepo::insert(self.store(), frame_id, &input).await.unwrap();
    }

    /// Run every queued task to completion, as a worker would.
    pub async fn run_queued(&self) -> Vec<Result<BatchReport, PipelineError>> {
        let mut results = Vec::new();
        for task in self.queue.drain() {
            let EvaluationTask::ProcessBatch(args) = task;
            let stop = CancellationToken::new();
            results.push(
                self.processor
                    .process_batch(&args.batch_id, &args.frame_ids, args.force, &stop)
                    .await,
            );
        }
        results
    }
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::new(8, 8)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
