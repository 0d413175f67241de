#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use eggbank_core::detection::{BoundingBox, Detection, DetectionClass};
use eggbank_core::evaluation_status::ProcessingStatus;
use eggbank_db::blob::{BlobStore, LocalBlobStore};
use eggbank_db::models::evaluation_request::{FrameListItem, NewEvaluationRequest};
use eggbank_db::models::frame::NewFrame;
use eggbank_db::repositories::{EvaluationRequestRepo, FrameRepo};
use eggbank_db::store::{patch, DocumentStore, MemoryDocumentStore, PATIENTS, RETRIEVAL_BATCHES};
use eggbank_pipeline::batch::BatchProcessor;
use eggbank_pipeline::frame::FrameProcessor;
use eggbank_pipeline::inference::{DetectionModel, InferenceAdapter, InferenceError, ModelLoader};
use serde_json::json;

/// Model that takes `delay` per image and always sees a mature oocyte.
pub struct SlowModel {
    pub delay: Duration,
}

#[async_trait]
impl DetectionModel for SlowModel {
    async fn detect(&self, _image: &Path) -> Result<Vec<Detection>, InferenceError> {
        tokio::time::sleep(self.delay).await;
        let bbox = BoundingBox {
            x1: 0.0,
            y1: 0.0,
            x2: 5.0,
            y2: 5.0,
        };
        Ok(vec![
            Detection {
                class: DetectionClass::Oocyte,
                confidence: 0.95,
                bbox,
            },
            Detection {
                class: DetectionClass::PolarBody,
                confidence: 0.8,
                bbox,
            },
        ])
    }
}

struct Loader {
    model: Option<Arc<SlowModel>>,
}

#[async_trait]
impl ModelLoader for Loader {
    async fn load(&self) -> Result<Arc<dyn DetectionModel>, InferenceError> {
        match &self.model {
            Some(model) => Ok(model.clone()),
            None => Err(InferenceError::ModelUnavailable("no weights".to_string())),
        }
    }
}

pub struct Fixture {
    _dir: tempfile::TempDir,
    pub store: Arc<MemoryDocumentStore>,
    pub processor: BatchProcessor,
}

impl Fixture {
    /// A batch `b1` with `frames` decodable frames and an evaluation
    /// request listing them. `delay` is `None` for a missing model.
    pub async fn new(frames: usize, delay: Option<Duration>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(LocalBlobStore::new(dir.path()));
        let loader = Arc::new(Loader {
            model: delay.map(|delay| Arc::new(SlowModel { delay })),
        });
        let inference = Arc::new(InferenceAdapter::new(loader));
        let frame_processor = FrameProcessor::new(store.clone(), inference, "test-v1");
        let processor = BatchProcessor::new(store.clone(), blobs.clone(), frame_processor);

        store
            .set(PATIENTS, "p1", patch(json!({"fullName": "P", "role": "donor"})))
            .await
            .unwrap();
        store
            .set(
                RETRIEVAL_BATCHES,
                "b1",
                patch(json!({"patientId": "p1", "status": "processing"})),
            )
            .await
            .unwrap();

        let mut frame_list = Vec::new();
        for i in 0..frames {
            let frame_id = format!("f{i}");
            let frame_url = blobs.store("b1", &frame_id, &png_bytes()).await.unwrap();
            let input = NewFrame {
                batch_id: "b1".to_string(),
                patient_id: "p1".to_string(),
                uploaded_by: "staff1".to_string(),
                uploaded_at: Utc::now(),
                frame_url: frame_url.clone(),
            };
            FrameRepo::insert(store.as_ref(), &frame_id, &input).await.unwrap();
            frame_list.push(FrameListItem {
                frame_id,
                frame_url,
                status: ProcessingStatus::Pending,
            });
        }

        let now = Utc::now();
        EvaluationRequestRepo::create(
            store.as_ref(),
            &NewEvaluationRequest {
                batch_id: "b1".to_string(),
                initiated_by: "staff1".to_string(),
                created_at: now,
                updated_at: now,
                status: ProcessingStatus::Processing,
                frame_list,
            },
        )
        .await
        .unwrap();

        Self {
            _dir: dir,
            store,
            processor,
        }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn payload(&self, frames: usize) -> serde_json::Value {
        let ids: Vec<String> = (0..frames).map(|i| format!("f{i}")).collect();
        json!({"batchId": "b1", "frameIds": ids, "force": false})
    }
}

fn png_bytes() -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::RgbImage::new(4, 4)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
