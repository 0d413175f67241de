//! Detection through a real model subprocess speaking the line protocol.
//!
//! The model server is replaced by small `sh` scripts so the tests need no
//! Python environment.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{png_bytes, Harness};
use eggbank_core::detection::{Detection, DetectionClass};
use eggbank_core::evaluation_status::ProcessingStatus;
use eggbank_core::maturity::{classify, Maturity};
use eggbank_db::repositories::{BatchRepo, FrameRepo};
use eggbank_pipeline::config::PipelineConfig;
use eggbank_pipeline::inference::{
    InferenceAdapter, InferenceError, ModelLoader, ScriptModelLoader,
};
use eggbank_pipeline::PipelineError;
use tokio_util::sync::CancellationToken;

const MATURE_REPLY: &str = r#"{"detections": [{"label": "oocyte", "score": 0.9, "bbox": [0, 0, 4, 4]}, {"label": "polarbody", "score": 0.8, "bbox": [1, 1, 2, 2]}]}"#;
const IMMATURE_REPLY: &str =
    r#"{"detections": [{"label": "oocyte", "score": 0.9, "bbox": [0, 0, 4, 4]}]}"#;

/// Temporary model server: the script, dummy weights and two images.
struct ModelServer {
    dir: tempfile::TempDir,
}

impl ModelServer {
    /// `body` runs after the ready handshake, with requests on stdin.
    fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = format!("echo '{{\"ready\": true}}'\n{body}\n");
        std::fs::write(dir.path().join("server.sh"), script).unwrap();
        std::fs::write(dir.path().join("weights.pth"), b"weights").unwrap();
        for name in ["a.png", "b.png"] {
            std::fs::write(dir.path().join(name), png_bytes()).unwrap();
        }
        Self { dir }
    }

    fn loader(&self, request_timeout: Duration) -> Arc<dyn ModelLoader> {
        let config = PipelineConfig {
            model_path: self.dir.path().join("weights.pth"),
            python: "sh".into(),
            script: self.dir.path().join("server.sh"),
            device: "cpu".into(),
            request_timeout,
            ..PipelineConfig::default()
        };
        Arc::new(ScriptModelLoader::new(&config))
    }

    fn image(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn classes(detections: &[Detection]) -> Vec<DetectionClass> {
    detections.iter().map(|d| d.class).collect()
}

// ---------------------------------------------------------------------------
// Test: replies are matched to their requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_request_gets_its_own_reply() {
    let server = ModelServer::new(&format!(
        "read -r line\necho '{MATURE_REPLY}'\nread -r line\necho '{IMMATURE_REPLY}'\nread -r line"
    ));
    let adapter = InferenceAdapter::new(server.loader(Duration::from_secs(10)));

    let a = adapter.infer(&server.image("a.png")).await.unwrap();
    assert_eq!(
        classes(&a.detections),
        vec![DetectionClass::Oocyte, DetectionClass::PolarBody]
    );
    let b = adapter.infer(&server.image("b.png")).await.unwrap();
    assert_eq!(classify(&b.detections).maturity, Maturity::Mi);
}

// ---------------------------------------------------------------------------
// Test: a timed-out request never leaks its late reply into the next one
// ---------------------------------------------------------------------------

#[tokio::test]
async fn late_reply_is_not_taken_by_the_next_frame() {
    let server = ModelServer::new(&format!(
        "read -r line\nsleep 2\necho '{MATURE_REPLY}'\nwhile read -r line; do echo '{IMMATURE_REPLY}'; done"
    ));
    let adapter = InferenceAdapter::new(server.loader(Duration::from_millis(300)));

    let err = adapter.infer(&server.image("a.png")).await.unwrap_err();
    assert_matches!(err, InferenceError::ModelUnavailable(_));

    tokio::time::sleep(Duration::from_millis(2500)).await;

    // The mature reply meant for a.png must not surface as b.png's answer.
    let err = adapter.infer(&server.image("b.png")).await.unwrap_err();
    assert_matches!(err, InferenceError::ModelUnavailable(_));
}

// ---------------------------------------------------------------------------
// Test: a model process that exits is reported as unavailable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exited_process_is_unavailable_for_every_later_call() {
    let server = ModelServer::new(&format!("read -r line\necho '{IMMATURE_REPLY}'\nexit 0"));
    let adapter = InferenceAdapter::new(server.loader(Duration::from_secs(10)));

    adapter.infer(&server.image("a.png")).await.unwrap();
    for _ in 0..3 {
        let err = adapter.infer(&server.image("b.png")).await.unwrap_err();
        assert_matches!(err, InferenceError::ModelUnavailable(_));
    }
}

#[tokio::test]
async fn error_reply_keeps_the_process_usable() {
    let server = ModelServer::new(&format!(
        "read -r line\necho '{{\"error\": \"out of memory\"}}'\nwhile read -r line; do echo '{IMMATURE_REPLY}'; done"
    ));
    let adapter = InferenceAdapter::new(server.loader(Duration::from_secs(10)));

    let err = adapter.infer(&server.image("a.png")).await.unwrap_err();
    assert_matches!(err, InferenceError::Backend(_));
    let b = adapter.infer(&server.image("b.png")).await.unwrap();
    assert_eq!(classes(&b.detections), vec![DetectionClass::Oocyte]);
}

// ---------------------------------------------------------------------------
// Test: losing the model mid-batch stops the batch with a fatal error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn model_exit_mid_batch_is_fatal_and_spares_later_frames() {
    let server = ModelServer::new(&format!("read -r line\necho '{MATURE_REPLY}'\nexit 0"));
    let h = Harness::with_loader(server.loader(Duration::from_secs(10)));
    h.seed_batch("b1", "p1", "donor").await;
    for id in ["f1", "f2", "f3"] {
        h.add_frame("b1", id, Vec::new()).await;
    }

    let frame_ids: Vec<String> = ["f1", "f2", "f3"].map(String::from).to_vec();
    let err = h
        .processor
        .process_batch("b1", &frame_ids, true, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_fatal());
    assert_matches!(
        err,
        PipelineError::InferenceFailed { ref frame_id, source: InferenceError::ModelUnavailable(_) }
            if frame_id == "f2"
    );

    let f1 = FrameRepo::find_by_id(h.store(), "f1").await.unwrap().unwrap();
    assert_eq!(f1.maturity(), Some(Maturity::Mii));
    let f2 = FrameRepo::find_by_id(h.store(), "f2").await.unwrap().unwrap();
    assert!(f2.error.is_some());
    let f3 = FrameRepo::find_by_id(h.store(), "f3").await.unwrap().unwrap();
    assert!(f3.error.is_none());

    let batch = BatchRepo::find_by_id(h.store(), "b1").await.unwrap().unwrap();
    assert_eq!(batch.status, ProcessingStatus::Failed);
}
