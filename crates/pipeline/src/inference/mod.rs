//! Inference adapter.
//!
//! [`InferenceAdapter::infer`] turns an image path into typed detections.
//! The detection model is expensive to construct; the adapter builds it on
//! first use through a [`ModelLoader`] and reuses it for every later call in
//! the process.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use eggbank_core::detection::Detection;
use eggbank_core::types::Timestamp;
use tokio::sync::OnceCell;

pub mod script;

pub use script::ScriptModelLoader;

/// Errors raised by the inference adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InferenceError {
    /// Model weights or the model process cannot be brought up, or the
    /// process was lost mid-request.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The image file is missing or cannot be decoded.
    #[error("Could not read image {path}: {reason}")]
    ImageUnreadable { path: PathBuf, reason: String },

    /// The model process answered with an error or a malformed reply.
    #[error("Inference backend error: {0}")]
    Backend(String),
}

/// A loaded detection model.
#[async_trait]
pub trait DetectionModel: Send + Sync {
    /// Run detection on one image. Class labels are already normalized.
    async fn detect(&self, image: &Path) -> Result<Vec<Detection>, InferenceError>;
}

/// Builds the detection model. Called at most once per successful load.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn DetectionModel>, InferenceError>;
}

/// Output of one inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutput {
    pub detections: Vec<Detection>,
    pub inference_timestamp: Timestamp,
}

/// Process-scoped inference adapter with a lazily loaded model.
pub struct InferenceAdapter {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn DetectionModel>>,
}

impl InferenceAdapter {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    /// Whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Detect objects in the image at `image`.
    pub async fn infer(&self, image: &Path) -> Result<InferenceOutput, InferenceError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                tracing::info!("Loading detection model");
                self.loader.load().await
            })
            .await?;

        ensure_readable(image).await?;

        let detections = model.detect(image).await?;
        Ok(InferenceOutput {
            detections,
            inference_timestamp: Utc::now(),
        })
    }
}

/// Check that the file exists and its header decodes as a supported image.
async fn ensure_readable(image: &Path) -> Result<(), InferenceError> {
    let path = image.to_path_buf();
    let probe = tokio::task::spawn_blocking(move || -> Result<(u32, u32), String> {
        image::ImageReader::open(&path)
            .map_err(|e| e.to_string())?
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .into_dimensions()
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| InferenceError::Backend(format!("image probe task failed: {e}")))?;

    probe.map(|_| ()).map_err(|reason| InferenceError::ImageUnreadable {
        path: image.to_path_buf(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use eggbank_core::detection::{BoundingBox, DetectionClass};

    use super::*;

    struct StaticModel;

    #[async_trait]
    impl DetectionModel for StaticModel {
        async fn detect(&self, _image: &Path) -> Result<Vec<Detection>, InferenceError> {
            Ok(vec![Detection {
                class: DetectionClass::Oocyte,
                confidence: 0.9,
                bbox: BoundingBox {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 1.0,
                    y2: 1.0,
                },
            }])
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: AtomicUsize,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn DetectionModel>, InferenceError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(StaticModel))
        }
    }

    struct MissingWeights;

    #[async_trait]
    impl ModelLoader for MissingWeights {
        async fn load(&self) -> Result<Arc<dyn DetectionModel>, InferenceError> {
            Err(InferenceError::ModelUnavailable("weights not found".into()))
        }
    }

    fn write_png(dir: &Path) -> PathBuf {
        let path = dir.join("frame.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn model_is_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(dir.path());
        let loader = Arc::new(CountingLoader::default());
        let adapter = InferenceAdapter::new(loader.clone());
        assert!(!adapter.is_loaded());

        for _ in 0..3 {
            let out = adapter.infer(&image).await.unwrap();
            assert_eq!(out.detections.len(), 1);
        }
        assert!(adapter.is_loaded());
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let adapter = InferenceAdapter::new(Arc::new(CountingLoader::default()));
        let err = adapter.infer(&path).await.unwrap_err();
        assert_matches!(err, InferenceError::ImageUnreadable { .. });
    }

    #[tokio::test]
    async fn missing_file_is_unreadable() {
        let adapter = InferenceAdapter::new(Arc::new(CountingLoader::default()));
        let err = adapter.infer(Path::new("/nonexistent/f.jpg")).await.unwrap_err();
        assert_matches!(err, InferenceError::ImageUnreadable { .. });
    }

    #[tokio::test]
    async fn missing_weights_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(dir.path());
        let adapter = InferenceAdapter::new(Arc::new(MissingWeights));
        let err = adapter.infer(&image).await.unwrap_err();
        assert_matches!(err, InferenceError::ModelUnavailable(_));
        assert!(!adapter.is_loaded());
    }
}
