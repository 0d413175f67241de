//! Frame upload and deletion.

use std::sync::Arc;

use chrono::Utc;
use eggbank_core::error::CoreError;
use eggbank_core::types::DocId;
use eggbank_db::blob::BlobStore;
use eggbank_db::models::frame::NewFrame;
use eggbank_db::repositories::{BatchRepo, FrameRepo};
use eggbank_db::store::DocumentStore;
use image::ImageFormat;
use serde::Serialize;

use crate::error::PipelineError;

/// Result of [`FrameIntake::upload_frame`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFrame {
    pub id: DocId,
    pub batch_id: DocId,
    pub patient_id: DocId,
    #[serde(rename = "frameURL")]
    pub frame_url: String,
}

/// Result of [`FrameIntake::delete_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeletion {
    pub frames_deleted: u32,
    pub blobs_deleted: u32,
}

#[derive(Clone)]
pub struct FrameIntake {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl FrameIntake {
    pub fn new(store: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { store, blobs }
    }

    /// Store an uploaded JPEG or PNG image as a new frame of the batch.
    ///
    /// The frame carries no results until the batch is evaluated.
    pub async fn upload_frame(
        &self,
        batch_id: &str,
        uploaded_by: &str,
        bytes: &[u8],
    ) -> Result<UploadedFrame, PipelineError> {
        check_format(bytes)?;
        let store = self.store.as_ref();
        let batch = BatchRepo::find_by_id(store, batch_id)
            .await?
            .ok_or_else(|| PipelineError::BatchNotFound(batch_id.to_string()))?;

        let frame_id = uuid::Uuid::new_v4().simple().to_string();
        let frame_url = self.blobs.store(batch_id, &frame_id, bytes).await?;

        let input = NewFrame {
            batch_id: batch_id.to_string(),
            patient_id: batch.patient_id.clone(),
            uploaded_by: uploaded_by.to_string(),
            uploaded_at: Utc::now(),
            frame_url: frame_url.clone(),
        };
        if let Err(e) = FrameRepo::insert(store, &frame_id, &input).await {
            if let Err(cleanup) = self.blobs.delete(&frame_url).await {
                tracing::warn!(path = %frame_url, error = %cleanup, "Failed to remove orphaned blob");
            }
            return Err(e.into());
        }

        tracing::info!(batch_id, frame_id = %frame_id, size = bytes.len(), "Frame uploaded");
        Ok(UploadedFrame {
            id: frame_id,
            batch_id: batch_id.to_string(),
            patient_id: batch.patient_id,
            frame_url,
        })
    }

    /// Delete a frame and its image.
    pub async fn delete_frame(&self, frame_id: &str) -> Result<(), PipelineError> {
        let store = self.store.as_ref();
        let frame = FrameRepo::find_by_id(store, frame_id)
            .await?
            .ok_or_else(|| PipelineError::FrameNotFound(frame_id.to_string()))?;

        self.remove_blob(&frame.frame_url).await;
        FrameRepo::delete(store, frame_id).await?;
        tracing::info!(frame_id, batch_id = %frame.batch_id, "Frame deleted");
        Ok(())
    }

    /// Delete a batch together with its frames and their images. The
    /// batch's evaluation request is kept.
    pub async fn delete_batch(&self, batch_id: &str) -> Result<BatchDeletion, PipelineError> {
        let store = self.store.as_ref();
        if BatchRepo::find_by_id(store, batch_id).await?.is_none() {
            return Err(PipelineError::BatchNotFound(batch_id.to_string()));
        }

        let mut deletion = BatchDeletion::default();
        for frame in FrameRepo::list_by_batch(store, batch_id).await? {
            if self.remove_blob(&frame.frame_url).await {
                deletion.blobs_deleted += 1;
            }
            if FrameRepo::delete(store, &frame.id).await? {
                deletion.frames_deleted += 1;
            }
        }
        BatchRepo::delete(store, batch_id).await?;

        tracing::info!(
            batch_id,
            frames_deleted = deletion.frames_deleted,
            blobs_deleted = deletion.blobs_deleted,
            "Batch deleted",
        );
        Ok(deletion)
    }

    /// Remove a frame image, logging rather than failing. Returns whether a
    /// blob was removed.
    async fn remove_blob(&self, path: &str) -> bool {
        if path.is_empty() {
            return false;
        }
        match self.blobs.delete(path).await {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to delete frame blob");
                false
            }
        }
    }
}

fn check_format(bytes: &[u8]) -> Result<(), CoreError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg | ImageFormat::Png) => Ok(()),
        Ok(other) => Err(CoreError::Validation(format!(
            "Unsupported image format {other:?}; expected JPEG or PNG"
        ))),
        Err(_) => Err(CoreError::Validation(
            "Invalid file format; expected JPEG or PNG".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
