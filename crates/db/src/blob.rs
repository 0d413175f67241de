//! Blob store collaborator for uploaded frame images.
//!
//! Paths handed out by the store are relative (`{batchId}/{frameId}.jpg`)
//! and are resolved against the configured storage root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::StoreError;

/// Prefix used by older records that stored `storage/{batch}/{frame}.jpg`.
const LEGACY_PREFIX: &str = "storage/";

/// File extension for stored frames.
const FRAME_EXTENSION: &str = "jpg";

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist image bytes for a frame. Returns the relative path.
    async fn store(&self, batch_id: &str, frame_id: &str, bytes: &[u8]) -> Result<String, StoreError>;

    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Delete a blob. Returns `false` if it did not exist.
    async fn delete(&self, path: &str) -> Result<bool, StoreError>;

    /// Absolute filesystem path for a relative blob path.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError>;
}

/// Blob store on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Validate a relative blob path: no absolute paths, no `..`, no empty
/// segments. Strips the legacy `storage/` prefix.
fn sanitize(path: &str) -> Result<&Path, StoreError> {
    let trimmed = path.strip_prefix(LEGACY_PREFIX).unwrap_or(path);
    let rel = Path::new(trimmed);
    let valid = !trimmed.is_empty()
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(rel)
    } else {
        Err(StoreError::InvalidBlobPath(path.to_string()))
    }
}

fn segment(value: &str) -> Result<&str, StoreError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(value)
    } else {
        Err(StoreError::InvalidBlobPath(value.to_string()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, batch_id: &str, frame_id: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let relative = format!(
            "{}/{}.{FRAME_EXTENSION}",
            segment(batch_id)?,
            segment(frame_id)?
        );
        let absolute = self.root.join(&relative);
        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&absolute, bytes).await?;
        tracing::debug!(path = %relative, size = bytes.len(), "Stored frame blob");
        Ok(relative)
    }

    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.resolve(path)?).await?)
    }

    async fn delete(&self, path: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.resolve(path)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(sanitize(path)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
