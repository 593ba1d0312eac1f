//! Artifact Store
//!
//! Opaque storage for generated images. The pipeline only handles locations
//! (strings), never cares where they point. `LocalArtifactStore` keeps a
//! `raw/` and an `optimized/` directory under one root; both files for a
//! generation share the same basename, which is what the record id is
//! derived from.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};

/// Stores raw and optimized artifacts and reads them back by location.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store raw generated image bytes; returns the raw location.
    async fn store_raw(&self, basename: &str, bytes: &[u8]) -> PipelineResult<String>;

    /// Store optimized image bytes; returns the optimized location.
    async fn store_optimized(&self, basename: &str, bytes: &[u8]) -> PipelineResult<String>;

    /// Read an artifact back by its location.
    async fn read(&self, location: &str) -> PipelineResult<Vec<u8>>;
}

/// Filesystem-backed artifact store.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn store(&self, subdir: &str, basename: &str, bytes: &[u8]) -> PipelineResult<String> {
        if basename.contains(['/', '\\']) {
            return Err(PipelineError::artifact(format!(
                "basename must not contain path separators: {}",
                basename
            )));
        }
        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(basename);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "stored artifact");
        Ok(path.to_string_lossy().into_owned())
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store_raw(&self, basename: &str, bytes: &[u8]) -> PipelineResult<String> {
        self.store("raw", basename, bytes).await
    }

    async fn store_optimized(&self, basename: &str, bytes: &[u8]) -> PipelineResult<String> {
        self.store("optimized", basename, bytes).await
    }

    async fn read(&self, location: &str) -> PipelineResult<Vec<u8>> {
        let path = Path::new(location);
        Ok(tokio::fs::read(path).await?)
    }
}
