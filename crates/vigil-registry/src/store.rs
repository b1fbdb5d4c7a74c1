//! Artifact storage backends.
//!
//! Artifacts are stored under a key derived from the version id, together
//! with a small metadata record. The filesystem backend writes into a
//! temporary location and renames into place; an artifact is either fully
//! present or absent, never half-written.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use vigil_types::{ArtifactRef, ModelArtifact, VersionId};

use crate::error::{RegistryError, RegistryResult};

/// Durable storage for model artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist an artifact under the version's key.
    async fn write(
        &self,
        version_id: &VersionId,
        artifact: &ModelArtifact,
    ) -> RegistryResult<ArtifactRef>;

    /// Load an artifact.
    async fn read(&self, artifact_ref: &ArtifactRef) -> RegistryResult<ModelArtifact>;

    /// Delete an artifact.
    async fn delete(&self, artifact_ref: &ArtifactRef) -> RegistryResult<()>;

    /// List all stored artifact refs.
    async fn list(&self) -> RegistryResult<Vec<ArtifactRef>>;
}

/// In-memory implementation for development and tests.
#[derive(Default)]
pub struct InMemoryArtifactStore {
    artifacts: DashMap<String, ModelArtifact>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn write(
        &self,
        version_id: &VersionId,
        artifact: &ModelArtifact,
    ) -> RegistryResult<ArtifactRef> {
        let key = version_id.as_uuid().to_string();
        self.artifacts.insert(key.clone(), artifact.clone());
        Ok(ArtifactRef::new(key))
    }

    async fn read(&self, artifact_ref: &ArtifactRef) -> RegistryResult<ModelArtifact> {
        self.artifacts
            .get(artifact_ref.as_str())
            .map(|entry| entry.clone())
            .ok_or_else(|| RegistryError::ArtifactNotFound(artifact_ref.to_string()))
    }

    async fn delete(&self, artifact_ref: &ArtifactRef) -> RegistryResult<()> {
        self.artifacts
            .remove(artifact_ref.as_str())
            .map(|_| ())
            .ok_or_else(|| RegistryError::ArtifactNotFound(artifact_ref.to_string()))
    }

    async fn list(&self) -> RegistryResult<Vec<ArtifactRef>> {
        Ok(self
            .artifacts
            .iter()
            .map(|entry| ArtifactRef::new(entry.key().clone()))
            .collect())
    }
}

/// Metadata record stored alongside each artifact.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactMetadata {
    schema_version: Version,
    written_at: DateTime<Utc>,
}

/// Filesystem-backed artifact store.
///
/// Layout: one directory per version id containing `model.bin` and
/// `metadata.json`. Writes go to a hidden staging directory first and are
/// renamed into place.
pub struct FsArtifactStore {
    root: PathBuf,
}

const MODEL_FILE: &str = "model.bin";
const METADATA_FILE: &str = "metadata.json";

impl FsArtifactStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> RegistryResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn dir_for(&self, artifact_ref: &ArtifactRef) -> PathBuf {
        self.root.join(artifact_ref.as_str())
    }

    fn staging_dir(&self, key: &str) -> PathBuf {
        self.root.join(format!(".staging-{}", key))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    #[instrument(skip(self, artifact), fields(version = %version_id))]
    async fn write(
        &self,
        version_id: &VersionId,
        artifact: &ModelArtifact,
    ) -> RegistryResult<ArtifactRef> {
        let key = version_id.as_uuid().to_string();
        let staging = self.staging_dir(&key);
        let finalized = self.root.join(&key);

        tokio::fs::create_dir_all(&staging).await?;
        tokio::fs::write(staging.join(MODEL_FILE), &artifact.bytes).await?;

        let metadata = ArtifactMetadata {
            schema_version: artifact.schema_version.clone(),
            written_at: Utc::now(),
        };
        tokio::fs::write(
            staging.join(METADATA_FILE),
            serde_json::to_vec_pretty(&metadata)?,
        )
        .await?;

        // Write-new-then-rename: the final path appears atomically.
        tokio::fs::rename(&staging, &finalized).await?;
        debug!(path = %finalized.display(), "artifact written");

        Ok(ArtifactRef::new(key))
    }

    async fn read(&self, artifact_ref: &ArtifactRef) -> RegistryResult<ModelArtifact> {
        let dir = self.dir_for(artifact_ref);
        if !dir.is_dir() {
            return Err(RegistryError::ArtifactNotFound(artifact_ref.to_string()));
        }

        let bytes = tokio::fs::read(dir.join(MODEL_FILE)).await?;
        let metadata_bytes = tokio::fs::read(dir.join(METADATA_FILE)).await?;
        let metadata: ArtifactMetadata = serde_json::from_slice(&metadata_bytes)?;

        Ok(ModelArtifact::new(bytes, metadata.schema_version))
    }

    async fn delete(&self, artifact_ref: &ArtifactRef) -> RegistryResult<()> {
        let dir = self.dir_for(artifact_ref);
        if !dir.is_dir() {
            return Err(RegistryError::ArtifactNotFound(artifact_ref.to_string()));
        }
        tokio::fs::remove_dir_all(dir).await?;
        Ok(())
    }

    async fn list(&self) -> RegistryResult<Vec<ArtifactRef>> {
        let mut refs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await?.is_dir() && !name.starts_with('.') {
                refs.push(ArtifactRef::new(name));
            }
        }
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(tag: u8) -> ModelArtifact {
        ModelArtifact::new(vec![tag, tag, tag], Version::new(1, 0, 0))
    }

    #[tokio::test]
    async fn test_in_memory_roundtrip() {
        let store = InMemoryArtifactStore::new();
        let id = VersionId::generate();

        let artifact_ref = store.write(&id, &artifact(7)).await.unwrap();
        let loaded = store.read(&artifact_ref).await.unwrap();
        assert_eq!(loaded.bytes, vec![7, 7, 7]);

        store.delete(&artifact_ref).await.unwrap();
        assert!(store.read(&artifact_ref).await.is_err());
    }

    #[tokio::test]
    async fn test_in_memory_list() {
        let store = InMemoryArtifactStore::new();
        store.write(&VersionId::generate(), &artifact(1)).await.unwrap();
        store.write(&VersionId::generate(), &artifact(2)).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fs_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::open(dir.path()).await.unwrap();
        let id = VersionId::generate();

        let artifact_ref = store.write(&id, &artifact(9)).await.unwrap();
        let loaded = store.read(&artifact_ref).await.unwrap();
        assert_eq!(loaded.bytes, vec![9, 9, 9]);
        assert_eq!(loaded.schema_version, Version::new(1, 0, 0));
    }

    #[tokio::test]
    async fn test_fs_list_skips_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::open(dir.path()).await.unwrap();

        store.write(&VersionId::generate(), &artifact(1)).await.unwrap();
        std::fs::create_dir(dir.path().join(".staging-leftover")).unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fs_delete_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::open(dir.path()).await.unwrap();

        let missing = ArtifactRef::new("does-not-exist");
        assert!(matches!(
            store.delete(&missing).await,
            Err(RegistryError::ArtifactNotFound(_))
        ));
    }
}
