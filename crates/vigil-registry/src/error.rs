//! Error types for the vigil-registry crate.

use thiserror::Error;
use vigil_types::VersionId;

/// Errors that can occur during artifact storage and version management.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested version is unknown or has been pruned.
    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    /// No retired version is available to roll back to.
    #[error("no retired version available for rollback")]
    NoRollbackTarget,

    /// The active version may not be deleted or demoted directly.
    #[error("version {0} is active and protected")]
    ActiveVersionProtected(VersionId),

    /// Only candidates can be promoted.
    #[error("version {id} has status {status}, expected candidate")]
    NotACandidate { id: VersionId, status: String },

    /// The artifact referenced by a version is missing from the store.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Metadata could not be serialized or parsed.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for RegistryError {
    fn from(e: std::io::Error) -> Self {
        RegistryError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(e: serde_json::Error) -> Self {
        RegistryError::Metadata(e.to_string())
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
