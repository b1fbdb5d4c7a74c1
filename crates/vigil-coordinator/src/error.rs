//! Coordinator error types.

use thiserror::Error;
use vigil_types::CollabError;

/// Errors that halt the coordinator.
///
/// Ordinary attempt failures (fetch errors, rejections, watchdog aborts)
/// are recorded as attempt outcomes, not errors. Anything here means the
/// control loop can no longer run safely.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A collaborator failed in a way that is not attributable to one
    /// attempt.
    #[error("collaborator error: {0}")]
    Collab(#[from] CollabError),

    /// The registry failed outside an attempt's normal failure paths.
    #[error(transparent)]
    Registry(#[from] vigil_registry::RegistryError),

    /// Rollback after a failed deployment did not succeed. The serving
    /// state is unknown and a human must intervene.
    #[error("rollback after failed deployment did not succeed: {0}")]
    RollbackFailed(String),

    /// The single-flight invariant was violated: an attempt started while
    /// another was already marked in progress.
    #[error("retrain already in progress when attempt started")]
    InvariantViolated,

    /// The request queue was closed.
    #[error("request queue closed")]
    QueueClosed,

    /// Failed to append to the attempt history sink.
    #[error("history sink error: {0}")]
    History(#[from] std::io::Error),

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
