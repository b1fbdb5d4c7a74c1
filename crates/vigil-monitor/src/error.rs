//! Error types for the vigil-monitor crate.

use thiserror::Error;
use vigil_types::CollabError;

/// Errors that can occur during monitoring.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A metric source call failed or timed out.
    #[error("metric source error: {0}")]
    MetricSource(#[from] CollabError),

    /// The supervisor was asked to start twice.
    #[error("supervisor already running")]
    AlreadyRunning,

    /// The request queue has been closed.
    #[error("request queue closed")]
    QueueClosed,

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
