//! Error types for the vigil-validate crate.

use thiserror::Error;
use vigil_types::CollabError;

/// Errors that can occur while validating a candidate.
///
/// A rejected candidate is not an error; rejection is reported through
/// `ValidatorReport`. These errors mean validation itself could not run.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The trainer collaborator failed during evaluate/predict.
    #[error("trainer call failed during validation: {0}")]
    Trainer(#[from] CollabError),

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;
