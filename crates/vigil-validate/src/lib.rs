//! Candidate validation for VIGIL.
//!
//! A candidate model is accepted only if it clears four gates in order:
//! improvement over the baseline on every tracked metric, absolute metric
//! floors, output stability across repeated runs, and interface
//! compatibility. The report is attached to the audit trail whether or not
//! the candidate is accepted.

pub mod config;
pub mod error;
pub mod report;
pub mod validator;

pub use config::ValidationConfig;
pub use error::{ValidationError, ValidationResult};
pub use report::{GateFailure, ValidatorReport};
pub use validator::Validator;
