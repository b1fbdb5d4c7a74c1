//! Validation configuration.

use std::collections::HashMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Acceptance criteria for candidate models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Metrics the improvement gate compares candidate vs baseline on.
    /// Every listed metric must improve (AND semantics).
    pub tracked_metrics: Vec<String>,

    /// Minimum required improvement per tracked metric (0.0-1.0).
    pub improvement_threshold: f64,

    /// Absolute floors per metric, independent of the baseline.
    pub minimum_requirements: HashMap<String, f64>,

    /// Required agreement fraction across repeated prediction runs
    /// (0.0-1.0).
    pub stability_threshold: f64,

    /// Number of repeated prediction runs for the stability gate.
    /// Default 5.
    pub stability_runs: u32,

    /// Interface/schema version the serving environment expects.
    pub expected_schema_version: Version,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tracked_metrics: vec!["accuracy".to_string()],
            improvement_threshold: 0.01,
            minimum_requirements: HashMap::new(),
            stability_threshold: 0.95,
            stability_runs: 5,
            expected_schema_version: Version::new(1, 0, 0),
        }
    }
}

impl ValidationConfig {
    /// Validate ranges. Called once at startup.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.tracked_metrics.is_empty() {
            return Err(ValidationError::Configuration(
                "tracked_metrics must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.improvement_threshold) {
            return Err(ValidationError::Configuration(format!(
                "improvement_threshold must be within 0.0-1.0, got {}",
                self.improvement_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.stability_threshold) {
            return Err(ValidationError::Configuration(format!(
                "stability_threshold must be within 0.0-1.0, got {}",
                self.stability_threshold
            )));
        }
        if self.stability_runs == 0 {
            return Err(ValidationError::Configuration(
                "stability_runs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ValidationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_tracked_metrics() {
        let config = ValidationConfig {
            tracked_metrics: Vec::new(),
            ..ValidationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_stability() {
        let config = ValidationConfig {
            stability_threshold: 1.2,
            ..ValidationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_stability_runs() {
        let config = ValidationConfig {
            stability_runs: 0,
            ..ValidationConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
