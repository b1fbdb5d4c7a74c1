//! Coordinator configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoordinatorError, CoordinatorResult};

/// Per-phase time budgets for one retrain attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Hard ceiling on the training phase. The fit future is dropped when
    /// this expires and the attempt is recorded as aborted.
    /// Default: 30 minutes.
    pub max_retraining_time: Duration,

    /// Budget for fetching training and test data.
    /// Default: 2 minutes.
    pub fetch_timeout: Duration,

    /// Budget for the validation phase.
    /// Default: 5 minutes.
    pub validation_timeout: Duration,

    /// Budget for the deployment phase (artifact persist + pointer swap).
    /// Default: 1 minute.
    pub deploy_timeout: Duration,

    /// Optional JSONL file the attempt history is appended to, in
    /// addition to the in-memory log.
    pub history_path: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_retraining_time: Duration::from_secs(30 * 60),
            fetch_timeout: Duration::from_secs(2 * 60),
            validation_timeout: Duration::from_secs(5 * 60),
            deploy_timeout: Duration::from_secs(60),
            history_path: None,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> CoordinatorResult<()> {
        for (name, value) in [
            ("max_retraining_time", self.max_retraining_time),
            ("fetch_timeout", self.fetch_timeout),
            ("validation_timeout", self.validation_timeout),
            ("deploy_timeout", self.deploy_timeout),
        ] {
            if value.is_zero() {
                return Err(CoordinatorError::Configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoordinatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_training_budget_rejected() {
        let config = CoordinatorConfig {
            max_retraining_time: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
