//! The acceptance gate.
//!
//! Gates run in order and stop at the first failing gate, but candidate
//! and baseline metrics are always evaluated first so every report carries
//! the full picture for audit.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};
use vigil_types::{Dataset, ModelArtifact, ModelTrainer};

use crate::config::ValidationConfig;
use crate::error::ValidationResult;
use crate::report::{GateFailure, ValidatorReport};

/// Compares a candidate model against the serving baseline.
pub struct Validator {
    trainer: Arc<dyn ModelTrainer>,
    config: ValidationConfig,
}

impl Validator {
    pub fn new(trainer: Arc<dyn ModelTrainer>, config: ValidationConfig) -> Self {
        Self { trainer, config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Run all gates against the candidate.
    ///
    /// Returns `Err` only when a collaborator call fails; a rejected
    /// candidate is an `Ok` report with `accepted = false`.
    #[instrument(skip_all, fields(test_set = %test_set.label))]
    pub async fn validate(
        &self,
        candidate: &ModelArtifact,
        baseline: &ModelArtifact,
        test_set: &Dataset,
    ) -> ValidationResult<ValidatorReport> {
        let candidate_metrics = self.trainer.evaluate(candidate, test_set).await?;
        let baseline_metrics = self.trainer.evaluate(baseline, test_set).await?;

        // Gate 1: every tracked metric must improve by the threshold.
        let failures = self.improvement_gate(&candidate_metrics, &baseline_metrics);
        if !failures.is_empty() {
            info!(failure_count = failures.len(), "improvement gate rejected candidate");
            return Ok(ValidatorReport::rejected(
                failures,
                candidate_metrics,
                baseline_metrics,
                None,
            ));
        }

        // Gate 2: absolute floors, independent of the baseline.
        let failures = self.minimum_requirements_gate(&candidate_metrics);
        if !failures.is_empty() {
            info!(failure_count = failures.len(), "minimum-requirements gate rejected candidate");
            return Ok(ValidatorReport::rejected(
                failures,
                candidate_metrics,
                baseline_metrics,
                None,
            ));
        }

        // Gate 3: repeated runs must agree with the first.
        let stability_score = self.stability_score(candidate, test_set).await?;
        if stability_score < self.config.stability_threshold {
            info!(stability_score, "stability gate rejected candidate");
            return Ok(ValidatorReport::rejected(
                vec![GateFailure::StabilityGateFailed {
                    score: stability_score,
                    required: self.config.stability_threshold,
                }],
                candidate_metrics,
                baseline_metrics,
                Some(stability_score),
            ));
        }

        // Gate 4: declared interface version must match serving.
        if candidate.schema_version != self.config.expected_schema_version {
            info!(
                candidate_schema = %candidate.schema_version,
                expected_schema = %self.config.expected_schema_version,
                "compatibility gate rejected candidate"
            );
            return Ok(ValidatorReport::rejected(
                vec![GateFailure::CompatibilityGateFailed {
                    candidate: candidate.schema_version.clone(),
                    expected: self.config.expected_schema_version.clone(),
                }],
                candidate_metrics,
                baseline_metrics,
                Some(stability_score),
            ));
        }

        info!(stability_score, "candidate accepted");
        Ok(ValidatorReport::accepted(
            candidate_metrics,
            baseline_metrics,
            stability_score,
        ))
    }

    fn improvement_gate(
        &self,
        candidate_metrics: &HashMap<String, f64>,
        baseline_metrics: &HashMap<String, f64>,
    ) -> Vec<GateFailure> {
        let mut failures = Vec::new();

        for metric in &self.config.tracked_metrics {
            let candidate = match candidate_metrics.get(metric) {
                Some(value) => *value,
                None => {
                    failures.push(GateFailure::MetricMissing {
                        metric: metric.clone(),
                        side: "candidate".to_string(),
                    });
                    continue;
                }
            };
            let baseline = match baseline_metrics.get(metric) {
                Some(value) => *value,
                None => {
                    failures.push(GateFailure::MetricMissing {
                        metric: metric.clone(),
                        side: "baseline".to_string(),
                    });
                    continue;
                }
            };

            if candidate - baseline < self.config.improvement_threshold {
                failures.push(GateFailure::ImprovementGateFailed {
                    metric: metric.clone(),
                    candidate,
                    baseline,
                    required: self.config.improvement_threshold,
                });
            }
        }

        failures
    }

    fn minimum_requirements_gate(
        &self,
        candidate_metrics: &HashMap<String, f64>,
    ) -> Vec<GateFailure> {
        let mut failures = Vec::new();

        for (metric, floor) in &self.config.minimum_requirements {
            match candidate_metrics.get(metric) {
                Some(value) if *value >= *floor => {}
                Some(value) => failures.push(GateFailure::MinimumRequirementFailed {
                    metric: metric.clone(),
                    value: *value,
                    floor: *floor,
                }),
                None => failures.push(GateFailure::MetricMissing {
                    metric: metric.clone(),
                    side: "candidate".to_string(),
                }),
            }
        }

        failures
    }

    /// Mean agreement of repeated prediction runs against the first run.
    ///
    /// A single configured run trivially scores 1.0.
    async fn stability_score(
        &self,
        candidate: &ModelArtifact,
        test_set: &Dataset,
    ) -> ValidationResult<f64> {
        let first = self.trainer.predict(candidate, test_set).await?;
        if self.config.stability_runs <= 1 {
            return Ok(1.0);
        }

        let mut total = 0.0;
        let repeats = self.config.stability_runs - 1;
        for _ in 0..repeats {
            let run = self.trainer.predict(candidate, test_set).await?;
            total += first.agreement(&run);
        }
        Ok(total / f64::from(repeats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use semver::Version;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use vigil_types::{CollabResult, Predictions};

    /// Trainer whose evaluations are keyed by the artifact's first byte
    /// and whose predictions can be made unstable.
    struct ScriptedTrainer {
        candidate_metrics: HashMap<String, f64>,
        baseline_metrics: HashMap<String, f64>,
        unstable: bool,
        predict_calls: AtomicU32,
    }

    impl ScriptedTrainer {
        fn stable(candidate_accuracy: f64, baseline_accuracy: f64) -> Self {
            Self {
                candidate_metrics: HashMap::from([("accuracy".to_string(), candidate_accuracy)]),
                baseline_metrics: HashMap::from([("accuracy".to_string(), baseline_accuracy)]),
                unstable: false,
                predict_calls: AtomicU32::new(0),
            }
        }
    }

    const CANDIDATE_TAG: u8 = 1;

    #[async_trait]
    impl ModelTrainer for ScriptedTrainer {
        async fn fit(&self, _: &Dataset, _: Duration) -> CollabResult<ModelArtifact> {
            unreachable!("validator never fits");
        }

        async fn predict(&self, _: &ModelArtifact, _: &Dataset) -> CollabResult<Predictions> {
            let call = self.predict_calls.fetch_add(1, Ordering::SeqCst);
            if self.unstable && call % 2 == 1 {
                Ok(Predictions::new(vec![9.0, 9.0, 9.0, 9.0]))
            } else {
                Ok(Predictions::new(vec![1.0, 0.0, 1.0, 1.0]))
            }
        }

        async fn evaluate(
            &self,
            model: &ModelArtifact,
            _: &Dataset,
        ) -> CollabResult<HashMap<String, f64>> {
            if model.bytes.first() == Some(&CANDIDATE_TAG) {
                Ok(self.candidate_metrics.clone())
            } else {
                Ok(self.baseline_metrics.clone())
            }
        }
    }

    fn candidate() -> ModelArtifact {
        ModelArtifact::new(vec![CANDIDATE_TAG], Version::new(1, 0, 0))
    }

    fn baseline() -> ModelArtifact {
        ModelArtifact::new(vec![0], Version::new(1, 0, 0))
    }

    fn test_set() -> Dataset {
        Dataset::new("held-out", 4, Vec::new())
    }

    fn config() -> ValidationConfig {
        ValidationConfig {
            improvement_threshold: 0.01,
            minimum_requirements: HashMap::from([("accuracy".to_string(), 0.8)]),
            stability_threshold: 0.95,
            stability_runs: 5,
            ..ValidationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_clear_improvement_is_accepted() {
        // Baseline 0.82, candidate 0.845: 0.025 >= 0.01, floor 0.8 met,
        // 5/5 stable runs, matching schema -> accepted.
        let validator = Validator::new(Arc::new(ScriptedTrainer::stable(0.845, 0.82)), config());
        let report = validator
            .validate(&candidate(), &baseline(), &test_set())
            .await
            .unwrap();

        assert!(report.accepted);
        assert!(report.reasons.is_empty());
        assert_eq!(report.stability_score, Some(1.0));
        assert_eq!(report.candidate_metrics["accuracy"], 0.845);
    }

    #[tokio::test]
    async fn test_insufficient_improvement_is_rejected() {
        // 0.83 vs 0.82 with threshold 0.02: 0.01 < 0.02 -> rejected at
        // the improvement gate, metrics still reported.
        let mut cfg = config();
        cfg.improvement_threshold = 0.02;
        let validator = Validator::new(Arc::new(ScriptedTrainer::stable(0.83, 0.82)), cfg);
        let report = validator
            .validate(&candidate(), &baseline(), &test_set())
            .await
            .unwrap();

        assert!(!report.accepted);
        assert!(matches!(
            report.reasons[0],
            GateFailure::ImprovementGateFailed { .. }
        ));
        assert_eq!(report.baseline_metrics["accuracy"], 0.82);
        assert!(report.stability_score.is_none());
    }

    #[tokio::test]
    async fn test_and_semantics_over_tracked_metrics() {
        // Accuracy improves by 5% but recall regresses: with both tracked,
        // the candidate is rejected.
        let trainer = ScriptedTrainer {
            candidate_metrics: HashMap::from([
                ("accuracy".to_string(), 0.90),
                ("recall".to_string(), 0.70),
            ]),
            baseline_metrics: HashMap::from([
                ("accuracy".to_string(), 0.85),
                ("recall".to_string(), 0.71),
            ]),
            unstable: false,
            predict_calls: AtomicU32::new(0),
        };
        let cfg = ValidationConfig {
            tracked_metrics: vec!["accuracy".to_string(), "recall".to_string()],
            improvement_threshold: 0.01,
            ..ValidationConfig::default()
        };
        let validator = Validator::new(Arc::new(trainer), cfg);
        let report = validator
            .validate(&candidate(), &baseline(), &test_set())
            .await
            .unwrap();

        assert!(!report.accepted);
        assert!(report.reasons.iter().any(|r| matches!(
            r,
            GateFailure::ImprovementGateFailed { metric, .. } if metric == "recall"
        )));
    }

    #[tokio::test]
    async fn test_floor_protects_against_poor_baseline() {
        // Improves over a bad baseline but misses the absolute floor.
        let cfg = ValidationConfig {
            minimum_requirements: HashMap::from([("accuracy".to_string(), 0.8)]),
            ..config()
        };
        let validator = Validator::new(Arc::new(ScriptedTrainer::stable(0.65, 0.5)), cfg);
        let report = validator
            .validate(&candidate(), &baseline(), &test_set())
            .await
            .unwrap();

        assert!(!report.accepted);
        assert!(matches!(
            report.reasons[0],
            GateFailure::MinimumRequirementFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_unstable_candidate_is_rejected() {
        let trainer = ScriptedTrainer {
            unstable: true,
            ..ScriptedTrainer::stable(0.9, 0.82)
        };
        let validator = Validator::new(Arc::new(trainer), config());
        let report = validator
            .validate(&candidate(), &baseline(), &test_set())
            .await
            .unwrap();

        assert!(!report.accepted);
        assert!(matches!(
            report.reasons[0],
            GateFailure::StabilityGateFailed { .. }
        ));
        assert!(report.stability_score.unwrap() < 0.95);
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_rejected() {
        let validator = Validator::new(Arc::new(ScriptedTrainer::stable(0.9, 0.82)), config());
        let incompatible = ModelArtifact::new(vec![CANDIDATE_TAG], Version::new(2, 0, 0));
        let report = validator
            .validate(&incompatible, &baseline(), &test_set())
            .await
            .unwrap();

        assert!(!report.accepted);
        assert!(matches!(
            report.reasons[0],
            GateFailure::CompatibilityGateFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_tracked_metric_is_gate_failure() {
        let trainer = ScriptedTrainer {
            candidate_metrics: HashMap::new(),
            baseline_metrics: HashMap::from([("accuracy".to_string(), 0.8)]),
            unstable: false,
            predict_calls: AtomicU32::new(0),
        };
        let validator = Validator::new(Arc::new(trainer), config());
        let report = validator
            .validate(&candidate(), &baseline(), &test_set())
            .await
            .unwrap();

        assert!(!report.accepted);
        assert!(matches!(
            report.reasons[0],
            GateFailure::MetricMissing { .. }
        ));
    }
}
