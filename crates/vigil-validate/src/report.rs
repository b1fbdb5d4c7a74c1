//! Validator reports.
//!
//! The report always carries every metric that was computed, even when an
//! early gate short-circuits, so the audit trail records why a candidate
//! was rejected and what it looked like.

use std::collections::HashMap;

use semver::Version;
use serde::{Deserialize, Serialize};

/// A gate that a candidate failed, with the numbers behind the decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateFailure {
    /// A tracked metric did not improve over the baseline by the required
    /// margin.
    ImprovementGateFailed {
        metric: String,
        candidate: f64,
        baseline: f64,
        required: f64,
    },

    /// A metric fell below its absolute floor.
    MinimumRequirementFailed {
        metric: String,
        value: f64,
        floor: f64,
    },

    /// Repeated prediction runs disagreed too often.
    StabilityGateFailed { score: f64, required: f64 },

    /// The candidate's declared interface version does not match the
    /// serving environment.
    CompatibilityGateFailed {
        candidate: Version,
        expected: Version,
    },

    /// A tracked metric was missing from the candidate or baseline
    /// evaluation.
    MetricMissing { metric: String, side: String },
}

impl std::fmt::Display for GateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateFailure::ImprovementGateFailed {
                metric,
                candidate,
                baseline,
                required,
            } => write!(
                f,
                "improvement gate failed: {} candidate {:.4} vs baseline {:.4} (required +{:.4})",
                metric, candidate, baseline, required
            ),
            GateFailure::MinimumRequirementFailed {
                metric,
                value,
                floor,
            } => write!(
                f,
                "minimum requirement failed: {} = {:.4} below floor {:.4}",
                metric, value, floor
            ),
            GateFailure::StabilityGateFailed { score, required } => write!(
                f,
                "stability gate failed: agreement {:.4} below {:.4}",
                score, required
            ),
            GateFailure::CompatibilityGateFailed {
                candidate,
                expected,
            } => write!(
                f,
                "compatibility gate failed: candidate schema {} != expected {}",
                candidate, expected
            ),
            GateFailure::MetricMissing { metric, side } => {
                write!(f, "tracked metric '{}' missing from {} evaluation", metric, side)
            }
        }
    }
}

/// Outcome of validating one candidate against the baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorReport {
    /// Whether all gates passed.
    pub accepted: bool,

    /// Gate failures, in the order they were found.
    pub reasons: Vec<GateFailure>,

    /// Candidate metrics on the held-out test set.
    pub candidate_metrics: HashMap<String, f64>,

    /// Baseline metrics on the same test set.
    pub baseline_metrics: HashMap<String, f64>,

    /// Agreement score from the stability gate, if that gate ran.
    pub stability_score: Option<f64>,
}

impl ValidatorReport {
    /// A report accepting the candidate.
    pub fn accepted(
        candidate_metrics: HashMap<String, f64>,
        baseline_metrics: HashMap<String, f64>,
        stability_score: f64,
    ) -> Self {
        Self {
            accepted: true,
            reasons: Vec::new(),
            candidate_metrics,
            baseline_metrics,
            stability_score: Some(stability_score),
        }
    }

    /// A report rejecting the candidate at some gate.
    pub fn rejected(
        reasons: Vec<GateFailure>,
        candidate_metrics: HashMap<String, f64>,
        baseline_metrics: HashMap<String, f64>,
        stability_score: Option<f64>,
    ) -> Self {
        Self {
            accepted: false,
            reasons,
            candidate_metrics,
            baseline_metrics,
            stability_score,
        }
    }

    /// One-line summary for notifications.
    pub fn summary(&self) -> String {
        if self.accepted {
            "candidate accepted".to_string()
        } else {
            let reasons = self
                .reasons
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            format!("candidate rejected: {}", reasons)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_reasons() {
        let report = ValidatorReport::rejected(
            vec![GateFailure::StabilityGateFailed {
                score: 0.8,
                required: 0.95,
            }],
            HashMap::new(),
            HashMap::new(),
            Some(0.8),
        );
        assert!(report.summary().contains("stability gate failed"));
    }

    #[test]
    fn test_report_serde_roundtrip() {
        let report = ValidatorReport::rejected(
            vec![GateFailure::ImprovementGateFailed {
                metric: "accuracy".to_string(),
                candidate: 0.83,
                baseline: 0.82,
                required: 0.02,
            }],
            HashMap::from([("accuracy".to_string(), 0.83)]),
            HashMap::from([("accuracy".to_string(), 0.82)]),
            None,
        );

        let json = serde_json::to_string(&report).unwrap();
        let back: ValidatorReport = serde_json::from_str(&json).unwrap();
        assert!(!back.accepted);
        assert_eq!(back.reasons, report.reasons);
    }
}
