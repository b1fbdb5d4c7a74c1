//! Monitoring configuration.
//!
//! All trigger thresholds and cadences are named, typed fields with
//! documented ranges, validated at startup. Nothing is looked up ad hoc
//! with silent defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Configuration for the watchers and the monitor supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Serving metric below this value counts as a performance breach
    /// (0.0-1.0).
    pub performance_threshold: f64,

    /// Name of the serving metric the performance watcher tracks
    /// (e.g. "accuracy" or "auc").
    pub performance_metric: String,

    /// Drift score above this value counts as a drift breach (0.0-1.0).
    pub drift_threshold: f64,

    /// Elapsed time since the active version was trained that triggers a
    /// scheduled retrain.
    pub retrain_interval: Duration,

    /// Consecutive breaching checks required before a request is emitted
    /// (hysteresis). Minimum 1; default 2.
    pub hysteresis_n: u32,

    /// Interval between performance checks.
    pub performance_interval: Duration,

    /// Interval between drift checks.
    pub drift_interval: Duration,

    /// Interval between schedule checks.
    pub schedule_interval: Duration,

    /// Interval between resource samples.
    pub resource_interval: Duration,

    /// Timeout applied to each metric source call.
    pub metric_timeout: Duration,

    /// Initial backoff applied after a failed metric source call.
    pub backoff_base: Duration,

    /// Ceiling for the exponential backoff.
    pub backoff_max: Duration,

    /// Consecutive collaborator failures before an operational alert is
    /// raised.
    pub failure_alert_threshold: u32,

    /// CPU utilization ceiling (0.0-1.0); exceeding it raises an alert.
    pub cpu_threshold: f64,

    /// Memory utilization ceiling (0.0-1.0).
    pub memory_threshold: f64,

    /// Disk utilization ceiling (0.0-1.0).
    pub disk_threshold: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            performance_threshold: 0.75,
            performance_metric: "accuracy".to_string(),
            drift_threshold: 0.2,
            retrain_interval: Duration::from_secs(7 * 24 * 3600),
            hysteresis_n: 2,
            performance_interval: Duration::from_secs(30 * 60),
            drift_interval: Duration::from_secs(90 * 60),
            schedule_interval: Duration::from_secs(3600),
            resource_interval: Duration::from_secs(60),
            metric_timeout: Duration::from_secs(10),
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(15 * 60),
            failure_alert_threshold: 5,
            cpu_threshold: 0.9,
            memory_threshold: 0.9,
            disk_threshold: 0.85,
        }
    }
}

impl MonitorConfig {
    /// Validate ranges. Called once at startup; out-of-range values are
    /// rejected rather than clamped.
    pub fn validate(&self) -> MonitorResult<()> {
        fn unit_range(name: &str, value: f64) -> MonitorResult<()> {
            if !(0.0..=1.0).contains(&value) {
                return Err(MonitorError::Configuration(format!(
                    "{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
            Ok(())
        }

        unit_range("performance_threshold", self.performance_threshold)?;
        unit_range("drift_threshold", self.drift_threshold)?;
        unit_range("cpu_threshold", self.cpu_threshold)?;
        unit_range("memory_threshold", self.memory_threshold)?;
        unit_range("disk_threshold", self.disk_threshold)?;

        if self.hysteresis_n == 0 {
            return Err(MonitorError::Configuration(
                "hysteresis_n must be at least 1".to_string(),
            ));
        }
        if self.performance_metric.is_empty() {
            return Err(MonitorError::Configuration(
                "performance_metric must not be empty".to_string(),
            ));
        }
        if self.retrain_interval.is_zero() {
            return Err(MonitorError::Configuration(
                "retrain_interval must be non-zero".to_string(),
            ));
        }
        if self.backoff_base > self.backoff_max {
            return Err(MonitorError::Configuration(
                "backoff_base must not exceed backoff_max".to_string(),
            ));
        }

        Ok(())
    }
}
