//! TOML settings file.
//!
//! Every section is optional; omitted fields fall back to the library
//! defaults. Durations are plain seconds so the file stays hand-editable.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use semver::Version;
use serde::Deserialize;
use vigil_coordinator::CoordinatorConfig;
use vigil_monitor::MonitorConfig;
use vigil_registry::RetentionPolicy;
use vigil_validate::ValidationConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub monitor: MonitorSettings,
    pub validation: ValidationSettings,
    pub coordinator: CoordinatorSettings,
    pub retention: RetentionSettings,
    pub store: StoreSettings,
}

impl Settings {
    /// Load from a TOML file, or all defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorSettings {
    pub performance_threshold: f64,
    pub performance_metric: String,
    pub drift_threshold: f64,
    pub retrain_interval_secs: u64,
    pub hysteresis_n: u32,
    pub performance_interval_secs: u64,
    pub drift_interval_secs: u64,
    pub schedule_interval_secs: u64,
    pub resource_interval_secs: u64,
    pub metric_timeout_secs: u64,
    pub backoff_base_secs: u64,
    pub backoff_max_secs: u64,
    pub failure_alert_threshold: u32,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub disk_threshold: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            performance_threshold: defaults.performance_threshold,
            performance_metric: defaults.performance_metric,
            drift_threshold: defaults.drift_threshold,
            retrain_interval_secs: defaults.retrain_interval.as_secs(),
            hysteresis_n: defaults.hysteresis_n,
            performance_interval_secs: defaults.performance_interval.as_secs(),
            drift_interval_secs: defaults.drift_interval.as_secs(),
            schedule_interval_secs: defaults.schedule_interval.as_secs(),
            resource_interval_secs: defaults.resource_interval.as_secs(),
            metric_timeout_secs: defaults.metric_timeout.as_secs(),
            backoff_base_secs: defaults.backoff_base.as_secs(),
            backoff_max_secs: defaults.backoff_max.as_secs(),
            failure_alert_threshold: defaults.failure_alert_threshold,
            cpu_threshold: defaults.cpu_threshold,
            memory_threshold: defaults.memory_threshold,
            disk_threshold: defaults.disk_threshold,
        }
    }
}

impl MonitorSettings {
    pub fn to_config(&self) -> MonitorConfig {
        MonitorConfig {
            performance_threshold: self.performance_threshold,
            performance_metric: self.performance_metric.clone(),
            drift_threshold: self.drift_threshold,
            retrain_interval: Duration::from_secs(self.retrain_interval_secs),
            hysteresis_n: self.hysteresis_n,
            performance_interval: Duration::from_secs(self.performance_interval_secs),
            drift_interval: Duration::from_secs(self.drift_interval_secs),
            schedule_interval: Duration::from_secs(self.schedule_interval_secs),
            resource_interval: Duration::from_secs(self.resource_interval_secs),
            metric_timeout: Duration::from_secs(self.metric_timeout_secs),
            backoff_base: Duration::from_secs(self.backoff_base_secs),
            backoff_max: Duration::from_secs(self.backoff_max_secs),
            failure_alert_threshold: self.failure_alert_threshold,
            cpu_threshold: self.cpu_threshold,
            memory_threshold: self.memory_threshold,
            disk_threshold: self.disk_threshold,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub tracked_metrics: Vec<String>,
    pub improvement_threshold: f64,
    pub minimum_requirements: HashMap<String, f64>,
    pub stability_threshold: f64,
    pub stability_runs: u32,
    pub expected_schema_version: String,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        let defaults = ValidationConfig::default();
        Self {
            tracked_metrics: defaults.tracked_metrics,
            improvement_threshold: defaults.improvement_threshold,
            minimum_requirements: defaults.minimum_requirements,
            stability_threshold: defaults.stability_threshold,
            stability_runs: defaults.stability_runs,
            expected_schema_version: defaults.expected_schema_version.to_string(),
        }
    }
}

impl ValidationSettings {
    pub fn to_config(&self) -> anyhow::Result<ValidationConfig> {
        let expected_schema_version = Version::parse(&self.expected_schema_version)
            .with_context(|| format!("invalid schema version '{}'", self.expected_schema_version))?;
        Ok(ValidationConfig {
            tracked_metrics: self.tracked_metrics.clone(),
            improvement_threshold: self.improvement_threshold,
            minimum_requirements: self.minimum_requirements.clone(),
            stability_threshold: self.stability_threshold,
            stability_runs: self.stability_runs,
            expected_schema_version,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorSettings {
    pub max_retraining_time_secs: u64,
    pub fetch_timeout_secs: u64,
    pub validation_timeout_secs: u64,
    pub deploy_timeout_secs: u64,
    pub history_path: Option<PathBuf>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        let defaults = CoordinatorConfig::default();
        Self {
            max_retraining_time_secs: defaults.max_retraining_time.as_secs(),
            fetch_timeout_secs: defaults.fetch_timeout.as_secs(),
            validation_timeout_secs: defaults.validation_timeout.as_secs(),
            deploy_timeout_secs: defaults.deploy_timeout.as_secs(),
            history_path: None,
        }
    }
}

impl CoordinatorSettings {
    pub fn to_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            max_retraining_time: Duration::from_secs(self.max_retraining_time_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            validation_timeout: Duration::from_secs(self.validation_timeout_secs),
            deploy_timeout: Duration::from_secs(self.deploy_timeout_secs),
            history_path: self.history_path.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionSettings {
    pub max_versions: usize,
    pub retention_days: i64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        let defaults = RetentionPolicy::default();
        Self {
            max_versions: defaults.max_versions,
            retention_days: defaults.retention_days,
        }
    }
}

impl RetentionSettings {
    pub fn to_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_versions: self.max_versions,
            retention_days: self.retention_days,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Artifact store directory. In-memory storage when omitted.
    pub path: Option<PathBuf>,
}
