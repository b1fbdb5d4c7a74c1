//! Synthetic collaborators for demo runs.
//!
//! A self-contained stand-in for the real serving stack: the metric source
//! degrades over time, the trainer's models improve with every generation,
//! and the loader fabricates datasets. Useful for watching the controller
//! detect degradation, retrain, and promote without any infrastructure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use semver::Version;
use vigil_types::{
    CollabResult, DataLoader, Dataset, MetricSource, ModelArtifact, ModelTrainer, Predictions,
    ResourceUsage,
};

/// Serving metrics that decay until a deployment resets them.
pub struct SyntheticMetricSource {
    accuracy: Mutex<f64>,
    drift: Mutex<f64>,
}

impl SyntheticMetricSource {
    pub fn new() -> Self {
        Self {
            accuracy: Mutex::new(0.92),
            drift: Mutex::new(0.02),
        }
    }

    /// Called after a deployment: the fresh model serves well again.
    pub fn reset(&self) {
        *self.accuracy.lock().unwrap() = 0.92;
        *self.drift.lock().unwrap() = 0.02;
    }
}

impl Default for SyntheticMetricSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSource for SyntheticMetricSource {
    async fn current_performance(&self) -> CollabResult<HashMap<String, f64>> {
        let mut accuracy = self.accuracy.lock().unwrap();
        *accuracy = (*accuracy - 0.01).max(0.5);
        let jitter = rand::thread_rng().gen_range(-0.005..0.005);
        Ok(HashMap::from([(
            "accuracy".to_string(),
            (*accuracy + jitter).clamp(0.0, 1.0),
        )]))
    }

    async fn current_drift_score(&self) -> CollabResult<f64> {
        let mut drift = self.drift.lock().unwrap();
        *drift = (*drift + 0.01).min(0.9);
        Ok(*drift)
    }

    async fn current_resource_usage(&self) -> CollabResult<ResourceUsage> {
        let mut rng = rand::thread_rng();
        Ok(ResourceUsage {
            cpu: rng.gen_range(0.2..0.6),
            memory: rng.gen_range(0.3..0.5),
            disk: rng.gen_range(0.4..0.5),
        })
    }
}

/// Fabricates fixed-size datasets with random payloads.
pub struct SyntheticDataLoader;

#[async_trait]
impl DataLoader for SyntheticDataLoader {
    async fn load_training_data(&self) -> CollabResult<Dataset> {
        let mut payload = vec![0u8; 4096];
        rand::thread_rng().fill(payload.as_mut_slice());
        Ok(Dataset::new("synthetic-train", 512, payload))
    }

    async fn load_test_data(&self) -> CollabResult<Dataset> {
        let mut payload = vec![0u8; 1024];
        rand::thread_rng().fill(payload.as_mut_slice());
        Ok(Dataset::new("synthetic-test", 128, payload))
    }
}

/// Trainer whose models improve with each generation.
///
/// The generation number is embedded in the artifact bytes so evaluation
/// and prediction stay deterministic for a given model.
pub struct SyntheticTrainer {
    generation: AtomicU32,
    schema_version: Version,
}

impl SyntheticTrainer {
    pub fn new(schema_version: Version) -> Self {
        Self {
            generation: AtomicU32::new(0),
            schema_version,
        }
    }

    fn generation_of(model: &ModelArtifact) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(model.bytes.get(..4).unwrap_or(&[0, 0, 0, 0]));
        u32::from_le_bytes(bytes)
    }
}

#[async_trait]
impl ModelTrainer for SyntheticTrainer {
    async fn fit(&self, _dataset: &Dataset, _time_budget: Duration) -> CollabResult<ModelArtifact> {
        // Simulated training time.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ModelArtifact::new(
            generation.to_le_bytes().to_vec(),
            self.schema_version.clone(),
        ))
    }

    async fn predict(&self, model: &ModelArtifact, dataset: &Dataset) -> CollabResult<Predictions> {
        let generation = Self::generation_of(model);
        let values = (0..dataset.rows)
            .map(|row| ((row as u32 ^ generation) % 2) as f64)
            .collect();
        Ok(Predictions::new(values))
    }

    async fn evaluate(
        &self,
        model: &ModelArtifact,
        _dataset: &Dataset,
    ) -> CollabResult<HashMap<String, f64>> {
        let generation = Self::generation_of(model);
        let accuracy = (0.80 + 0.015 * f64::from(generation)).min(0.99);
        Ok(HashMap::from([("accuracy".to_string(), accuracy)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_decay_until_reset() {
        let source = SyntheticMetricSource::new();
        let first = source.current_performance().await.unwrap()["accuracy"];
        for _ in 0..10 {
            source.current_performance().await.unwrap();
        }
        let later = source.current_performance().await.unwrap()["accuracy"];
        assert!(later < first);

        source.reset();
        let fresh = source.current_performance().await.unwrap()["accuracy"];
        assert!(fresh > later);
    }

    #[tokio::test]
    async fn test_generations_improve() {
        let trainer = SyntheticTrainer::new(Version::new(1, 0, 0));
        let dataset = Dataset::new("test", 8, Vec::new());

        let first = trainer.fit(&dataset, Duration::from_secs(1)).await.unwrap();
        let second = trainer.fit(&dataset, Duration::from_secs(1)).await.unwrap();

        let a = trainer.evaluate(&first, &dataset).await.unwrap()["accuracy"];
        let b = trainer.evaluate(&second, &dataset).await.unwrap()["accuracy"];
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_predictions_deterministic_per_model() {
        let trainer = SyntheticTrainer::new(Version::new(1, 0, 0));
        let dataset = Dataset::new("test", 16, Vec::new());
        let model = trainer.fit(&dataset, Duration::from_secs(1)).await.unwrap();

        let first = trainer.predict(&model, &dataset).await.unwrap();
        let second = trainer.predict(&model, &dataset).await.unwrap();
        assert_eq!(first.agreement(&second), 1.0);
    }
}
