//! The vigil daemon: watches a serving model, retrains it when it
//! degrades, and promotes validated replacements.

mod settings;
mod synthetic;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vigil_coordinator::{FanoutNotifier, RetrainCoordinator, TracingNotifier};
use vigil_monitor::{
    DriftWatcher, MonitorSupervisor, PerformanceWatcher, RequestQueue, ResourceWatcher,
    ScheduleWatcher, Watcher,
};
use vigil_registry::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore, VersionManager};
use vigil_types::{DataLoader, ModelTrainer, Notifier, Severity, SharedStatus};
use vigil_validate::Validator;

use crate::settings::Settings;
use crate::synthetic::{SyntheticDataLoader, SyntheticMetricSource, SyntheticTrainer};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Continuous model lifecycle controller")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the controller against synthetic collaborators.
    Run {
        /// Path to a TOML settings file.
        #[arg(long, env = "VIGIL_CONFIG")]
        config: Option<PathBuf>,

        /// Stop after this many seconds instead of waiting for ctrl-c.
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Validate a settings file and exit.
    CheckConfig {
        /// Path to a TOML settings file.
        #[arg(long, env = "VIGIL_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::Run { config, duration } => run(config.as_deref(), duration).await,
        Command::CheckConfig { config } => check_config(config.as_deref()),
    }
}

fn check_config(path: Option<&Path>) -> anyhow::Result<()> {
    let settings = Settings::load(path)?;
    settings.monitor.to_config().validate()?;
    settings.validation.to_config()?.validate()?;
    settings.coordinator.to_config().validate()?;
    settings.retention.to_policy().validate()?;
    println!("configuration ok");
    Ok(())
}

/// Resets the synthetic serving metrics when a new version deploys, so the
/// demo shows recovery after each retrain.
struct ResetOnDeploy {
    source: Arc<SyntheticMetricSource>,
}

#[async_trait]
impl Notifier for ResetOnDeploy {
    async fn send(&self, _severity: Severity, _message: &str, context: &HashMap<String, String>) {
        if context.get("outcome").map(String::as_str) == Some("deployed") {
            self.source.reset();
        }
    }
}

async fn run(config_path: Option<&Path>, duration: Option<u64>) -> anyhow::Result<()> {
    let settings = Settings::load(config_path)?;
    let monitor_config = settings.monitor.to_config();
    monitor_config.validate()?;
    let validation_config = settings.validation.to_config()?;
    validation_config.validate()?;
    let coordinator_config = settings.coordinator.to_config();
    coordinator_config.validate()?;
    let policy = settings.retention.to_policy();
    policy.validate()?;

    let status = SharedStatus::new();
    let store: Arc<dyn ArtifactStore> = match &settings.store.path {
        Some(path) => Arc::new(FsArtifactStore::open(path.clone()).await?),
        None => Arc::new(InMemoryArtifactStore::new()),
    };
    let manager = Arc::new(VersionManager::new(store, status.clone(), policy)?);

    let source = Arc::new(SyntheticMetricSource::new());
    let loader: Arc<dyn DataLoader> = Arc::new(SyntheticDataLoader);
    let trainer: Arc<dyn ModelTrainer> = Arc::new(SyntheticTrainer::new(
        validation_config.expected_schema_version.clone(),
    ));

    if manager.active_version().is_none() {
        let dataset = loader.load_training_data().await?;
        let artifact = trainer
            .fit(&dataset, coordinator_config.max_retraining_time)
            .await?;
        let staged = manager.stage_candidate(&artifact, HashMap::new()).await?;
        let initial = manager.promote(staged).await?;
        info!(version = %initial.id, "installed initial model version");
    }

    let queue = RequestQueue::new();
    let notifier: Arc<dyn Notifier> = Arc::new(FanoutNotifier::new(vec![
        Arc::new(TracingNotifier),
        Arc::new(ResetOnDeploy {
            source: source.clone(),
        }),
    ]));

    let validator = Validator::new(trainer.clone(), validation_config);
    let coordinator = Arc::new(RetrainCoordinator::new(
        coordinator_config,
        queue.clone(),
        status.clone(),
        loader,
        trainer,
        validator,
        manager.clone(),
        notifier.clone(),
    )?);

    coordinator.governor().set_limits(vigil_types::ResourceUsage {
        cpu: monitor_config.cpu_threshold,
        memory: monitor_config.memory_threshold,
        disk: monitor_config.disk_threshold,
    });

    let lookup = manager.clone();
    let watchers: Vec<Box<dyn Watcher>> = vec![
        Box::new(PerformanceWatcher::new(source.clone(), &monitor_config)),
        Box::new(DriftWatcher::new(source.clone(), &monitor_config)),
        Box::new(ScheduleWatcher::new(
            status.clone(),
            move |id| lookup.get(id).map(|v| v.created_at),
            &monitor_config,
        )),
        Box::new(ResourceWatcher::new(
            source.clone(),
            notifier.clone(),
            coordinator.governor().sample_fn(),
            &monitor_config,
        )),
    ];

    let mut supervisor = MonitorSupervisor::new(monitor_config, queue.clone(), notifier);
    supervisor.start(watchers)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = tokio::spawn(coordinator.clone().run(shutdown_rx));
    info!("vigil controller running");

    match duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => info!("run duration elapsed"),
                _ = tokio::signal::ctrl_c() => info!("interrupt received"),
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
            info!("interrupt received");
        }
    }

    supervisor.stop().await;
    let _ = shutdown_tx.send(true);
    queue.close();
    runner.await??;

    let history = coordinator.history();
    info!(attempts = history.len(), "controller stopped");
    for entry in history.entries() {
        info!(
            attempt = %entry.attempt_id,
            reason = %entry.request.reason,
            outcome = %entry.outcome,
            "attempt summary"
        );
    }
    Ok(())
}
