//! Single-flight retrain coordinator.
//!
//! Consumes requests from the queue one at a time and drives each through
//! fetch, train, validate, deploy. Exactly one attempt runs at any moment;
//! further requests wait in the queue under its priority and dedup rules.
//! Every attempt finishes with a recorded outcome; a timed-out phase is an
//! abort, not an error, and a failed deployment rolls back to the version
//! that was active when the attempt began.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use vigil_monitor::{MonitorError, RequestQueue};
use vigil_registry::VersionManager;
use vigil_types::{
    AttemptId, DataLoader, ModelTrainer, ModelVersion, Notifier, RetrainRequest, Severity,
    SharedStatus, VersionId,
};
use vigil_validate::{Validator, ValidatorReport};

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, CoordinatorResult};
use crate::governor::ResourceGovernor;
use crate::history::{HistoryLog, RetrainHistoryEntry};
use crate::phase::{AttemptOutcome, RetrainPhase};

/// What the phase pipeline concluded about one attempt.
struct PhaseResult {
    outcome: AttemptOutcome,
    candidate_version_id: Option<VersionId>,
    validator_report: Option<ValidatorReport>,
    detail: Option<String>,
}

impl PhaseResult {
    fn error(detail: impl Into<String>) -> Self {
        Self {
            outcome: AttemptOutcome::Error,
            candidate_version_id: None,
            validator_report: None,
            detail: Some(detail.into()),
        }
    }

    fn aborted(detail: impl Into<String>) -> Self {
        Self {
            outcome: AttemptOutcome::Aborted,
            candidate_version_id: None,
            validator_report: None,
            detail: Some(detail.into()),
        }
    }
}

/// Drives retrain attempts end to end.
pub struct RetrainCoordinator {
    config: CoordinatorConfig,
    queue: RequestQueue,
    status: SharedStatus,
    loader: Arc<dyn DataLoader>,
    trainer: Arc<dyn ModelTrainer>,
    validator: Validator,
    manager: Arc<VersionManager>,
    notifier: Arc<dyn Notifier>,
    governor: Arc<ResourceGovernor>,
    history: Arc<HistoryLog>,
    phase_tx: watch::Sender<RetrainPhase>,
}

impl RetrainCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: CoordinatorConfig,
        queue: RequestQueue,
        status: SharedStatus,
        loader: Arc<dyn DataLoader>,
        trainer: Arc<dyn ModelTrainer>,
        validator: Validator,
        manager: Arc<VersionManager>,
        notifier: Arc<dyn Notifier>,
    ) -> CoordinatorResult<Self> {
        config.validate()?;
        let history = Arc::new(HistoryLog::new(config.history_path.clone()));
        let (phase_tx, _) = watch::channel(RetrainPhase::Idle);
        Ok(Self {
            config,
            queue,
            status,
            loader,
            trainer,
            validator,
            manager,
            notifier,
            governor: ResourceGovernor::new(),
            history,
            phase_tx,
        })
    }

    /// The resource governor fed by the resource watcher.
    pub fn governor(&self) -> Arc<ResourceGovernor> {
        self.governor.clone()
    }

    /// The attempt history log.
    pub fn history(&self) -> Arc<HistoryLog> {
        self.history.clone()
    }

    /// Observe the current attempt phase.
    pub fn phase(&self) -> watch::Receiver<RetrainPhase> {
        self.phase_tx.subscribe()
    }

    /// Consume requests until shutdown is signalled or the queue closes.
    ///
    /// Returns an error only when the controller can no longer run safely
    /// (rollback failure, single-flight violation).
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> CoordinatorResult<()> {
        info!("retrain coordinator started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                received = self.queue.recv() => {
                    match received {
                        Ok(request) => self.handle(request).await?,
                        Err(MonitorError::QueueClosed) => break,
                        Err(e) => {
                            warn!(error = %e, "queue receive failed");
                        }
                    }
                }
            }
        }
        info!("retrain coordinator stopped");
        Ok(())
    }

    /// Run one attempt for a request, maintaining single-flight and dedup
    /// bookkeeping around it.
    async fn handle(&self, request: RetrainRequest) -> CoordinatorResult<()> {
        if !self.status.begin_retrain() {
            let context = HashMap::from([("reason".to_string(), request.reason.to_string())]);
            self.notifier
                .send(
                    Severity::Critical,
                    "retrain attempt started while another was in progress",
                    &context,
                )
                .await;
            return Err(CoordinatorError::InvariantViolated);
        }
        let reason = request.reason;
        self.queue.mark_in_flight(reason);

        let result = self.run_attempt(request).await;

        self.queue.clear_in_flight(reason);
        self.status.end_retrain();
        self.phase_tx.send_replace(RetrainPhase::Idle);
        result
    }

    #[instrument(skip(self, request), fields(reason = %request.reason))]
    async fn run_attempt(&self, request: RetrainRequest) -> CoordinatorResult<()> {
        let attempt_id = AttemptId::generate();
        let started_at = Utc::now();
        let baseline = self.manager.active_version();
        info!(attempt = %attempt_id, "retrain attempt started");
        let constrained = self.governor.constrained();
        if let Some(usage) = self.governor.latest() {
            debug!(
                cpu = usage.cpu,
                memory = usage.memory,
                disk = usage.disk,
                "resource usage at attempt start"
            );
            if constrained {
                warn!("host resources above ceiling at attempt start");
            }
        }

        let phases = match &baseline {
            Some(baseline) => self.run_phases(baseline).await,
            None => Ok(PhaseResult::error("no active version to retrain against")),
        };

        let (phases, halt) = match phases {
            Ok(phases) => (phases, None),
            Err(halt) => (PhaseResult::error(halt.to_string()), Some(halt)),
        };

        let entry = RetrainHistoryEntry {
            attempt_id: attempt_id.clone(),
            request: request.clone(),
            started_at,
            finished_at: Utc::now(),
            outcome: phases.outcome,
            candidate_version_id: phases.candidate_version_id,
            baseline_version_id: baseline.map(|b| b.id),
            validator_report: phases.validator_report,
            detail: phases.detail.clone(),
            constrained,
        };
        self.history.append(entry).await?;
        self.notify_outcome(&attempt_id, &request, phases.outcome, phases.detail.as_deref())
            .await;

        match halt {
            Some(halt) => Err(halt),
            None => Ok(()),
        }
    }

    /// The fetch/train/validate/deploy pipeline for one attempt.
    ///
    /// `Ok` carries the attempt's outcome, including failures; `Err` means
    /// the controller must halt.
    async fn run_phases(&self, baseline: &ModelVersion) -> CoordinatorResult<PhaseResult> {
        self.phase_tx.send_replace(RetrainPhase::Fetching);
        let train_set = match timeout(self.config.fetch_timeout, self.loader.load_training_data())
            .await
        {
            Ok(Ok(dataset)) => dataset,
            Ok(Err(e)) => return Ok(PhaseResult::error(format!("training data fetch failed: {e}"))),
            Err(_) => {
                return Ok(PhaseResult::aborted(format!(
                    "training data fetch exceeded {:?}",
                    self.config.fetch_timeout
                )))
            }
        };
        let test_set = match timeout(self.config.fetch_timeout, self.loader.load_test_data()).await
        {
            Ok(Ok(dataset)) => dataset,
            Ok(Err(e)) => return Ok(PhaseResult::error(format!("test data fetch failed: {e}"))),
            Err(_) => {
                return Ok(PhaseResult::aborted(format!(
                    "test data fetch exceeded {:?}",
                    self.config.fetch_timeout
                )))
            }
        };
        debug!(
            train_rows = train_set.rows,
            test_rows = test_set.rows,
            "datasets fetched"
        );

        self.phase_tx.send_replace(RetrainPhase::Training);
        let budget = self.config.max_retraining_time;
        let artifact = match timeout(budget, self.trainer.fit(&train_set, budget)).await {
            Ok(Ok(artifact)) => artifact,
            Ok(Err(e)) => return Ok(PhaseResult::error(format!("training failed: {e}"))),
            Err(_) => {
                warn!(budget = ?budget, "training watchdog expired, attempt cancelled");
                return Ok(PhaseResult::aborted(format!(
                    "training exceeded {:?}",
                    budget
                )));
            }
        };

        self.phase_tx.send_replace(RetrainPhase::Validating);
        let candidate = match self.manager.stage_candidate(&artifact, HashMap::new()).await {
            Ok(candidate) => candidate,
            Err(e) => return Ok(PhaseResult::error(format!("candidate staging failed: {e}"))),
        };
        let candidate_id = candidate.id.clone();

        let baseline_artifact = match self.manager.store().read(&baseline.artifact_ref).await {
            Ok(artifact) => artifact,
            Err(e) => {
                self.discard(&candidate).await;
                return Ok(PhaseResult::error(format!(
                    "baseline artifact unavailable: {e}"
                )));
            }
        };
        let report = match timeout(
            self.config.validation_timeout,
            self.validator.validate(&artifact, &baseline_artifact, &test_set),
        )
        .await
        {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                self.discard(&candidate).await;
                return Ok(PhaseResult::error(format!("validation failed: {e}")));
            }
            Err(_) => {
                self.discard(&candidate).await;
                return Ok(PhaseResult::aborted(format!(
                    "validation exceeded {:?}",
                    self.config.validation_timeout
                )));
            }
        };

        if !report.accepted {
            info!(candidate = %candidate_id, "candidate rejected, previous version stays active");
            self.discard(&candidate).await;
            return Ok(PhaseResult {
                outcome: AttemptOutcome::Rejected,
                candidate_version_id: Some(candidate_id),
                validator_report: Some(report),
                detail: None,
            });
        }

        self.phase_tx.send_replace(RetrainPhase::Deploying);
        let mut candidate = candidate;
        candidate.metrics = report.candidate_metrics.clone();
        let staged = candidate.clone();
        match timeout(self.config.deploy_timeout, self.manager.promote(candidate)).await {
            Ok(Ok(_)) => Ok(PhaseResult {
                outcome: AttemptOutcome::Deployed,
                candidate_version_id: Some(candidate_id),
                validator_report: Some(report),
                detail: None,
            }),
            Ok(Err(e)) => {
                self.roll_back(baseline, &staged, report, format!("deployment failed: {e}"))
                    .await
            }
            Err(_) => {
                self.roll_back(
                    baseline,
                    &staged,
                    report,
                    format!("deployment exceeded {:?}", self.config.deploy_timeout),
                )
                .await
            }
        }
    }

    /// Restore the attempt's baseline after a failed deployment.
    ///
    /// The candidate that failed to deploy is discarded once the baseline
    /// is back; its artifact must not linger in the store. A rollback
    /// failure leaves the serving state unknown; a critical alert goes out
    /// and the controller halts.
    async fn roll_back(
        &self,
        baseline: &ModelVersion,
        candidate: &ModelVersion,
        report: ValidatorReport,
        detail: String,
    ) -> CoordinatorResult<PhaseResult> {
        self.phase_tx.send_replace(RetrainPhase::RollingBack);
        warn!(baseline = %baseline.id, %detail, "deployment failed, rolling back");

        match self.manager.rollback(Some(baseline.id.clone())).await {
            Ok(restored) => {
                info!(restored = %restored.id, "previous version restored");
                self.discard(candidate).await;
                Ok(PhaseResult {
                    outcome: AttemptOutcome::Error,
                    candidate_version_id: Some(candidate.id.clone()),
                    validator_report: Some(report),
                    detail: Some(format!("{detail}; previous version restored")),
                })
            }
            Err(e) => {
                let mut context = HashMap::new();
                context.insert("baseline".to_string(), baseline.id.to_string());
                context.insert("candidate".to_string(), candidate.id.to_string());
                self.notifier
                    .send(
                        Severity::Critical,
                        &format!("rollback failed after deployment failure: {e}"),
                        &context,
                    )
                    .await;
                Err(CoordinatorError::RollbackFailed(e.to_string()))
            }
        }
    }

    async fn discard(&self, candidate: &ModelVersion) {
        if let Err(e) = self.manager.discard_candidate(candidate).await {
            warn!(candidate = %candidate.id, error = %e, "candidate discard failed");
        }
    }

    async fn notify_outcome(
        &self,
        attempt_id: &AttemptId,
        request: &RetrainRequest,
        outcome: AttemptOutcome,
        detail: Option<&str>,
    ) {
        let mut context = HashMap::new();
        context.insert("attempt".to_string(), attempt_id.to_string());
        context.insert("reason".to_string(), request.reason.to_string());
        context.insert("outcome".to_string(), outcome.to_string());

        let (severity, message) = match outcome {
            AttemptOutcome::Deployed => {
                (Severity::Info, "retrain attempt deployed a new version".to_string())
            }
            AttemptOutcome::Rejected => (
                Severity::Warning,
                "retrain attempt rejected the candidate".to_string(),
            ),
            AttemptOutcome::Aborted => (
                Severity::Warning,
                format!(
                    "retrain attempt aborted: {}",
                    detail.unwrap_or("time budget exceeded")
                ),
            ),
            AttemptOutcome::Error => (
                Severity::Error,
                format!(
                    "retrain attempt failed: {}",
                    detail.unwrap_or("unknown error")
                ),
            ),
        };
        self.notifier.send(severity, &message, &context).await;
    }
}
