//! Attempt history.
//!
//! Every retrain attempt leaves exactly one entry, whatever its outcome.
//! The log is held in memory; when a sink path is configured, each entry
//! is also appended as one JSON line so the audit trail survives restarts.

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use vigil_types::{AttemptId, RetrainRequest, VersionId};
use vigil_validate::ValidatorReport;

use crate::error::CoordinatorResult;
use crate::phase::AttemptOutcome;

/// Record of one retrain attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainHistoryEntry {
    pub attempt_id: AttemptId,

    /// The request that triggered the attempt.
    pub request: RetrainRequest,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    pub outcome: AttemptOutcome,

    /// The candidate produced by this attempt, if training completed.
    pub candidate_version_id: Option<VersionId>,

    /// The version that was active when the attempt started.
    pub baseline_version_id: Option<VersionId>,

    /// The validator's report, if validation ran.
    pub validator_report: Option<ValidatorReport>,

    /// Human-readable detail for aborted and errored attempts.
    pub detail: Option<String>,

    /// Whether host resource usage was above the configured ceilings when
    /// the attempt started.
    #[serde(default)]
    pub constrained: bool,
}

/// Append-only log of retrain attempts.
pub struct HistoryLog {
    entries: Mutex<Vec<RetrainHistoryEntry>>,
    sink: Option<PathBuf>,
}

impl HistoryLog {
    pub fn new(sink: Option<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            sink,
        }
    }

    /// Append an entry. Sink write failures are logged, not fatal; the
    /// in-memory log is always updated.
    pub async fn append(&self, entry: RetrainHistoryEntry) -> CoordinatorResult<()> {
        if let Some(path) = &self.sink {
            match serde_json::to_string(&entry) {
                Ok(line) => {
                    if let Err(e) = append_line(path, &line).await {
                        warn!(path = %path.display(), error = %e, "history sink write failed");
                    }
                }
                Err(e) => warn!(error = %e, "history entry serialization failed"),
            }
        }
        self.entries
            .lock()
            .expect("history lock poisoned")
            .push(entry);
        Ok(())
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<RetrainHistoryEntry> {
        self.entries.lock().expect("history lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("history lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn append_line(path: &PathBuf, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    Ok(())
}
