//! Session Collaborators
//!
//! Outbound seams of a running session: the leaderboard/persistence
//! submitter and the bounded analytics log.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::audit::analytics::{AnalyticsRun, AuditError};
use crate::game::state::RunSummary;

/// Default number of runs the analytics log keeps.
pub const DEFAULT_LOG_CAPACITY: usize = 20;

// =============================================================================
// SUBMISSION
// =============================================================================

/// Submission failure reported by a collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Receives finished runs (leaderboard, persistence).
///
/// Called at most once per run from a spawned task. The session never waits
/// on it and only logs failures.
pub trait RunSubmitter: Send + Sync + 'static {
    fn submit(&self, summary: RunSummary) -> impl Future<Output = Result<(), SubmitError>> + Send;
}

/// Submitter that drops every run.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubmitter;

impl RunSubmitter for NoopSubmitter {
    fn submit(&self, _summary: RunSummary) -> impl Future<Output = Result<(), SubmitError>> + Send {
        async { Ok(()) }
    }
}

// =============================================================================
// ANALYTICS LOG
// =============================================================================

/// Bounded log of recent runs. Oldest runs are trimmed first.
///
/// Cheap to clone; clones share the same log.
#[derive(Debug, Clone)]
pub struct RunLogStore {
    runs: Arc<RwLock<VecDeque<AnalyticsRun>>>,
    capacity: usize,
}

impl RunLogStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            runs: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a run, trimming the oldest past capacity.
    pub async fn push(&self, run: AnalyticsRun) {
        let mut runs = self.runs.write().await;
        runs.push_back(run);
        while runs.len() > self.capacity {
            runs.pop_front();
        }
    }

    /// Stored runs, oldest first.
    pub async fn recent(&self) -> Vec<AnalyticsRun> {
        self.runs.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.runs.write().await.clear();
    }

    /// Export every stored run as a JSON array.
    pub async fn export_json(&self) -> Result<String, AuditError> {
        let runs = self.runs.read().await;
        Ok(serde_json::to_string_pretty(&*runs)?)
    }
}

impl Default for RunLogStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

// =============================================================================
// TESTS
// =============================================================================
