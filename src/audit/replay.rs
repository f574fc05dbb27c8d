//! Verification by Replay
//!
//! Re-runs an exported log through a fresh engine on a manual clock and
//! checks that the same summary comes out. Only runs played with the
//! built-in prompt generator can be replayed.

use tracing::{debug, warn};

use crate::audit::analytics::AnalyticsRun;
use crate::core::clock::ManualClock;
use crate::core::hash::short_hex;
use crate::game::engine::ArcadeEngine;
use crate::game::state::RunSummary;

/// Why a run failed verification.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("stored fingerprint does not match the run contents")]
    FingerprintMismatch,

    #[error("first round starts at {started_at}ms, before the countdown could finish")]
    InvalidStart { started_at: u64 },

    #[error("replay never finished the run")]
    ReplayIncomplete,

    #[error("replayed summary differs: expected {expected}, computed {computed}")]
    SummaryMismatch { expected: String, computed: String },
}

/// Verification result.
#[derive(Clone, Debug)]
pub struct VerificationResult {
    /// Did verification pass?
    pub valid: bool,

    /// Summary produced by the replay, if it got that far.
    pub replayed: Option<RunSummary>,

    /// Detailed error if verification failed.
    pub error: Option<VerificationError>,
}

impl VerificationResult {
    fn failed(error: VerificationError, replayed: Option<RunSummary>) -> Self {
        warn!(%error, "run verification failed");
        Self {
            valid: false,
            replayed,
            error: Some(error),
        }
    }
}

/// Replay the run's log and return the summary it produces.
pub fn replay_run(run: &AnalyticsRun) -> Result<RunSummary, VerificationError> {
    let countdown_ms = u64::from(run.config.countdown_ticks) * run.config.countdown_interval_ms;
    let start = run
        .started_at
        .checked_sub(countdown_ms)
        .ok_or(VerificationError::InvalidStart {
            started_at: run.started_at,
        })?;

    let clock = ManualClock::new();
    clock.set(start);

    let settings = run.settings.clone().with_seed(run.seed.clone());
    let mut engine = ArcadeEngine::new(settings, run.config.clone(), clock.clone());
    engine.start();

    for entry in &run.log {
        clock.set(entry.timestamp);
        if entry.backspace {
            engine.handle_backspace();
        } else {
            engine.handle_char(entry.typed);
        }
    }

    // Runs that ended without a keystroke (timeout or forced completion)
    // end at start + duration.
    if engine.summary().is_none() {
        clock.set(run.started_at + run.summary.duration_ms);
        engine.poll();
        if run.summary.death.is_none() {
            engine.go_to_results();
        }
    }

    let summary = engine.summary().cloned();
    engine.cleanup();
    summary.ok_or(VerificationError::ReplayIncomplete)
}

/// Verify an exported run.
pub fn verify_run(run: &AnalyticsRun) -> VerificationResult {
    if !run.fingerprint_valid() {
        return VerificationResult::failed(VerificationError::FingerprintMismatch, None);
    }

    let replayed = match replay_run(run) {
        Ok(summary) => summary,
        Err(error) => return VerificationResult::failed(error, None),
    };

    let expected = run.summary.fingerprint();
    let computed = replayed.fingerprint();
    if expected != computed {
        return VerificationResult::failed(
            VerificationError::SummaryMismatch {
                expected: short_hex(&expected),
                computed: short_hex(&computed),
            },
            Some(replayed),
        );
    }

    debug!(seed = %run.seed, fingerprint = %short_hex(&computed), "run verified");
    VerificationResult {
        valid: true,
        replayed: Some(replayed),
        error: None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
