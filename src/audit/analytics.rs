//! Analytics Run Export
//!
//! An [`AnalyticsRun`] is everything needed to audit a finished run: the
//! settings and timings it was played with, its seed, the full keystroke log
//! and the summary. It encodes to JSON for export and to bincode for compact
//! storage, and carries a fingerprint for tamper detection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::clock::{Clock, Millis};
use crate::core::hash::{Fingerprint, RunHasher};
use crate::game::config::{EngineConfig, GameSettings};
use crate::game::engine::ArcadeEngine;
use crate::game::prompt::PromptSource;
use crate::game::state::{KeystrokeLog, RunSummary};

/// Current export format version.
pub const ANALYTICS_VERSION: u8 = 1;

/// Errors reading or writing analytics runs.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding failed: {0}")]
    Binary(#[from] bincode::Error),

    #[error("unsupported analytics version: expected {expected}, got {got}")]
    VersionMismatch { expected: u8, got: u8 },

    #[error("run has no summary yet")]
    Incomplete,
}

/// A finished run, ready for export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRun {
    pub version: u8,
    pub run_id: Uuid,
    pub settings: GameSettings,
    pub config: EngineConfig,
    pub seed: String,
    /// Engine time the first round began
    pub started_at: Millis,
    pub log: Vec<KeystrokeLog>,
    pub summary: RunSummary,
    /// Hex SHA-256 over everything above except `run_id`
    pub fingerprint: String,
}

impl AnalyticsRun {
    /// Package a run.
    pub fn new(
        settings: GameSettings,
        config: EngineConfig,
        started_at: Millis,
        log: Vec<KeystrokeLog>,
        summary: RunSummary,
    ) -> Self {
        let seed = summary.seed.clone();
        let fingerprint = hex::encode(compute_fingerprint(
            &settings,
            &config,
            &seed,
            started_at,
            &log,
            &summary,
        ));

        Self {
            version: ANALYTICS_VERSION,
            run_id: Uuid::new_v4(),
            settings,
            config,
            seed,
            started_at,
            log,
            summary,
            fingerprint,
        }
    }

    /// Package the engine's finished run.
    pub fn from_engine<C: Clock, P: PromptSource>(
        engine: &ArcadeEngine<C, P>,
    ) -> Result<Self, AuditError> {
        let state = engine.state();
        let summary = state.summary.clone().ok_or(AuditError::Incomplete)?;

        Ok(Self::new(
            state.settings.clone(),
            engine.config().clone(),
            state.run_started_at.unwrap_or(0),
            state.keystroke_log.clone(),
            summary,
        ))
    }

    /// Recompute the fingerprint from the current contents.
    pub fn compute_fingerprint(&self) -> Fingerprint {
        compute_fingerprint(
            &self.settings,
            &self.config,
            &self.seed,
            self.started_at,
            &self.log,
            &self.summary,
        )
    }

    /// True when the stored fingerprint matches the contents.
    pub fn fingerprint_valid(&self) -> bool {
        hex::encode(self.compute_fingerprint()) == self.fingerprint
    }

    pub fn to_json(&self) -> Result<String, AuditError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AuditError> {
        let run: Self = serde_json::from_str(json)?;
        run.check_version()
    }

    /// Serialize to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AuditError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, AuditError> {
        let run: Self = bincode::deserialize(data)?;
        run.check_version()
    }

    fn check_version(self) -> Result<Self, AuditError> {
        if self.version != ANALYTICS_VERSION {
            return Err(AuditError::VersionMismatch {
                expected: ANALYTICS_VERSION,
                got: self.version,
            });
        }
        Ok(self)
    }
}

/// Fingerprint a run. Field order is part of the format.
pub fn compute_fingerprint(
    settings: &GameSettings,
    config: &EngineConfig,
    seed: &str,
    started_at: Millis,
    log: &[KeystrokeLog],
    summary: &RunSummary,
) -> Fingerprint {
    let mut hasher = RunHasher::for_keystrokes();
    hasher.update_u8(ANALYTICS_VERSION);
    hasher.update_str(seed);

    hasher.update_str(settings.difficulty.as_str());
    hasher.update_bool(settings.backspace_enabled);
    hasher.update_bool(settings.muted);
    hasher.update_bool(settings.reduce_motion);

    hasher.update_u32(config.countdown_ticks);
    hasher.update_u64(config.countdown_interval_ms);
    hasher.update_u64(config.round_duration_ms);
    hasher.update_u64(config.round_pause_ms);
    hasher.update_u8(config.max_difficulty_level);
    hasher.update_u32(config.prompt.min_chars);
    hasher.update_u32(config.prompt.max_chars);

    hasher.update_u64(started_at);
    hasher.update_u64(log.len() as u64);
    for entry in log {
        entry.hash_into(&mut hasher);
    }

    hasher.update_bytes(&summary.fingerprint());
    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================
