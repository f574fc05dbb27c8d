//! Game Settings and Engine Configuration
//!
//! Player-facing settings, difficulty presets, engine timings and the
//! scoring formula.

use serde::{Deserialize, Serialize};

/// Highest difficulty level.
pub const MAX_DIFFICULTY_LEVEL: u8 = 6;

/// Score multiplier per difficulty level (index 0 = level 1).
pub const DIFFICULTY_MULTIPLIERS: [f64; MAX_DIFFICULTY_LEVEL as usize] =
    [1.0, 1.25, 1.5, 1.9, 2.3, 2.8];

// =============================================================================
// DIFFICULTY
// =============================================================================

/// Difficulty preset selected by the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// Starting level and ramp cadence of a preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifficultyPreset {
    pub start_level: u8,
    /// Flawless rounds per level gained
    pub ramp_every: u32,
}

impl Difficulty {
    pub const fn preset(self) -> DifficultyPreset {
        match self {
            Difficulty::Easy => DifficultyPreset { start_level: 1, ramp_every: 2 },
            Difficulty::Normal => DifficultyPreset { start_level: 1, ramp_every: 1 },
            Difficulty::Hard => DifficultyPreset { start_level: 3, ramp_every: 1 },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Player settings for a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GameSettings {
    /// Suppress sound cues
    pub muted: bool,
    /// Carried for the HUD; the engine ignores it
    pub reduce_motion: bool,
    pub difficulty: Difficulty,
    /// Allow the cursor to retreat
    pub backspace_enabled: bool,
    /// Fixed seed for reproducible runs; a fresh one is drawn when absent
    pub seed: Option<String>,
}

impl GameSettings {
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_backspace(mut self, enabled: bool) -> Self {
        self.backspace_enabled = enabled;
        self
    }

    pub fn muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }
}

// =============================================================================
// ENGINE CONFIG
// =============================================================================

/// Prompt length bounds, in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    pub min_chars: u32,
    pub max_chars: u32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            min_chars: 16,
            max_chars: 32,
        }
    }
}

/// Engine timings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Countdown steps before the first round
    pub countdown_ticks: u32,
    pub countdown_interval_ms: u64,
    /// Hard deadline per round
    pub round_duration_ms: u64,
    /// Pause between a cleared round and the next
    pub round_pause_ms: u64,
    pub max_difficulty_level: u8,
    pub prompt: PromptConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            countdown_interval_ms: 900,
            round_duration_ms: 15_000,
            round_pause_ms: 800,
            max_difficulty_level: MAX_DIFFICULTY_LEVEL,
            prompt: PromptConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Level cap, never above [`MAX_DIFFICULTY_LEVEL`].
    pub fn level_cap(&self) -> u8 {
        self.max_difficulty_level.clamp(1, MAX_DIFFICULTY_LEVEL)
    }
}

// =============================================================================
// SCORING
// =============================================================================

/// Multiplier for a difficulty level. Out-of-range levels are clamped.
pub fn difficulty_multiplier(level: u8) -> f64 {
    let idx = level.clamp(1, MAX_DIFFICULTY_LEVEL) as usize - 1;
    DIFFICULTY_MULTIPLIERS[idx]
}

/// `round(streak × average_wpm × multiplier(level))`
pub fn compute_score(streak: u32, average_wpm: f64, level: u8) -> u64 {
    let raw = f64::from(streak) * average_wpm * difficulty_multiplier(level);
    if raw.is_finite() && raw > 0.0 {
        raw.round() as u64
    } else {
        0
    }
}
