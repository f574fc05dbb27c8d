//! Game State Definitions
//!
//! The whole arcade run lives in one [`GameState`] record. Transitions are
//! applied by [`crate::game::step`]; nothing else mutates it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::clock::Millis;
use crate::core::hash::{compute_run_fingerprint, Fingerprint, RunHasher};
use crate::core::rng::SeededRng;
use crate::game::config::GameSettings;
use crate::game::events::EngineEvent;

// =============================================================================
// PHASE
// =============================================================================

/// Current phase of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GamePhase {
    /// Waiting for a start request
    #[default]
    Idle,
    /// Counting down to the first round
    Countdown { remaining: u32 },
    /// A round is live or about to start
    Playing,
    /// The run ended on a wrong key or timeout
    Dead,
    /// Terminal display state
    Results,
}

impl GamePhase {
    pub fn name(&self) -> &'static str {
        match self {
            GamePhase::Idle => "idle",
            GamePhase::Countdown { .. } => "countdown",
            GamePhase::Playing => "playing",
            GamePhase::Dead => "dead",
            GamePhase::Results => "results",
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, GamePhase::Playing)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ROUND
// =============================================================================

/// The live round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundData {
    /// 1-based
    pub round_number: u32,
    pub prompt: String,
    pub difficulty_level: u8,
    pub start_time: Millis,
    /// Correct characters typed so far
    pub typed: String,
    /// Next expected position, in characters
    pub cursor_index: usize,
    pub correct_chars: u32,
}

impl RoundData {
    pub fn new(round_number: u32, prompt: String, difficulty_level: u8, start_time: Millis) -> Self {
        Self {
            round_number,
            prompt,
            difficulty_level,
            start_time,
            typed: String::new(),
            cursor_index: 0,
            correct_chars: 0,
        }
    }

    /// Prompt length in characters.
    pub fn prompt_len(&self) -> usize {
        self.prompt.chars().count()
    }

    /// Character expected at the cursor.
    pub fn expected(&self) -> Option<char> {
        self.prompt.chars().nth(self.cursor_index)
    }

    pub fn is_complete(&self) -> bool {
        self.cursor_index >= self.prompt_len()
    }

    /// Space-delimited word index of the cursor.
    pub fn word_index(&self) -> usize {
        self.prompt
            .chars()
            .take(self.cursor_index)
            .filter(|&c| c == ' ')
            .count()
    }
}

// =============================================================================
// DEATH
// =============================================================================

/// What the player typed when the run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Typed {
    Char(char),
    /// The round deadline passed
    TimedOut,
}

impl Typed {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Typed::TimedOut)
    }
}

impl fmt::Display for Typed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typed::Char(c) => write!(f, "{c}"),
            Typed::TimedOut => f.write_str("TIMEOUT"),
        }
    }
}

/// The fatal keystroke.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathInfo {
    pub expected: char,
    pub typed: Typed,
    pub prompt_index: usize,
    pub word_index: usize,
    pub prompt: String,
    pub round: u32,
}

// =============================================================================
// KEYSTROKE LOG
// =============================================================================

/// Stand-in for `typed` on backspace entries.
pub const BACKSPACE_CHAR: char = '\u{8}';

/// Per-key analytics record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystrokeLog {
    pub timestamp: Millis,
    pub expected: char,
    pub typed: char,
    pub correct: bool,
    pub round: u32,
    pub prompt_index: usize,
    /// Milliseconds since the previous keystroke (or round start)
    pub interval_ms: u64,
    #[serde(default)]
    pub backspace: bool,
}

impl KeystrokeLog {
    pub fn hash_into(&self, hasher: &mut RunHasher) {
        hasher.update_u64(self.timestamp);
        hasher.update_char(self.expected);
        hasher.update_char(self.typed);
        hasher.update_bool(self.correct);
        hasher.update_u32(self.round);
        hasher.update_u64(self.prompt_index as u64);
        hasher.update_u64(self.interval_ms);
        hasher.update_bool(self.backspace);
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Terminal report of a run. Built once, at death or forced completion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: String,
    pub final_streak: u32,
    pub average_wpm: f64,
    pub accuracy: f64,
    pub difficulty_reached: u8,
    pub rounds_cleared: u32,
    pub score: u64,
    pub correct_chars: u32,
    pub typed_chars: u32,
    pub death: Option<DeathInfo>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default)]
    pub round_wpms: Vec<f64>,
    /// WPM consistency across rounds, percent
    #[serde(default)]
    pub consistency: f64,
}

impl RunSummary {
    /// Fingerprint over every gameplay field. The wall-clock timestamp is
    /// left out so a replay on a different day still matches.
    pub fn fingerprint(&self) -> Fingerprint {
        compute_run_fingerprint(&self.seed, |h| {
            h.update_u32(self.final_streak);
            h.update_f64(self.average_wpm);
            h.update_f64(self.accuracy);
            h.update_u8(self.difficulty_reached);
            h.update_u32(self.rounds_cleared);
            h.update_u64(self.score);
            h.update_u32(self.correct_chars);
            h.update_u32(self.typed_chars);
            h.update_u64(self.duration_ms);
            h.update_u64(self.round_wpms.len() as u64);
            for wpm in &self.round_wpms {
                h.update_f64(*wpm);
            }
            h.update_f64(self.consistency);
            match &self.death {
                None => h.update_u8(0),
                Some(death) => {
                    h.update_u8(1);
                    h.update_char(death.expected);
                    match death.typed {
                        Typed::Char(c) => {
                            h.update_u8(0);
                            h.update_char(c);
                        }
                        Typed::TimedOut => h.update_u8(1),
                    }
                    h.update_u64(death.prompt_index as u64);
                    h.update_u64(death.word_index as u64);
                    h.update_str(&death.prompt);
                    h.update_u32(death.round);
                }
            }
        })
    }

    pub fn is_timeout(&self) -> bool {
        self.death.as_ref().is_some_and(|d| d.typed.is_timeout())
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Read-only projection for the HUD.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub round: u32,
    /// Remaining countdown steps, 0 outside the countdown
    pub countdown: u32,
    pub time_remaining_ms: u64,
    pub streak: u32,
    pub wpm: f64,
    pub accuracy: f64,
    pub difficulty_level: u8,
    /// 0.0-1.0
    pub combo_meter: f64,
    pub correct_chars: u32,
    pub typed_chars: u32,
    pub score: u64,
    pub prompt: Option<String>,
    pub cursor_index: usize,
}

// =============================================================================
// GAME STATE
// =============================================================================

/// Complete state of an arcade run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub phase: GamePhase,

    pub settings: GameSettings,

    /// Seed of the current run (empty before the first start)
    pub seed: String,

    pub rng: SeededRng,

    /// Bumped on every start/restart; stale timers carry an older value
    pub epoch: u64,

    /// The live round, if any
    pub round: Option<RoundData>,

    /// Rounds started this run
    pub rounds_started: u32,

    /// Consecutive flawless rounds
    pub streak: u32,

    pub difficulty_level: u8,

    /// WPM per cleared round, plus the partial sample of the fatal round
    pub round_wpms: Vec<f64>,

    pub correct_chars: u32,

    /// Character keystrokes, right or wrong
    pub typed_chars: u32,

    /// Consecutive correct keystrokes
    pub combo: u32,

    pub keystroke_log: Vec<KeystrokeLog>,

    pub last_key_time: Option<Millis>,

    /// When the first round began
    pub run_started_at: Option<Millis>,

    pub death: Option<DeathInfo>,

    pub summary: Option<RunSummary>,

    /// Every prompt handed out this run, in order
    pub prompts: Vec<String>,

    #[serde(skip)]
    pub pending_events: Vec<EngineEvent>,
}

impl GameState {
    pub fn new(settings: GameSettings) -> Self {
        let level = settings.difficulty.preset().start_level;
        Self {
            phase: GamePhase::Idle,
            settings,
            seed: String::new(),
            rng: SeededRng::default(),
            epoch: 0,
            round: None,
            rounds_started: 0,
            streak: 0,
            difficulty_level: level,
            round_wpms: Vec::new(),
            correct_chars: 0,
            typed_chars: 0,
            combo: 0,
            keystroke_log: Vec::new(),
            last_key_time: None,
            run_started_at: None,
            death: None,
            summary: None,
            prompts: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    /// Reset run data for a fresh run on `seed`. Settings and epoch survive.
    pub fn reset_run(&mut self, seed: String, start_level: u8) {
        self.rng = SeededRng::from_seed(&seed);
        self.seed = seed;
        self.round = None;
        self.rounds_started = 0;
        self.streak = 0;
        self.difficulty_level = start_level;
        self.round_wpms.clear();
        self.correct_chars = 0;
        self.typed_chars = 0;
        self.combo = 0;
        self.keystroke_log.clear();
        self.last_key_time = None;
        self.run_started_at = None;
        self.death = None;
        self.summary = None;
        self.prompts.clear();
    }

    /// Mean of the round WPM samples.
    pub fn average_wpm(&self) -> f64 {
        if self.round_wpms.is_empty() {
            0.0
        } else {
            self.round_wpms.iter().sum::<f64>() / self.round_wpms.len() as f64
        }
    }

    /// Correct over typed keystrokes, percent. 100 before the first key.
    pub fn accuracy(&self) -> f64 {
        if self.typed_chars == 0 {
            100.0
        } else {
            f64::from(self.correct_chars) / f64::from(self.typed_chars) * 100.0
        }
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push an engine event.
    pub fn push_event(&mut self, event: EngineEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_word_index() {
        let mut round = RoundData::new(1, "the quick fox".into(), 1, 0);
        assert_eq!(round.word_index(), 0);

        round.cursor_index = 4;
        assert_eq!(round.word_index(), 1);
        assert_eq!(round.expected(), Some('q'));

        round.cursor_index = 10;
        assert_eq!(round.word_index(), 2);

        round.cursor_index = 13;
        assert!(round.is_complete());
        assert_eq!(round.expected(), None);
    }

    #[test]
    fn test_typed_display() {
        assert_eq!(Typed::Char('x').to_string(), "x");
        assert_eq!(Typed::TimedOut.to_string(), "TIMEOUT");
    }

    #[test]
    fn test_state_starts_at_preset_level() {
        use crate::game::config::Difficulty;

        let state = GameState::new(GameSettings::default().with_difficulty(Difficulty::Hard));
        assert_eq!(state.difficulty_level, 3);
        assert_eq!(state.phase, GamePhase::Idle);
        assert_eq!(state.accuracy(), 100.0);
        assert_eq!(state.average_wpm(), 0.0);
    }

    #[test]
    fn test_summary_fingerprint_ignores_wall_time() {
        let summary = RunSummary {
            seed: "s".into(),
            final_streak: 2,
            average_wpm: 55.0,
            accuracy: 98.0,
            difficulty_reached: 3,
            rounds_cleared: 2,
            score: 206,
            correct_chars: 40,
            typed_chars: 41,
            death: None,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            duration_ms: 9_000,
            round_wpms: vec![50.0, 60.0],
            consistency: 90.9,
        };
        let mut later = summary.clone();
        later.timestamp = Utc::now();
        assert_eq!(summary.fingerprint(), later.fingerprint());

        let mut changed = summary.clone();
        changed.score += 1;
        assert_ne!(summary.fingerprint(), changed.fingerprint());
    }
}
