//! Arcade Game Logic
//!
//! The one-mistake arcade mode. 100% deterministic for a given seed, input
//! sequence and clock.
//!
//! ## Module Structure
//!
//! - `config`: Settings, difficulty presets, timings, scoring
//! - `words`: Built-in word lists
//! - `prompt`: Seeded prompt generation
//! - `state`: Run state, rounds, deaths, summaries
//! - `events`: Engine events for HUD, sound and collaborators
//! - `step`: Pure transition function
//! - `timers`: Cancellable timer queue
//! - `engine`: Imperative shell owning clock and timers
//! - `input`: Raw key to action mapping

pub mod config;
pub mod engine;
pub mod events;
pub mod input;
pub mod prompt;
pub mod state;
pub mod step;
pub mod timers;
pub mod words;

// Re-export key types
pub use config::{
    compute_score, difficulty_multiplier, Difficulty, DifficultyPreset, EngineConfig,
    GameSettings, PromptConfig, MAX_DIFFICULTY_LEVEL,
};
pub use engine::ArcadeEngine;
pub use events::{EngineEvent, EngineEventData, SoundCue};
pub use input::{map_key, InputAction, KeyInput, RawKey};
pub use prompt::{generate_prompt, PromptGenerator, PromptSource, ScriptedPrompts};
pub use state::{
    DeathInfo, GamePhase, GameSnapshot, GameState, KeystrokeLog, RoundData, RunSummary, Typed,
};
pub use step::{step, Command, Effect, Now, StepOutcome, COMBO_METER_FULL};
pub use timers::{TimerId, TimerKind, TimerQueue};
pub use words::WordBank;
