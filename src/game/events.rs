//! Engine Events
//!
//! Events queued by transitions for the HUD, sound, and collaborators.
//! Drained with [`crate::game::GameState::take_events`].

use serde::{Deserialize, Serialize};

use crate::core::clock::Millis;
use crate::game::state::{DeathInfo, GamePhase, RunSummary};

/// Sound cue. Never emitted while the run is muted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    CountdownTick,
    Go,
    RoundClear,
    LevelUp,
    Death,
}

/// Event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EngineEventData {
    PhaseChanged {
        old_phase: GamePhase,
        new_phase: GamePhase,
    },

    /// One countdown step; 0 is "GO"
    CountdownTick { remaining: u32 },

    RoundStarted {
        round: u32,
        difficulty_level: u8,
        prompt: String,
    },

    RoundCleared {
        round: u32,
        wpm: f64,
        streak: u32,
        difficulty_level: u8,
    },

    /// Wrong key or timeout
    Died(DeathInfo),

    /// The run's summary is final
    RunFinished(Box<RunSummary>),

    Cue(SoundCue),
}

/// An event with the engine time it happened at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub at: Millis,
    pub data: EngineEventData,
}

impl EngineEvent {
    pub fn new(at: Millis, data: EngineEventData) -> Self {
        Self { at, data }
    }

    pub fn phase_changed(at: Millis, old_phase: GamePhase, new_phase: GamePhase) -> Self {
        Self::new(at, EngineEventData::PhaseChanged { old_phase, new_phase })
    }

    pub fn countdown_tick(at: Millis, remaining: u32) -> Self {
        Self::new(at, EngineEventData::CountdownTick { remaining })
    }

    pub fn round_started(at: Millis, round: u32, difficulty_level: u8, prompt: String) -> Self {
        Self::new(
            at,
            EngineEventData::RoundStarted {
                round,
                difficulty_level,
                prompt,
            },
        )
    }

    pub fn round_cleared(at: Millis, round: u32, wpm: f64, streak: u32, difficulty_level: u8) -> Self {
        Self::new(
            at,
            EngineEventData::RoundCleared {
                round,
                wpm,
                streak,
                difficulty_level,
            },
        )
    }

    pub fn died(at: Millis, death: DeathInfo) -> Self {
        Self::new(at, EngineEventData::Died(death))
    }

    pub fn run_finished(at: Millis, summary: RunSummary) -> Self {
        Self::new(at, EngineEventData::RunFinished(Box::new(summary)))
    }

    pub fn cue(at: Millis, cue: SoundCue) -> Self {
        Self::new(at, EngineEventData::Cue(cue))
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match &self.data {
            EngineEventData::PhaseChanged { .. } => "phase_changed",
            EngineEventData::CountdownTick { .. } => "countdown_tick",
            EngineEventData::RoundStarted { .. } => "round_started",
            EngineEventData::RoundCleared { .. } => "round_cleared",
            EngineEventData::Died(_) => "died",
            EngineEventData::RunFinished(_) => "run_finished",
            EngineEventData::Cue(_) => "cue",
        }
    }
}
