//! # KeyRush Engine
//!
//! Typing-tutor core: keystroke metrics and a deterministic one-mistake
//! arcade mode with seeded prompts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      KEYRUSH ENGINE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── clock.rs    - Injectable monotonic/manual clocks        │
//! │  ├── rng.rs      - Seeded Mulberry32 PRNG                    │
//! │  └── hash.rs     - Run fingerprints for audit                │
//! │                                                              │
//! │  metrics/        - Typing Metrics Engine (pure)              │
//! │  ├── keystroke.rs- Events, buffer replay, recorder           │
//! │  ├── calculate.rs- Session and live metrics                  │
//! │  ├── key_stats.rs- Per-key stats, trouble keys               │
//! │  └── peak.rs     - Sliding-window peak WPM                   │
//! │                                                              │
//! │  game/           - Arcade Game Engine (deterministic)        │
//! │  ├── step.rs     - Pure transition function                  │
//! │  ├── engine.rs   - Clock + timer shell                       │
//! │  ├── prompt.rs   - Seeded prompt generation                  │
//! │  └── input.rs    - Raw key to action mapping                 │
//! │                                                              │
//! │  audit/          - Export and replay verification            │
//! │  session/        - Async shell (non-deterministic)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! `core/`, `metrics/` and `game/` never read the system clock or a global
//! RNG. Given the same seed, settings, timings and timestamped keystrokes,
//! an arcade run yields the same prompts and the same summary on any
//! platform. The `audit` module relies on this to verify exported runs.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod core;
pub mod game;
pub mod metrics;
pub mod session;

// Re-export commonly used types
pub use audit::{verify_run, AnalyticsRun, AuditError, VerificationResult};
pub use core::clock::{Clock, ManualClock, Millis, MonotonicClock};
pub use core::rng::SeededRng;
pub use game::{
    ArcadeEngine, Difficulty, EngineConfig, GamePhase, GameSettings, GameSnapshot, InputAction,
    RawKey, RunSummary,
};
pub use metrics::{calculate_live_metrics, calculate_metrics, KeystrokeEvent, TypingMetrics};
pub use session::{spawn_session, SessionConfig, SessionHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
