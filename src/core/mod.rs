//! Core deterministic primitives.
//!
//! Everything a run derives from its seed goes through this module.

pub mod clock;
pub mod hash;
pub mod rng;

// Re-export core types
pub use clock::{Clock, ManualClock, Millis, MonotonicClock};
pub use hash::{compute_run_fingerprint, Fingerprint, RunHasher};
pub use rng::SeededRng;
