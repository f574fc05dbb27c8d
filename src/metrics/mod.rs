//! Typing Metrics Engine
//!
//! Stateless calculators over a keystroke log. The log is owned by the caller;
//! every function is a pure function of its arguments.
//!
//! ## Module Structure
//!
//! - `keystroke`: Keystroke events, buffer replay, session recorder
//! - `calculate`: Whole-session and live metrics, consistency
//! - `key_stats`: Per-key accuracy/speed and trouble keys
//! - `peak`: Peak WPM over a sliding window

pub mod calculate;
pub mod key_stats;
pub mod keystroke;
pub mod peak;

// Re-export key types
pub use calculate::{
    calculate_live_metrics, calculate_live_metrics_with, calculate_metrics,
    calculate_metrics_with, consistency, LiveMetrics, MetricsConfig, TypingMetrics,
};
pub use key_stats::{key_statistics, trouble_keys, trouble_keys_with, KeyStatistics, TroubleKey};
pub use keystroke::{replay_buffer, BufferReplay, KeyEventType, KeystrokeEvent, KeystrokeRecorder};
pub use peak::{peak_wpm, peak_wpm_with};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Characters per "word" in every WPM figure.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Elapsed-time floor, in minutes (600 ms).
pub const MIN_ELAPSED_MINUTES: f64 = 0.01;

pub const MS_PER_MINUTE: f64 = 60_000.0;

/// Expected texts shorter than this use accuracy-weighted net WPM.
///
/// The per-error penalty is too harsh on a handful of characters. The cutoff
/// is a calibration point rather than a hard rule.
pub const SHORT_TEXT_THRESHOLD: usize = 25;

/// Trailing window for live WPM.
pub const DEFAULT_LIVE_WINDOW_MS: u64 = 10_000;

/// Keys below this accuracy are trouble keys.
pub const DEFAULT_TROUBLE_THRESHOLD: f64 = 85.0;

/// Attempts needed before a key can be flagged.
pub const MIN_TROUBLE_ATTEMPTS: u32 = 3;

/// Sliding window for peak WPM.
pub const DEFAULT_PEAK_WINDOW_MS: u64 = 10_000;

/// Round to one decimal place.
#[inline]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
