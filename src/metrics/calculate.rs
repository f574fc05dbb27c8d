//! Session Metrics
//!
//! Whole-session and live (windowed) metrics over a keystroke log. Every
//! function here is total: degenerate input produces neutral values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::keystroke::{replay_buffer, KeystrokeEvent};
use crate::metrics::{
    round1, CHARS_PER_WORD, DEFAULT_LIVE_WINDOW_MS, DEFAULT_PEAK_WINDOW_MS,
    DEFAULT_TROUBLE_THRESHOLD, MIN_ELAPSED_MINUTES, MS_PER_MINUTE, SHORT_TEXT_THRESHOLD,
};

/// Tunables for the calculators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Expected texts shorter than this use accuracy-weighted net WPM
    pub short_text_threshold: usize,
    /// Trailing window for live WPM
    pub live_window_ms: u64,
    /// Accuracy below which a key is trouble
    pub trouble_threshold: f64,
    /// Sliding window for peak WPM
    pub peak_window_ms: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            short_text_threshold: SHORT_TEXT_THRESHOLD,
            live_window_ms: DEFAULT_LIVE_WINDOW_MS,
            trouble_threshold: DEFAULT_TROUBLE_THRESHOLD,
            peak_window_ms: DEFAULT_PEAK_WINDOW_MS,
        }
    }
}

/// Whole-session metrics snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypingMetrics {
    pub gross_wpm: f64,
    pub net_wpm: f64,
    /// 0-100
    pub accuracy: f64,
    /// Characters left in the buffer
    pub chars_typed: u32,
    /// Uncorrected errors
    pub errors: u32,
    pub duration_ms: u64,
    /// Expected character -> times it was mistyped
    pub error_map: BTreeMap<String, u32>,
}

/// Windowed snapshot for in-progress display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    pub current_wpm: f64,
    pub current_accuracy: f64,
    pub keystrokes_per_minute: f64,
    /// Mean keydown-to-keydown delay, ms
    pub average_key_delay: f64,
    /// Milliseconds since the first keystroke
    pub time_elapsed: u64,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            current_wpm: 0.0,
            current_accuracy: 100.0,
            keystrokes_per_minute: 0.0,
            average_key_delay: 0.0,
            time_elapsed: 0,
        }
    }
}

#[inline]
fn minutes(ms: u64) -> f64 {
    (ms as f64 / MS_PER_MINUTE).max(MIN_ELAPSED_MINUTES)
}

/// Compute whole-session metrics with default tunables.
pub fn calculate_metrics(keystrokes: &[KeystrokeEvent], expected_text: &str) -> TypingMetrics {
    calculate_metrics_with(keystrokes, expected_text, &MetricsConfig::default())
}

/// Compute whole-session metrics.
///
/// Gross WPM counts every printable keydown (corrected mistakes included) over
/// the span between the first and last event. Net WPM subtracts uncorrected
/// errors per minute, except on short texts where it is gross WPM weighted by
/// accuracy.
pub fn calculate_metrics_with(
    keystrokes: &[KeystrokeEvent],
    expected_text: &str,
    config: &MetricsConfig,
) -> TypingMetrics {
    if keystrokes.is_empty() {
        return TypingMetrics::default();
    }

    let replay = replay_buffer(keystrokes);
    let duration_ms = replay.elapsed_ms();
    let elapsed_minutes = minutes(duration_ms);

    let gross_wpm = f64::from(replay.printable_keydowns) / CHARS_PER_WORD / elapsed_minutes;

    let tally = replay.compare(expected_text);
    let accuracy = replay.accuracy(tally.errors, 0.0);

    let net_wpm = if expected_text.chars().count() < config.short_text_threshold {
        gross_wpm * accuracy / 100.0
    } else {
        (gross_wpm - f64::from(tally.errors) / elapsed_minutes).max(0.0)
    };

    TypingMetrics {
        gross_wpm: round1(gross_wpm),
        net_wpm: round1(net_wpm),
        accuracy: round1(accuracy),
        chars_typed: replay.len() as u32,
        errors: tally.errors,
        duration_ms,
        error_map: tally.error_map,
    }
}

/// Compute the live snapshot at `now_ms`.
///
/// Current WPM only looks at printable keydowns inside the trailing window;
/// accuracy, keystrokes per minute and key delay cover the whole session.
/// An empty window reports 0 WPM and 100% accuracy.
pub fn calculate_live_metrics(
    keystrokes: &[KeystrokeEvent],
    expected_text: &str,
    window_ms: u64,
    now_ms: u64,
) -> LiveMetrics {
    let Some(first) = keystrokes.first() else {
        return LiveMetrics::default();
    };

    let time_elapsed = now_ms.saturating_sub(first.timestamp);

    let keydown_times: Vec<u64> = keystrokes
        .iter()
        .filter(|k| k.is_keydown())
        .map(|k| k.timestamp)
        .collect();

    let keystrokes_per_minute = keydown_times.len() as f64 / minutes(time_elapsed);

    let average_key_delay = if keydown_times.len() < 2 {
        0.0
    } else {
        let total: u64 = keydown_times
            .windows(2)
            .map(|pair| pair[1].saturating_sub(pair[0]))
            .sum();
        total as f64 / (keydown_times.len() - 1) as f64
    };

    let cutoff = now_ms.saturating_sub(window_ms);
    let windowed: Vec<u64> = keystrokes
        .iter()
        .filter(|k| k.is_keydown() && k.is_printable() && k.timestamp >= cutoff)
        .map(|k| k.timestamp)
        .collect();

    let (current_wpm, current_accuracy) = match windowed.first() {
        None => (0.0, 100.0),
        Some(&window_start) => {
            let span = now_ms.saturating_sub(window_start).min(window_ms);
            let wpm = windowed.len() as f64 / CHARS_PER_WORD / minutes(span);

            let replay = replay_buffer(keystrokes);
            let tally = replay.compare(expected_text);
            (wpm, replay.accuracy(tally.errors, 100.0))
        }
    };

    LiveMetrics {
        current_wpm: round1(current_wpm),
        current_accuracy: round1(current_accuracy),
        keystrokes_per_minute: round1(keystrokes_per_minute),
        average_key_delay: round1(average_key_delay),
        time_elapsed,
    }
}

/// Live snapshot using the configured trailing window.
pub fn calculate_live_metrics_with(
    keystrokes: &[KeystrokeEvent],
    expected_text: &str,
    now_ms: u64,
    config: &MetricsConfig,
) -> LiveMetrics {
    calculate_live_metrics(keystrokes, expected_text, config.live_window_ms, now_ms)
}

/// WPM consistency across samples, as a percentage.
///
/// One minus the coefficient of variation (population standard deviation over
/// mean), clamped to [0, 100]. Fewer than two samples or a zero mean count as
/// perfectly consistent.
pub fn consistency(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 100.0;
    }

    // Welford
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &value) in samples.iter().enumerate() {
        let delta = value - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (value - mean);
    }

    if mean == 0.0 {
        return 100.0;
    }

    let std_dev = (m2 / samples.len() as f64).sqrt();
    let cv = std_dev / mean;
    round1(((1.0 - cv.min(1.0)) * 100.0).max(0.0))
}

// =============================================================================
// TESTS
// =============================================================================
