//! Peak WPM over a sliding time window.

use crate::metrics::calculate::MetricsConfig;
use crate::metrics::keystroke::KeystrokeEvent;
use crate::metrics::{round1, CHARS_PER_WORD, MIN_ELAPSED_MINUTES, MS_PER_MINUTE};

/// Printable keystrokes required before a peak is reported.
pub const MIN_PEAK_KEYSTROKES: usize = 10;

/// Best WPM inside any `window_ms` span of the log.
///
/// Each window is divided by the smaller of the window and the whole log's
/// span, so a short burst is not inflated past what was actually typed.
/// Returns 0 with fewer than [`MIN_PEAK_KEYSTROKES`] printable keydowns.
pub fn peak_wpm(keystrokes: &[KeystrokeEvent], window_ms: u64) -> f64 {
    let times: Vec<u64> = keystrokes
        .iter()
        .filter(|k| k.is_keydown() && k.is_printable())
        .map(|k| k.timestamp)
        .collect();

    if times.len() < MIN_PEAK_KEYSTROKES {
        return 0.0;
    }

    let total_span = times[times.len() - 1].saturating_sub(times[0]);
    let window_minutes =
        (window_ms.min(total_span) as f64 / MS_PER_MINUTE).max(MIN_ELAPSED_MINUTES);

    let mut best = 0usize;
    let mut left = 0usize;
    for right in 0..times.len() {
        while times[right].saturating_sub(times[left]) > window_ms {
            left += 1;
        }
        best = best.max(right - left + 1);
    }

    round1(best as f64 / CHARS_PER_WORD / window_minutes)
}

/// Peak WPM over the configured window.
pub fn peak_wpm_with(keystrokes: &[KeystrokeEvent], config: &MetricsConfig) -> f64 {
    peak_wpm(keystrokes, config.peak_window_ms)
}
