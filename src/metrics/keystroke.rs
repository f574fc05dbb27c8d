//! Keystroke Log and Buffer Replay
//!
//! A session's keystrokes are an append-only log. Every calculator in this
//! module tree reads the log through [`replay_buffer`], which simulates the
//! text buffer the typist produced.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key name that removes the last buffered character.
pub const BACKSPACE_KEY: &str = "Backspace";

/// Error-map bucket for characters typed past the end of the expected text.
pub const UNKNOWN_KEY: &str = "unknown";

// =============================================================================
// KEYSTROKE EVENT
// =============================================================================

/// Physical key action kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum KeyEventType {
    #[default]
    KeyDown,
    KeyUp,
}

/// One physical key action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystrokeEvent {
    /// Platform key code
    pub key_code: u32,

    /// Literal character (`"a"`, `" "`) or named key (`"Shift"`, `"Backspace"`)
    pub key: String,

    pub event_type: KeyEventType,

    /// Monotonic milliseconds
    pub timestamp: u64,

    /// Character the typist was supposed to produce, when known
    #[serde(default)]
    pub expected_key: Option<String>,
}

impl KeystrokeEvent {
    /// Keydown for `key` at `timestamp`.
    pub fn keydown(key: impl Into<String>, timestamp: u64) -> Self {
        let key = key.into();
        let key_code = key.chars().next().map(|c| c as u32).unwrap_or(0);
        Self {
            key_code,
            key,
            event_type: KeyEventType::KeyDown,
            timestamp,
            expected_key: None,
        }
    }

    /// Keyup for `key` at `timestamp`.
    pub fn keyup(key: impl Into<String>, timestamp: u64) -> Self {
        Self {
            event_type: KeyEventType::KeyUp,
            ..Self::keydown(key, timestamp)
        }
    }

    /// Attach the expected character.
    pub fn expecting(mut self, expected: impl Into<String>) -> Self {
        self.expected_key = Some(expected.into());
        self
    }

    #[inline]
    pub fn is_keydown(&self) -> bool {
        self.event_type == KeyEventType::KeyDown
    }

    /// Single-character keys produce text; named keys do not.
    #[inline]
    pub fn is_printable(&self) -> bool {
        let mut chars = self.key.chars();
        chars.next().is_some() && chars.next().is_none()
    }

    #[inline]
    pub fn is_backspace(&self) -> bool {
        self.key == BACKSPACE_KEY
    }

    /// The typed character, for printable keys.
    pub fn typed_char(&self) -> Option<char> {
        if self.is_printable() {
            self.key.chars().next()
        } else {
            None
        }
    }

    /// Whether the typed key matched the expected one. `None` when no
    /// expectation was recorded.
    pub fn is_correct(&self) -> Option<bool> {
        self.expected_key.as_ref().map(|expected| *expected == self.key)
    }
}

// =============================================================================
// BUFFER REPLAY
// =============================================================================

/// Result of comparing a replayed buffer with expected text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorTally {
    pub errors: u32,
    pub error_map: BTreeMap<String, u32>,
}

/// Simulated text buffer plus the counters every calculator needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferReplay {
    /// Characters left in the buffer after backspaces
    pub buffer: Vec<char>,

    /// Printable keydowns (effort, including later-corrected characters)
    pub printable_keydowns: u32,

    /// All keydowns, named keys included
    pub keydowns: u32,

    /// First timestamp in the log
    pub first_timestamp: Option<u64>,

    /// Last timestamp in the log
    pub last_timestamp: Option<u64>,
}

impl BufferReplay {
    /// Milliseconds between the first and last logged event.
    pub fn elapsed_ms(&self) -> u64 {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => last.saturating_sub(first),
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Compare the buffer position by position with `expected`.
    ///
    /// Characters past the end of `expected` count as errors under
    /// [`UNKNOWN_KEY`].
    pub fn compare(&self, expected: &str) -> ErrorTally {
        let mut tally = ErrorTally::default();
        let mut expected_chars = expected.chars();

        for &typed in &self.buffer {
            match expected_chars.next() {
                Some(want) if want == typed => {}
                Some(want) => {
                    tally.errors += 1;
                    *tally.error_map.entry(want.to_string()).or_insert(0) += 1;
                }
                None => {
                    tally.errors += 1;
                    *tally.error_map.entry(UNKNOWN_KEY.to_string()).or_insert(0) += 1;
                }
            }
        }

        tally
    }

    /// Share of buffered characters that are correct, in percent.
    ///
    /// Returns `empty_value` when nothing is buffered.
    pub fn accuracy(&self, errors: u32, empty_value: f64) -> f64 {
        if self.buffer.is_empty() {
            return empty_value;
        }
        let len = self.buffer.len() as f64;
        ((len - f64::from(errors)) / len * 100.0).clamp(0.0, 100.0)
    }
}

/// Replay a keystroke log into a simulated buffer.
///
/// Printable keydowns append, `Backspace` keydowns pop, and every other key
/// only counts toward `keydowns`. Keyups never touch the buffer.
pub fn replay_buffer(keystrokes: &[KeystrokeEvent]) -> BufferReplay {
    let mut replay = BufferReplay {
        first_timestamp: keystrokes.first().map(|k| k.timestamp),
        last_timestamp: keystrokes.last().map(|k| k.timestamp),
        ..BufferReplay::default()
    };

    for event in keystrokes.iter().filter(|k| k.is_keydown()) {
        replay.keydowns += 1;

        if event.is_backspace() {
            replay.buffer.pop();
        } else if let Some(c) = event.typed_char() {
            replay.buffer.push(c);
            replay.printable_keydowns += 1;
        }
    }

    replay
}

// =============================================================================
// RECORDER
// =============================================================================

/// Session-scoped append-only keystroke log.
///
/// Timestamps are kept non-decreasing: an event stamped earlier than the last
/// recorded one is clamped to it.
#[derive(Clone, Debug, Default)]
pub struct KeystrokeRecorder {
    events: Vec<KeystrokeEvent>,
}

impl KeystrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, clamping an out-of-order timestamp.
    pub fn record(&mut self, mut event: KeystrokeEvent) {
        if let Some(last) = self.events.last() {
            if event.timestamp < last.timestamp {
                tracing::debug!(
                    got = event.timestamp,
                    last = last.timestamp,
                    "clamping out-of-order keystroke"
                );
                event.timestamp = last.timestamp;
            }
        }
        self.events.push(event);
    }

    /// Discard the log when the session resets.
    pub fn reset(&mut self) {
        self.events.clear();
    }

    pub fn events(&self) -> &[KeystrokeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str, start: u64, step: u64) -> Vec<KeystrokeEvent> {
        text.chars()
            .enumerate()
            .map(|(i, c)| KeystrokeEvent::keydown(c.to_string(), start + i as u64 * step))
            .collect()
    }

    #[test]
    fn test_printable_detection() {
        assert!(KeystrokeEvent::keydown("a", 0).is_printable());
        assert!(KeystrokeEvent::keydown(" ", 0).is_printable());
        assert!(KeystrokeEvent::keydown("é", 0).is_printable());
        assert!(!KeystrokeEvent::keydown("Shift", 0).is_printable());
        assert!(!KeystrokeEvent::keydown("", 0).is_printable());
        assert!(KeystrokeEvent::keydown("Backspace", 0).is_backspace());
    }

    #[test]
    fn test_replay_backspace_and_named_keys() {
        let mut log = typed("abx", 0, 100);
        log.push(KeystrokeEvent::keydown("Backspace", 300));
        log.push(KeystrokeEvent::keydown("Shift", 350));
        log.push(KeystrokeEvent::keyup("Shift", 360));
        log.push(KeystrokeEvent::keydown("C", 400));

        let replay = replay_buffer(&log);
        assert_eq!(replay.buffer, vec!['a', 'b', 'C']);
        assert_eq!(replay.printable_keydowns, 4);
        assert_eq!(replay.keydowns, 6);
        assert_eq!(replay.elapsed_ms(), 400);
    }

    #[test]
    fn test_backspace_on_empty_buffer() {
        let log = vec![KeystrokeEvent::keydown("Backspace", 0)];
        let replay = replay_buffer(&log);
        assert!(replay.is_empty());
        assert_eq!(replay.keydowns, 1);
    }

    #[test]
    fn test_compare_attributes_errors() {
        let replay = replay_buffer(&typed("thx cats", 0, 10));
        let tally = replay.compare("the cat");

        // 'x' for 'e', and the trailing 's' runs past the end
        assert_eq!(tally.errors, 2);
        assert_eq!(tally.error_map.get("e"), Some(&1));
        assert_eq!(tally.error_map.get(UNKNOWN_KEY), Some(&1));
    }

    #[test]
    fn test_accuracy_empty_value() {
        let replay = replay_buffer(&[]);
        assert_eq!(replay.accuracy(0, 100.0), 100.0);
        assert_eq!(replay.accuracy(0, 0.0), 0.0);
    }

    #[test]
    fn test_recorder_clamps_out_of_order() {
        let mut recorder = KeystrokeRecorder::new();
        recorder.record(KeystrokeEvent::keydown("a", 500));
        recorder.record(KeystrokeEvent::keydown("b", 200));

        assert_eq!(recorder.events()[1].timestamp, 500);

        recorder.reset();
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_is_correct() {
        let hit = KeystrokeEvent::keydown("a", 0).expecting("a");
        let miss = KeystrokeEvent::keydown("s", 0).expecting("a");
        assert_eq!(hit.is_correct(), Some(true));
        assert_eq!(miss.is_correct(), Some(false));
        assert_eq!(KeystrokeEvent::keydown("a", 0).is_correct(), None);
    }
}
