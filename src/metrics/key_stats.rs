//! Per-key statistics and trouble-key detection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metrics::calculate::MetricsConfig;
use crate::metrics::keystroke::KeystrokeEvent;
use crate::metrics::{round1, MIN_TROUBLE_ATTEMPTS};

/// Aggregate for one expected key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStatistics {
    pub total_attempts: u32,
    pub correct_attempts: u32,
    /// 0-100
    pub accuracy: f64,
    /// Running mean of the delay before correct attempts, ms
    pub average_speed: f64,
    /// Samples behind `average_speed`
    pub speed_samples: u32,
}

impl KeyStatistics {
    fn record(&mut self, correct: bool, delay_ms: Option<u64>) {
        self.total_attempts += 1;
        if correct {
            self.correct_attempts += 1;
            if let Some(delay) = delay_ms {
                self.speed_samples += 1;
                self.average_speed +=
                    (delay as f64 - self.average_speed) / f64::from(self.speed_samples);
            }
        }
        self.accuracy =
            f64::from(self.correct_attempts) / f64::from(self.total_attempts) * 100.0;
    }
}

/// A key that falls below the accuracy threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TroubleKey {
    pub key: char,
    pub accuracy: f64,
    pub total_attempts: u32,
}

/// Aggregate an annotated log per expected key.
///
/// Only keydowns carrying a single-character `expected_key` are counted. The
/// delay for a correct attempt is measured from the previous counted keydown,
/// so the first attempt contributes no speed sample.
pub fn key_statistics(log: &[KeystrokeEvent]) -> BTreeMap<char, KeyStatistics> {
    let mut stats: BTreeMap<char, KeyStatistics> = BTreeMap::new();
    let mut previous: Option<u64> = None;

    for event in log.iter().filter(|e| e.is_keydown()) {
        let Some(expected) = event.expected_key.as_deref() else {
            continue;
        };
        let mut chars = expected.chars();
        let (Some(key), None) = (chars.next(), chars.next()) else {
            continue;
        };

        let delay = previous.map(|p| event.timestamp.saturating_sub(p));
        let correct = event.key == expected;
        stats.entry(key).or_default().record(correct, delay);
        previous = Some(event.timestamp);
    }

    for stat in stats.values_mut() {
        stat.accuracy = round1(stat.accuracy);
        stat.average_speed = round1(stat.average_speed);
    }

    stats
}

/// Keys with enough attempts and accuracy below `threshold`, worst first.
///
/// Ties are broken by key so the order is stable.
pub fn trouble_keys(stats: &BTreeMap<char, KeyStatistics>, threshold: f64) -> Vec<TroubleKey> {
    let mut trouble: Vec<TroubleKey> = stats
        .iter()
        .filter(|(_, s)| s.total_attempts >= MIN_TROUBLE_ATTEMPTS && s.accuracy < threshold)
        .map(|(&key, s)| TroubleKey {
            key,
            accuracy: s.accuracy,
            total_attempts: s.total_attempts,
        })
        .collect();

    trouble.sort_by(|a, b| a.accuracy.total_cmp(&b.accuracy).then(a.key.cmp(&b.key)));
    trouble
}

/// Trouble keys below the configured threshold.
pub fn trouble_keys_with(
    stats: &BTreeMap<char, KeyStatistics>,
    config: &MetricsConfig,
) -> Vec<TroubleKey> {
    trouble_keys(stats, config.trouble_threshold)
}
