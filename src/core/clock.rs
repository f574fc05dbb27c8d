//! Time sources.
//!
//! The engine never reads the system clock directly. It asks a [`Clock`],
//! which is a real monotonic clock in production and a hand-advanced clock in
//! tests and replays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Milliseconds on a clock's monotonic timeline.
pub type Millis = u64;

/// Source of monotonic and wall time.
pub trait Clock {
    /// Milliseconds since this clock's origin. Never decreases.
    fn now_ms(&self) -> Millis;

    /// Wall-clock time, used only for report timestamps.
    fn wall_time(&self) -> DateTime<Utc>;
}

/// Production clock backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }

    fn wall_time(&self) -> DateTime<Utc> {
        self.wall_origin + ChronoDuration::milliseconds(self.now_ms() as i64)
    }
}

/// Hand-advanced clock for tests and deterministic replay.
///
/// Clones share the same timeline, so a test can keep one handle and give
/// the other to an engine.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
    wall_origin: DateTime<Utc>,
}

impl ManualClock {
    /// Start at 0 ms with the Unix epoch as wall origin.
    pub fn new() -> Self {
        Self::with_wall_origin(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn with_wall_origin(wall_origin: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            wall_origin,
        }
    }

    /// Jump to an absolute time. Earlier times are ignored.
    pub fn set(&self, ms: Millis) {
        self.now.fetch_max(ms, Ordering::SeqCst);
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: Millis) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }

    fn wall_time(&self) -> DateTime<Utc> {
        self.wall_origin + ChronoDuration::milliseconds(self.now_ms() as i64)
    }
}
