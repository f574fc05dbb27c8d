//! Cancellable one-shot timers.
//!
//! The engine never sleeps. It schedules timers here and fires the ones that
//! are due when polled. Each timer carries the run epoch it was scheduled in
//! so a stale one is recognised after a restart.

use std::collections::BTreeMap;

use crate::core::clock::Millis;

/// Cancellation handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// What a timer does when it fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Next countdown step
    CountdownTick { epoch: u64 },
    /// Hard deadline of a round
    RoundDeadline { epoch: u64, round: u32 },
    /// End of the pause after a cleared round
    NextRound { epoch: u64, round: u32 },
}

/// Timers ordered by due time, ties by scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    queue: BTreeMap<(Millis, TimerId), TimerKind>,
    due_by_id: BTreeMap<TimerId, Millis>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Millis, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((due, id), kind);
        self.due_by_id.insert(id, due);
        id
    }

    /// Returns false if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.due_by_id.remove(&id) {
            Some(due) => self.queue.remove(&(due, id)).is_some(),
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.queue.clear();
        self.due_by_id.clear();
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(Millis, TimerKind)> {
        let (&(due, id), _) = self.queue.first_key_value()?;
        if due > now {
            return None;
        }
        self.due_by_id.remove(&id);
        self.queue.remove(&(due, id)).map(|kind| (due, kind))
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
