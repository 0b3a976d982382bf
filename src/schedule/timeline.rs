//! In-memory schedule with an inspectable history

use super::{Outcome, RetentionPolicy, Schedule};
use crate::core::types::{Timestamp, UnitId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// How a timeline produces timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampMode {
    /// Every `timestamp()` call advances the clock by one
    Auto,
    /// The clock only moves through `advance_to`
    Manual,
}

/// Schedule that counts time itself and keeps retained outcomes in order
#[derive(Debug)]
pub struct Timeline {
    mode: TimestampMode,
    policy: RetentionPolicy,
    clock: AtomicU64,
    history: Mutex<Vec<Outcome>>,
}

impl Timeline {
    pub fn new(mode: TimestampMode, policy: RetentionPolicy) -> Self {
        Self {
            mode,
            policy,
            clock: AtomicU64::new(0),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Auto-stamping timeline that keeps unflagged outcomes
    pub fn auto() -> Self {
        Self::new(TimestampMode::Auto, RetentionPolicy::KeepAll)
    }

    pub fn manual() -> Self {
        Self::new(TimestampMode::Manual, RetentionPolicy::KeepAll)
    }

    pub fn with_policy(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn mode(&self) -> TimestampMode {
        self.mode
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Latest timestamp handed out (or set), without advancing
    pub fn now(&self) -> Timestamp {
        Timestamp(self.clock.load(Ordering::SeqCst))
    }

    /// Move a manual clock forward; earlier values are ignored
    ///
    /// Auto timelines own their clock, so this does nothing on them and
    /// returns false.
    pub fn advance_to(&self, timestamp: Timestamp) -> bool {
        if self.mode == TimestampMode::Auto {
            tracing::warn!("Ignoring advance_to({}) on an auto timeline", timestamp);
            return false;
        }
        self.clock.fetch_max(timestamp.0, Ordering::SeqCst) < timestamp.0
    }

    /// Retained outcomes in the order they were recorded
    pub fn history(&self) -> Vec<Outcome> {
        self.lock().clone()
    }

    /// Retained outcomes produced by one unit
    pub fn history_for(&self, unit: UnitId) -> Vec<Outcome> {
        self.lock()
            .iter()
            .filter(|outcome| outcome.source().id == unit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return everything retained so far
    pub fn drain(&self) -> Vec<Outcome> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Outcome>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::auto()
    }
}

impl Schedule for Timeline {
    fn timestamp(&self) -> Timestamp {
        match self.mode {
            TimestampMode::Auto => {
                // Saturates at the ceiling instead of wrapping
                let previous = self
                    .clock
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| t.checked_add(1))
                    .unwrap_or(u64::MAX);
                Timestamp(previous).next()
            }
            TimestampMode::Manual => self.now(),
        }
    }

    fn record(&self, outcome: Outcome) -> bool {
        let keep = self.policy.resolve(outcome.keep());
        tracing::debug!(
            "{} outcome from {} at {}",
            if keep { "Keeping" } else { "Discarding" },
            outcome.source(),
            outcome.timestamp()
        );
        if keep {
            self.lock().push(outcome);
        }
        keep
    }
}
