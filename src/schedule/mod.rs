//! Schedules: timestamp sources and outcome sinks shared across units

pub mod outcome;
pub mod provider;
pub mod timeline;

pub use outcome::Outcome;
pub use provider::{
    default_provider, set_default_provider, DefaultScheduleProvider, FixedScheduleProvider,
    ScheduleProvider,
};
pub use timeline::{Timeline, TimestampMode};

use crate::core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// What a schedule does with an outcome that carries no keep flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    #[default]
    KeepAll,
    DiscardAll,
}

impl RetentionPolicy {
    /// Decide retention for a tri-state keep flag
    pub fn resolve(self, keep: Option<bool>) -> bool {
        keep.unwrap_or(self == RetentionPolicy::KeepAll)
    }
}

/// A timeline shared by many units
///
/// Units only ever hold an `Arc<dyn Schedule>`, so implementations do their
/// own synchronization.
pub trait Schedule: Send + Sync + std::fmt::Debug {
    /// The stamp for something happening now
    fn timestamp(&self) -> Timestamp;

    /// Offer a finished outcome; returns whether it was retained
    fn record(&self, outcome: Outcome) -> bool;
}
