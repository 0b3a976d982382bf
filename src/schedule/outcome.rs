//! Timestamped results of unit actions

use crate::core::types::{Timestamp, UnitRef};
use serde::Serialize;
use serde_json::Value;

/// What an action produced, when, and by whom
///
/// Built by `Unit::outcome`; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    timestamp: Timestamp,
    source: UnitRef,
    data: Value,
    /// `None` lets the schedule apply its own retention policy
    keep: Option<bool>,
}

impl Outcome {
    pub(crate) fn new(
        timestamp: Timestamp,
        source: UnitRef,
        data: Value,
        keep: Option<bool>,
    ) -> Self {
        Self {
            timestamp,
            source,
            data,
            keep,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn source(&self) -> &UnitRef {
        &self.source
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn keep(&self) -> Option<bool> {
        self.keep
    }
}
