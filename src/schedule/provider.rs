//! Where units get a schedule when nobody assigned one
//!
//! Units are built with an explicit provider. The process-wide default below
//! only exists for call sites that don't care; tests swap it out with
//! `set_default_provider`.

use super::{RetentionPolicy, Schedule, Timeline, TimestampMode};
use crate::core::config::config;
use std::sync::{Arc, OnceLock, RwLock};

/// Hands out schedules to units that have none
pub trait ScheduleProvider: Send + Sync {
    /// A schedule; `auto` asks for one that generates its own timestamps
    fn schedule(&self, auto: bool) -> Arc<dyn Schedule>;
}

/// Lazily creates one shared timeline per timestamp mode
#[derive(Debug, Default)]
pub struct DefaultScheduleProvider {
    policy: Option<RetentionPolicy>,
    auto: OnceLock<Arc<Timeline>>,
    manual: OnceLock<Arc<Timeline>>,
}

impl DefaultScheduleProvider {
    /// Provider whose timelines use the global config's retention policy
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: RetentionPolicy) -> Self {
        Self {
            policy: Some(policy),
            ..Self::default()
        }
    }

    /// The shared auto-stamping timeline, created on first use
    pub fn auto_timeline(&self) -> Arc<Timeline> {
        Arc::clone(self.auto.get_or_init(|| self.create(TimestampMode::Auto)))
    }

    pub fn manual_timeline(&self) -> Arc<Timeline> {
        Arc::clone(self.manual.get_or_init(|| self.create(TimestampMode::Manual)))
    }

    fn create(&self, mode: TimestampMode) -> Arc<Timeline> {
        let policy = self.policy.unwrap_or(config().retention);
        tracing::debug!("Creating default {:?} timeline ({:?})", mode, policy);
        Arc::new(Timeline::new(mode, policy))
    }
}

impl ScheduleProvider for DefaultScheduleProvider {
    fn schedule(&self, auto: bool) -> Arc<dyn Schedule> {
        if auto {
            self.auto_timeline()
        } else {
            self.manual_timeline()
        }
    }
}

/// Always returns the same schedule, whatever mode is asked for
#[derive(Debug, Clone)]
pub struct FixedScheduleProvider {
    schedule: Arc<dyn Schedule>,
}

impl FixedScheduleProvider {
    pub fn new(schedule: Arc<dyn Schedule>) -> Self {
        Self { schedule }
    }
}

impl ScheduleProvider for FixedScheduleProvider {
    fn schedule(&self, _auto: bool) -> Arc<dyn Schedule> {
        Arc::clone(&self.schedule)
    }
}

// === GLOBAL PROVIDER ACCESS ===

static DEFAULT_PROVIDER: RwLock<Option<Arc<dyn ScheduleProvider>>> = RwLock::new(None);

/// The process-wide provider (a `DefaultScheduleProvider` unless replaced)
pub fn default_provider() -> Arc<dyn ScheduleProvider> {
    if let Some(provider) = DEFAULT_PROVIDER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
    {
        return Arc::clone(provider);
    }

    let mut slot = DEFAULT_PROVIDER.write().unwrap_or_else(|e| e.into_inner());
    Arc::clone(slot.get_or_insert_with(|| Arc::new(DefaultScheduleProvider::new())))
}

/// Replace the process-wide provider, returning the previous one
///
/// Only affects units that resolve their schedule after the swap.
pub fn set_default_provider(
    provider: Arc<dyn ScheduleProvider>,
) -> Option<Arc<dyn ScheduleProvider>> {
    DEFAULT_PROVIDER
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .replace(provider)
}
