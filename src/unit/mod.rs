//! Units: a default template plus the mutable state derived from it
//!
//! A unit starts out with nothing loaded. The first field access (or an
//! explicit `ensure_data`) pulls the default template from its source and
//! copies it into the current state. From then on the current state can
//! drift freely and `reset` copies the defaults back in.

use crate::core::config::{config, CoreConfig};
use crate::core::error::Result;
use crate::core::types::{UnitId, UnitRef};
use crate::data::path::resolve_latest;
use crate::data::template::{JsonTemplateSource, State, Template, TemplateSource};
use crate::schedule::{default_provider, Outcome, Schedule, ScheduleProvider};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

/// Handle used to share a unit between actions and their callers
pub type SharedUnit = Rc<RefCell<Unit>>;

/// Lifecycle of a unit's data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Nothing loaded yet
    Uninitialized,
    /// Defaults loaded and current state derived from them
    Ready,
}

pub struct Unit {
    id: UnitId,
    source: Box<dyn TemplateSource>,
    default: Option<Arc<Template>>,
    current: State,
    schedule: Option<Arc<dyn Schedule>>,
    provider: Arc<dyn ScheduleProvider>,
    config: CoreConfig,
}

impl Unit {
    /// Unit backed by `source`, using the process-wide provider and config
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self::with_provider(source, default_provider())
    }

    /// Unit backed by `source` that resolves missing schedules via `provider`
    pub fn with_provider(
        source: impl TemplateSource + 'static,
        provider: Arc<dyn ScheduleProvider>,
    ) -> Self {
        Self {
            id: UnitId::new(),
            source: Box::new(source),
            default: None,
            current: State::new(),
            schedule: None,
            provider,
            config: config().clone(),
        }
    }

    /// Unit whose defaults come from the newest patch of a JSON data file
    pub fn from_data_file(kind: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(JsonTemplateSource::new(kind, pattern, config()))
    }

    /// Use `config` for `get_path` instead of the global config
    pub fn with_config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn into_shared(self) -> SharedUnit {
        Rc::new(RefCell::new(self))
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn kind(&self) -> &str {
        self.source.kind()
    }

    /// Reference stamped onto outcomes
    pub fn unit_ref(&self) -> UnitRef {
        UnitRef {
            id: self.id,
            kind: self.kind().to_string(),
        }
    }

    pub fn state(&self) -> UnitState {
        if self.default.is_some() {
            UnitState::Ready
        } else {
            UnitState::Uninitialized
        }
    }

    /// Load the default template if it hasn't been loaded yet
    ///
    /// Loading also derives the current state. Later calls do nothing.
    pub fn ensure_data(&mut self) -> Result<()> {
        if self.default.is_some() {
            return Ok(());
        }

        let template = self.source.load()?;
        tracing::debug!(
            "{} {} loaded {} default field(s)",
            self.kind(),
            self.id.0,
            template.len()
        );
        self.current = template.instantiate();
        self.default = Some(template);
        Ok(())
    }

    /// The loaded defaults, if any
    pub fn defaults(&self) -> Option<&Template> {
        self.default.as_deref()
    }

    /// Assign a shared schedule, replacing any previous one
    pub fn set_schedule(&mut self, schedule: Arc<dyn Schedule>) -> &mut Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_schedule(mut self, schedule: Arc<dyn Schedule>) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// This unit's schedule, asking the provider for an auto-stamping one
    /// the first time if none was assigned
    pub fn schedule(&mut self) -> Arc<dyn Schedule> {
        let provider = &self.provider;
        Arc::clone(self.schedule.get_or_insert_with(|| provider.schedule(true)))
    }

    /// Newest data file matching `pattern` under the configured data root
    ///
    /// `Ok(None)` means the root exists but nothing matched.
    pub fn get_path(&self, pattern: &str) -> Result<Option<PathBuf>> {
        resolve_latest(&self.config.data_root, &self.config.data_subdir, pattern)
    }

    /// Replace the current state with a fresh copy of the defaults
    pub fn reset(&mut self) -> Result<&mut Self> {
        self.ensure_data()?;
        if let Some(template) = &self.default {
            self.current = template.instantiate();
        }
        Ok(self)
    }

    /// Stamp `data` as an outcome of this unit at the schedule's current time
    pub fn outcome(&mut self, data: impl Into<Value>, keep: Option<bool>) -> Outcome {
        let timestamp = self.schedule().timestamp();
        Outcome::new(timestamp, self.unit_ref(), data.into(), keep)
    }

    /// Hand an outcome to this unit's schedule; returns whether it was kept
    pub fn record(&mut self, outcome: Outcome) -> bool {
        self.schedule().record(outcome)
    }

    /// Read a field of the current state
    pub fn get(&mut self, name: &str) -> Result<Option<&Value>> {
        self.ensure_data()?;
        Ok(self.current.get(name))
    }

    /// Mutable access to a field, for editing nested values in place
    pub fn get_mut(&mut self, name: &str) -> Result<Option<&mut Value>> {
        self.ensure_data()?;
        Ok(self.current.get_mut(name))
    }

    /// Read a field and deserialize it; `None` if absent or null
    pub fn get_as<T: DeserializeOwned>(&mut self, name: &str) -> Result<Option<T>> {
        match self.get(name)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(T::deserialize(value)?)),
        }
    }

    /// Whether a field exists and is not null
    pub fn has(&mut self, name: &str) -> Result<bool> {
        self.ensure_data()?;
        Ok(self.current.get(name).is_some_and(|value| !value.is_null()))
    }

    /// Write a field, creating it if needed
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.ensure_data()?;
        self.current.insert(name.to_string(), value.into());
        Ok(self)
    }

    /// The whole current state
    pub fn current(&mut self) -> Result<&State> {
        self.ensure_data()?;
        Ok(&self.current)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("current", &self.current)
            .field("schedule", &self.schedule)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CoreError;
    use crate::core::types::Timestamp;
    use crate::data::template::InlineTemplateSource;
    use crate::schedule::{FixedScheduleProvider, Timeline};
    use serde_json::json;
    use std::cell::Cell;

    /// Source that counts how often it was asked to load
    struct CountingSource {
        loads: Rc<Cell<usize>>,
        inner: InlineTemplateSource,
    }

    impl TemplateSource for CountingSource {
        fn kind(&self) -> &str {
            self.inner.kind()
        }

        fn load(&self) -> Result<Arc<Template>> {
            self.loads.set(self.loads.get() + 1);
            self.inner.load()
        }
    }

    struct FailingSource;

    impl TemplateSource for FailingSource {
        fn kind(&self) -> &str {
            "Broken"
        }

        fn load(&self) -> Result<Arc<Template>> {
            Err(CoreError::unavailable("Broken", "no data"))
        }
    }

    fn warrior(timeline: &Arc<Timeline>) -> Unit {
        let provider = Arc::new(FixedScheduleProvider::new(timeline.clone()));
        Unit::with_provider(
            InlineTemplateSource::from_json("Warrior", json!({"hp": 100, "gear": {"sword": 1}})),
            provider,
        )
    }

    #[test]
    fn test_has_loads_once() {
        let loads = Rc::new(Cell::new(0));
        let source = CountingSource {
            loads: loads.clone(),
            inner: InlineTemplateSource::from_json("Warrior", json!({"hp": 100})),
        };
        let provider = Arc::new(FixedScheduleProvider::new(Arc::new(Timeline::auto())));
        let mut unit = Unit::with_provider(source, provider);

        assert_eq!(unit.state(), UnitState::Uninitialized);
        assert!(unit.has("hp").unwrap());
        assert!(!unit.has("mana").unwrap());
        assert_eq!(loads.get(), 1);
        assert_eq!(unit.state(), UnitState::Ready);
    }

    #[test]
    fn test_null_field_is_not_present() {
        let timeline = Arc::new(Timeline::auto());
        let mut unit = warrior(&timeline);
        unit.set("target", Value::Null).unwrap();
        assert!(!unit.has("target").unwrap());
        assert_eq!(unit.get("target").unwrap(), Some(&Value::Null));
    }

    #[test]
    fn test_set_and_reset() {
        let timeline = Arc::new(Timeline::auto());
        let mut unit = warrior(&timeline);

        unit.set("hp", 80).unwrap().set("stance", "defensive").unwrap();
        assert_eq!(unit.get_as::<i64>("hp").unwrap(), Some(80));

        unit.reset().unwrap();
        assert_eq!(unit.get("hp").unwrap(), Some(&json!(100)));
        assert!(!unit.has("stance").unwrap());
    }

    #[test]
    fn test_nested_mutation_does_not_touch_defaults() {
        let timeline = Arc::new(Timeline::auto());
        let mut unit = warrior(&timeline);

        if let Some(gear) = unit.get_mut("gear").unwrap() {
            gear["sword"] = json!(0);
            gear["shield"] = json!(1);
        }

        assert_eq!(unit.get("gear").unwrap(), Some(&json!({"sword": 0, "shield": 1})));
        assert_eq!(unit.defaults().unwrap().get("gear"), Some(&json!({"sword": 1})));
    }

    #[test]
    fn test_load_failure_propagates_from_field_access() {
        let mut unit = Unit::with_provider(
            FailingSource,
            Arc::new(FixedScheduleProvider::new(Arc::new(Timeline::auto()))),
        );
        assert!(matches!(unit.get("hp"), Err(CoreError::DataUnavailable { .. })));
        assert!(matches!(unit.set("hp", 1), Err(CoreError::DataUnavailable { .. })));
        assert_eq!(unit.state(), UnitState::Uninitialized);
    }

    #[test]
    fn test_outcome_stamped_at_call_time() {
        let timeline = Arc::new(Timeline::manual());
        let mut unit = warrior(&timeline);

        timeline.advance_to(Timestamp(3));
        let first = unit.outcome(json!("slash"), None);
        timeline.advance_to(Timestamp(9));
        let second = unit.outcome(json!("parry"), Some(false));

        assert_eq!(first.timestamp(), Timestamp(3));
        assert_eq!(first.keep(), None);
        assert_eq!(second.timestamp(), Timestamp(9));
        assert_eq!(second.keep(), Some(false));
        assert_eq!(second.source(), &unit.unit_ref());
    }

    #[test]
    fn test_set_schedule_replaces_provider_schedule() {
        let fallback = Arc::new(Timeline::auto());
        let mut unit = warrior(&fallback);

        let assigned = Arc::new(Timeline::manual());
        assigned.advance_to(Timestamp(50));
        unit.set_schedule(assigned.clone());

        assert_eq!(unit.outcome(1, None).timestamp(), Timestamp(50));
        assert_eq!(fallback.now(), Timestamp::ZERO);
    }

    #[test]
    fn test_schedule_resolved_once() {
        let timeline = Arc::new(Timeline::auto());
        let mut unit = warrior(&timeline);

        let a = unit.schedule();
        let b = unit.schedule();
        assert_eq!(a.timestamp(), Timestamp(1));
        assert_eq!(b.timestamp(), Timestamp(2));
    }

    #[test]
    fn test_record_goes_to_unit_schedule() {
        let timeline = Arc::new(Timeline::auto());
        let mut unit = warrior(&timeline);

        let outcome = unit.outcome(json!({"damage": 12}), Some(true));
        assert!(unit.record(outcome));
        assert_eq!(timeline.history_for(unit.id()).len(), 1);
    }

    #[test]
    fn test_get_path_uses_unit_config() {
        let root = tempfile::tempdir().unwrap();
        let unit = warrior(&Arc::new(Timeline::auto()))
            .with_config(CoreConfig::default().with_data_root(root.path().join("missing")));

        assert!(matches!(
            unit.get_path("x.json"),
            Err(CoreError::DataDirectoryMissing { .. })
        ));
    }
}
