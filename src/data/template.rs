//! Default-state templates and the sources that load them
//!
//! A `Template` is the baseline a unit resets to. Sources are the only thing
//! that differs between unit types: one reads the newest JSON patch from the
//! data root, another simply hands back a template built in code.

use crate::core::config::CoreConfig;
use crate::core::error::{CoreError, Result};
use crate::data::path::resolve_latest;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

/// Mutable per-unit state, keyed by field name
pub type State = Map<String, Value>;

/// Immutable default state for a unit type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Template {
    fields: State,
}

impl Template {
    pub fn new(fields: State) -> Self {
        Self { fields }
    }

    /// Build a template from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &State {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A fresh state that shares nothing with this template
    pub fn instantiate(&self) -> State {
        self.fields.clone()
    }
}

/// Where a unit type's default data comes from
pub trait TemplateSource {
    /// Name of the unit type, used as the outcome source kind and in errors
    fn kind(&self) -> &str;

    /// Produce the default template
    ///
    /// Any failure is reported as `CoreError::DataUnavailable`.
    fn load(&self) -> Result<Arc<Template>>;
}

/// A template supplied directly, for units defined in code
#[derive(Debug, Clone)]
pub struct InlineTemplateSource {
    kind: String,
    template: Arc<Template>,
}

impl InlineTemplateSource {
    pub fn new(kind: impl Into<String>, template: Template) -> Self {
        Self {
            kind: kind.into(),
            template: Arc::new(template),
        }
    }

    /// Convenience for `json!({...})` literals; non-objects become empty templates
    pub fn from_json(kind: impl Into<String>, value: Value) -> Self {
        Self::new(kind, Template::from_value(value).unwrap_or_default())
    }
}

impl TemplateSource for InlineTemplateSource {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn load(&self) -> Result<Arc<Template>> {
        Ok(Arc::clone(&self.template))
    }
}

/// Resolved file plus the optional selection key
type CacheKey = (PathBuf, Option<String>);

/// Parsed templates keyed by resolved file and selection key
///
/// The resolved path includes the patch directory, so each patch of a file
/// is parsed at most once.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: Mutex<AHashMap<CacheKey, Arc<Template>>>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache shared by sources that don't bring their own
    pub fn shared() -> Arc<TemplateCache> {
        static SHARED: OnceLock<Arc<TemplateCache>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(TemplateCache::new())))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, path: &Path, key: Option<&str>) -> Option<Arc<Template>> {
        self.lock()
            .get(&(path.to_path_buf(), key.map(str::to_string)))
            .cloned()
    }

    fn insert(&self, path: PathBuf, key: Option<String>, template: Arc<Template>) {
        self.lock().insert((path, key), template);
    }

    fn lock(&self) -> MutexGuard<'_, AHashMap<CacheKey, Arc<Template>>> {
        // A poisoned cache only ever holds fully-inserted entries
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Loads a unit type's defaults from the newest patch of a JSON data file
#[derive(Debug, Clone)]
pub struct JsonTemplateSource {
    kind: String,
    pattern: String,
    key: Option<String>,
    data_root: PathBuf,
    data_subdir: String,
    cache: Arc<TemplateCache>,
}

impl JsonTemplateSource {
    /// Source reading `pattern` under the data root of `config`
    pub fn new(
        kind: impl Into<String>,
        pattern: impl Into<String>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            kind: kind.into(),
            pattern: pattern.into(),
            key: None,
            data_root: config.data_root.clone(),
            data_subdir: config.data_subdir.clone(),
            cache: TemplateCache::shared(),
        }
    }

    /// Use the object stored under `key` instead of the whole file
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_cache(mut self, cache: Arc<TemplateCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Newest matching file, or `None` if the data root has no match
    pub fn resolve(&self) -> Result<Option<PathBuf>> {
        resolve_latest(&self.data_root, &self.data_subdir, &self.pattern)
    }

    fn parse(&self, path: &Path) -> Result<Template> {
        let unavailable = |e: &dyn std::fmt::Display| {
            CoreError::unavailable(&self.kind, format!("{}: {}", path.display(), e))
        };
        let content = std::fs::read_to_string(path).map_err(|e| unavailable(&e))?;
        let mut value: Value = serde_json::from_str(&content).map_err(|e| unavailable(&e))?;

        if let Some(key) = &self.key {
            value = value.get_mut(key).map(Value::take).ok_or_else(|| {
                CoreError::unavailable(
                    &self.kind,
                    format!("{}: no entry named '{}'", path.display(), key),
                )
            })?;
        }

        Template::from_value(value).ok_or_else(|| unavailable(&"expected a JSON object"))
    }
}

impl TemplateSource for JsonTemplateSource {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn load(&self) -> Result<Arc<Template>> {
        let path = self
            .resolve()
            .map_err(|e| CoreError::unavailable(&self.kind, e))?
            .ok_or_else(|| {
                CoreError::unavailable(
                    &self.kind,
                    format!("no data file matches '{}'", self.pattern),
                )
            })?;

        if let Some(template) = self.cache.get(&path, self.key.as_deref()) {
            return Ok(template);
        }

        let template = Arc::new(self.parse(&path)?);
        tracing::debug!(
            "Loaded {} template ({} fields) from {}",
            self.kind,
            template.len(),
            path.display()
        );
        self.cache.insert(path, self.key.clone(), Arc::clone(&template));
        Ok(template)
    }
}
