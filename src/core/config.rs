//! Core configuration with documented defaults
//!
//! Everything the data loader and the default schedule need to know about
//! the environment is collected here.

use crate::core::error::{CoreError, Result};
use crate::schedule::RetentionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configured data root
pub const DATA_ROOT_ENV: &str = "HEROES_DATA_PATH";

/// Configuration for data loading and outcome retention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    // === DATA LOADING ===
    /// Root directory holding one sub-directory per data patch
    ///
    /// Layout is `<data_root>/<patch>/<data_subdir>/<file>`. The patch
    /// directory names are only ever compared as strings.
    pub data_root: PathBuf,

    /// Directory inside each patch that holds the data files
    pub data_subdir: String,

    // === SCHEDULE ===
    /// What the default schedule does with outcomes that carry no keep flag
    pub retention: RetentionPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data/heroes"),
            data_subdir: "data".to_string(),
            retention: RetentionPolicy::KeepAll,
        }
    }
}

impl CoreConfig {
    /// Defaults, with the data root taken from `HEROES_DATA_PATH` when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(root) = std::env::var_os(DATA_ROOT_ENV) {
            config.data_root = PathBuf::from(root);
        }
        config
    }

    /// Parse a config from TOML; missing keys fall back to defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CoreConfig =
            toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Builder-style override of the data root
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.data_root.as_os_str().is_empty() {
            return Err(CoreError::Config("data_root must not be empty".into()));
        }

        // The subdir is joined as a single path component
        if self.data_subdir.is_empty() || self.data_subdir.contains(['/', '\\']) {
            return Err(CoreError::Config(format!(
                "data_subdir ({:?}) must be a single directory name",
                self.data_subdir
            )));
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<CoreConfig> = OnceLock::new();

/// Get the global config (initializes from the environment if not set)
pub fn config() -> &'static CoreConfig {
    CONFIG.get_or_init(CoreConfig::from_env)
}

/// Set the global config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: CoreConfig) -> std::result::Result<(), CoreConfig> {
    CONFIG.set(config)
}
