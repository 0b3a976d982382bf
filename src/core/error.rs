use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unable to locate data directory: {}", root.display())]
    DataDirectoryMissing { root: PathBuf },

    #[error("Unable to enumerate data files for '{pattern}': {source}")]
    NoMatchingDataFile {
        pattern: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Data unavailable for {unit}: {reason}")]
    DataUnavailable { unit: String, reason: String },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl CoreError {
    /// Wrap any loader-level failure as `DataUnavailable` for the given unit kind
    pub fn unavailable(unit: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CoreError::DataUnavailable {
            unit: unit.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
