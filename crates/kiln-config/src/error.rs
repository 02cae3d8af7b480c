//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no kiln.toml or package.json \"kiln\" field found")]
    NotFound,

    #[error("invalid config value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("invalid profile override: {message}")]
    InvalidProfileOverride { message: String },

    #[error("no entries specified")]
    NoEntries,

    #[error("unknown plugin '{name}' (available: {})", .available.join(", "))]
    UnknownPlugin { name: String, available: Vec<String> },

    #[error("{message}")]
    SchemaValidation {
        message: String,
        hint: Option<String>,
    },

    #[error("entry not found: {}", .path.display())]
    EntryNotFound { path: PathBuf },

    #[error("environment override failed: {0}")]
    Environment(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Suggestion for fixing the problem, when there is one.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::NotFound => Some("Create a kiln.toml in the project root"),
            Self::NoEntries => Some("Add at least one path to `entries`"),
            Self::SchemaValidation { hint, .. } => hint.as_deref(),
            Self::EntryNotFound { .. } => Some("Entries are resolved against `root`"),
            _ => None,
        }
    }
}

impl From<kiln_engine::plugins::UnknownPlugin> for ConfigError {
    fn from(err: kiln_engine::plugins::UnknownPlugin) -> Self {
        Self::UnknownPlugin {
            name: err.name,
            available: err.available,
        }
    }
}
