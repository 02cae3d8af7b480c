//! CLI errors.
//!
//! Commands return [`CliError`]; `main` turns it into a miette report with
//! a hint when one is known.

use std::path::PathBuf;

use kiln_config::ConfigError;
use kiln_engine::EngineError;
use miette::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Engine(#[from] EngineError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Context helpers for results that convert into [`CliError`].
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| CliError::Custom(format!("{}\n\nHint: {hint}", e.into())))
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| CliError::Custom(format!("{msg}: {}", e.into())))
    }
}

fn engine_hint(err: &EngineError) -> Option<&'static str> {
    match err {
        EngineError::Resolution { .. } => {
            Some("Bare specifiers need a plugin that resolves them; relative paths start with ./")
        }
        EngineError::NotFound { .. } => Some("Check the path relative to the referencing file"),
        EngineError::ContractViolation { .. } => {
            Some("The referencing tag or statement expects a different kind of resource")
        }
        EngineError::InvalidOutputPath(_) => Some("Output files must stay inside --out-dir"),
        _ => None,
    }
}

/// Convert a [`CliError`] into a miette report.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => match e.hint() {
            Some(hint) => miette::miette!(help = hint, "Configuration error: {e}"),
            None => miette::miette!("Configuration error: {e}"),
        },
        CliError::Engine(e) => match engine_hint(&e) {
            Some(hint) => miette::miette!(code = e.kind(), help = hint, "{e}"),
            None => miette::miette!(code = e.kind(), "{e}"),
        },
        other => miette::miette!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn with_path_maps_not_found() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result.with_path("kiln.toml").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(path) if path == PathBuf::from("kiln.toml")));
    }

    #[test]
    fn with_hint_appends_hint() {
        let result: Result<()> = Err(CliError::Custom("failed".into()));
        let msg = result.with_hint("try again").unwrap_err().to_string();
        assert_eq!(msg, "failed\n\nHint: try again");
    }

    #[test]
    fn context_prefixes_message() {
        let result: std::result::Result<(), ConfigError> = Err(ConfigError::NoEntries);
        let msg = result.context("loading kiln.toml").unwrap_err().to_string();
        assert_eq!(msg, "loading kiln.toml: Configuration error: no entries specified");
    }

    #[test]
    fn config_errors_carry_help() {
        let report = cli_error_to_miette(CliError::Config(ConfigError::NotFound));
        let help = report.help().map(|h| h.to_string());
        assert_eq!(help.as_deref(), Some("Create a kiln.toml in the project root"));
    }
}
