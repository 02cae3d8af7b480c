//! Config validation strategies.
//!
//! [`SchemaValidator`] checks the document alone; [`FsValidator`] also checks
//! that entries exist on disk.

use std::path::{Path, PathBuf};

use kiln_engine::PluginRegistry;

use crate::config::KilnConfig;
use crate::dev::{MAX_DEBOUNCE_MS, MIN_DEBOUNCE_MS};
use crate::error::{ConfigError, Result};

pub trait ConfigValidator {
    fn validate(&self, config: &KilnConfig) -> Result<()>;
}

/// Document-only validation.
///
/// ```
/// use kiln_config::{ConfigValidator, EntryConfig, KilnConfig, SchemaValidator};
///
/// let mut config = KilnConfig::default();
/// config.entries.push(EntryConfig::new("index.html"));
/// SchemaValidator::default().validate(&config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    known_plugins: Vec<String>,
}

impl Default for SchemaValidator {
    /// Knows the built-in plugins.
    fn default() -> Self {
        Self::with_registry(&PluginRegistry::with_builtins())
    }
}

impl SchemaValidator {
    pub fn with_registry(registry: &PluginRegistry) -> Self {
        Self {
            known_plugins: registry.names(),
        }
    }
}

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &KilnConfig) -> Result<()> {
        if config.entries.is_empty() {
            return Err(ConfigError::NoEntries);
        }
        for entry in &config.entries {
            if entry.path.trim().is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: "entry path cannot be empty".to_string(),
                    hint: Some("Remove empty strings from `entries`".to_string()),
                });
            }
        }

        for (idx, name) in config.plugins.iter().enumerate() {
            if !self.known_plugins.contains(name) {
                return Err(ConfigError::UnknownPlugin {
                    name: name.clone(),
                    available: self.known_plugins.clone(),
                });
            }
            if config.plugins[..idx].contains(name) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("plugin '{name}' is listed twice"),
                    hint: Some("Each plugin runs once; remove the duplicate".to_string()),
                });
            }
        }

        if !(MIN_DEBOUNCE_MS..=MAX_DEBOUNCE_MS).contains(&config.dev.debounce_ms) {
            return Err(ConfigError::SchemaValidation {
                message: format!(
                    "dev.debounce_ms {} is out of range ({MIN_DEBOUNCE_MS} to {MAX_DEBOUNCE_MS})",
                    config.dev.debounce_ms
                ),
                hint: None,
            });
        }

        if config.out_dir.as_os_str().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "out_dir cannot be empty".to_string(),
                hint: Some("The default is \"dist\"".to_string()),
            });
        }

        Ok(())
    }
}

/// Schema validation plus entry files existing under the configured root.
pub struct FsValidator {
    base_dir: PathBuf,
    schema: SchemaValidator,
}

impl FsValidator {
    /// `base_dir` is the directory the config was loaded from.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            schema: SchemaValidator::default(),
        }
    }

    pub fn with_schema(mut self, schema: SchemaValidator) -> Self {
        self.schema = schema;
        self
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &KilnConfig) -> Result<()> {
        self.schema.validate(config)?;

        let root = config.root_dir(&self.base_dir);
        for entry in &config.entries {
            let path = root.join(entry.path.trim_start_matches('/'));
            if !path.is_file() {
                return Err(ConfigError::EntryNotFound { path });
            }
        }
        Ok(())
    }
}

pub fn validate_schema(config: &KilnConfig) -> Result<()> {
    SchemaValidator::default().validate(config)
}

pub fn validate_fs(config: &KilnConfig, base_dir: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(base_dir).validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryConfig;

    fn config() -> KilnConfig {
        KilnConfig {
            entries: vec![EntryConfig::new("index.html")],
            ..KilnConfig::default()
        }
    }

    #[test]
    fn rejects_missing_entries() {
        let result = validate_schema(&KilnConfig::default());
        assert!(matches!(result, Err(ConfigError::NoEntries)));
    }

    #[test]
    fn accepts_defaults_with_an_entry() {
        assert!(validate_schema(&config()).is_ok());
    }

    #[test]
    fn rejects_unknown_and_duplicate_plugins() {
        let mut unknown = config();
        unknown.plugins.push("minify".into());
        assert!(matches!(
            validate_schema(&unknown),
            Err(ConfigError::UnknownPlugin { name, .. }) if name == "minify"
        ));

        let mut duplicate = config();
        duplicate.plugins.push("fs".into());
        assert!(matches!(
            validate_schema(&duplicate),
            Err(ConfigError::SchemaValidation { .. })
        ));
    }

    #[test]
    fn rejects_debounce_out_of_range() {
        let mut config = config();
        config.dev.debounce_ms = 0;
        assert!(matches!(
            validate_schema(&config),
            Err(ConfigError::SchemaValidation { .. })
        ));
    }

    #[test]
    fn custom_registry_extends_known_plugins() {
        let mut registry = PluginRegistry::with_builtins();
        registry.register("noop", || -> std::sync::Arc<dyn kiln_engine::KilnPlugin> {
            std::sync::Arc::new(kiln_engine::ReferenceScannerPlugin::new())
        });
        let mut config = config();
        config.plugins.push("noop".into());
        assert!(SchemaValidator::with_registry(&registry).validate(&config).is_ok());
    }
}
