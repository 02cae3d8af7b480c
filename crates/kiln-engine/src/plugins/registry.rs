//! Named plugin registry.
//!
//! Configuration lists plugins by name; the registry turns that list into a
//! [`PluginPipeline`] in exactly the configured order.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{KilnPlugin, PluginPipeline};
use crate::builtins::{FileSystemPlugin, ReferenceScannerPlugin};

/// Builds a fresh plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> Arc<dyn KilnPlugin> + Send + Sync>;

/// A configured plugin name with no registered factory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plugin \"{name}\" (available: {})", .available.join(", "))]
pub struct UnknownPlugin {
    pub name: String,
    pub available: Vec<String>,
}

/// Registry mapping plugin names to factories.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    factories: IndexMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in plugins (`fs`, `scanner`).
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(FileSystemPlugin::NAME, || -> Arc<dyn KilnPlugin> {
            Arc::new(FileSystemPlugin::new())
        });
        registry.register(ReferenceScannerPlugin::NAME, || -> Arc<dyn KilnPlugin> {
            Arc::new(ReferenceScannerPlugin::new())
        });
        registry
    }

    /// Register a factory. A later registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn KilnPlugin> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Instantiate the named plugins, preserving `order`.
    pub fn build(&self, order: &[String]) -> Result<PluginPipeline, UnknownPlugin> {
        let mut plugins = Vec::with_capacity(order.len());
        for name in order {
            let factory = self.factories.get(name).ok_or_else(|| UnknownPlugin {
                name: name.clone(),
                available: self.names(),
            })?;
            plugins.push(factory());
        }
        Ok(PluginPipeline::new(plugins))
    }

    /// Get the number of registered plugins
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .finish()
    }
}
