//! The `KilnConfig` document and profile merging.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use kiln_engine::{
    BuildMode, EntryPoint, PluginPipeline, PluginRegistry, SessionOptions, VersioningStrategy,
};
use kiln_graph::{ResourceKind, ResourceUrl};
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dev::DevConfig;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KilnConfig {
    /// Directory entries resolve against, relative to the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub entries: Vec<EntryConfig>,

    #[serde(default = "default_true")]
    pub versioning: bool,

    #[serde(default)]
    pub versioning_strategy: VersioningStrategy,

    #[serde(default = "default_true")]
    pub hot_update: bool,

    /// Plugin names in pipeline order.
    #[serde(default = "default_plugins")]
    pub plugins: Vec<String>,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    #[serde(default)]
    pub dev: DevConfig,

    /// Partial documents merged over this one by [`KilnConfig::materialize_profile`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Value>,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            root: None,
            entries: Vec::new(),
            versioning: true,
            versioning_strategy: VersioningStrategy::default(),
            hot_update: true,
            plugins: default_plugins(),
            out_dir: default_out_dir(),
            dev: DevConfig::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// One entry point. Accepts a bare path or `{ path, kind }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEntry")]
pub struct EntryConfig {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
}

impl EntryConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Path(String),
    Full {
        path: String,
        #[serde(default)]
        kind: Option<ResourceKind>,
    },
}

impl From<RawEntry> for EntryConfig {
    fn from(raw: RawEntry) -> Self {
        match raw {
            RawEntry::Path(path) => Self { path, kind: None },
            RawEntry::Full { path, kind } => Self { path, kind },
        }
    }
}

impl KilnConfig {
    /// Build from a JSON document, e.g. the `"kiln"` field of `package.json`.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            message: e.to_string(),
        })
    }

    /// Deep-merge the named profile over the base document.
    ///
    /// Objects merge key by key; arrays and scalars replace. `None` returns the
    /// config unchanged.
    pub fn materialize_profile(self, profile: Option<&str>) -> Result<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };
        let overlay = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
        if !overlay.is_object() {
            return Err(ConfigError::InvalidProfileOverride {
                message: format!("profile '{name}' must be a table"),
            });
        }

        let profiles = self.profiles.clone();
        let mut base = self.to_value()?;
        merge_values(&mut base, &overlay);
        let mut merged: KilnConfig =
            serde_json::from_value(base).map_err(|e| ConfigError::InvalidProfileOverride {
                message: e.to_string(),
            })?;
        merged.profiles = profiles;
        tracing::debug!(profile = name, "applied config profile");
        Ok(merged)
    }

    /// Absolute root directory, given the directory the config was loaded from.
    pub fn root_dir(&self, base_dir: &Path) -> PathBuf {
        match &self.root {
            Some(root) => base_dir.join(root).clean(),
            None => base_dir.clean(),
        }
    }

    /// Absolute output directory. `out_dir` is relative to the config directory.
    pub fn out_dir(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.out_dir).clean()
    }

    pub fn session_options(&self, base_dir: &Path, mode: BuildMode) -> Result<SessionOptions> {
        let root_dir = self.root_dir(base_dir);
        let root = ResourceUrl::from_path(&root_dir).map_err(|e| ConfigError::InvalidValue {
            field: "root".to_string(),
            message: e.to_string(),
        })?;

        let options = SessionOptions::new(root)
            .with_mode(mode)
            .with_versioning(self.versioning)
            .with_versioning_strategy(self.versioning_strategy)
            .with_hot_update(self.hot_update);
        Ok(self.entries.iter().fold(options, |options, entry| {
            let point = EntryPoint::new(entry.path.as_str());
            options.with_entry(match entry.kind {
                Some(kind) => point.with_kind(kind),
                None => point,
            })
        }))
    }

    /// Instantiate the configured plugins from `registry`, in order.
    pub fn pipeline(&self, registry: &PluginRegistry) -> Result<PluginPipeline> {
        Ok(registry.build(&self.plugins)?)
    }
}

pub(crate) fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (slot, _) => *slot = update.clone(),
    }
}

fn default_true() -> bool {
    true
}

fn default_plugins() -> Vec<String> {
    vec!["fs".to_string(), "scanner".to_string()]
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entries_accept_paths_and_tables() {
        let config = KilnConfig::from_value(json!({
            "entries": ["index.html", { "path": "src/worker.js", "kind": "module" }]
        }))
        .unwrap();
        assert_eq!(
            config.entries,
            vec![
                EntryConfig::new("index.html"),
                EntryConfig {
                    path: "src/worker.js".into(),
                    kind: Some(ResourceKind::Module),
                },
            ]
        );
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config = KilnConfig::from_value(json!({})).unwrap();
        assert_eq!(config, KilnConfig::default());
        assert_eq!(config.plugins, vec!["fs", "scanner"]);
        assert_eq!(config.dev.debounce_ms, 100);
    }

    #[test]
    fn merge_replaces_arrays_and_merges_objects() {
        let mut base = json!({ "plugins": ["fs", "scanner"], "dev": { "debounce_ms": 100, "ignore": ["dist"] } });
        merge_values(&mut base, &json!({ "plugins": ["scanner"], "dev": { "debounce_ms": 20 } }));
        assert_eq!(
            base,
            json!({ "plugins": ["scanner"], "dev": { "debounce_ms": 20, "ignore": ["dist"] } })
        );
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let result = KilnConfig::default().materialize_profile(Some("missing"));
        assert!(matches!(result, Err(ConfigError::UnknownProfile(name)) if name == "missing"));
    }

    #[test]
    fn session_options_resolve_root() {
        let config = KilnConfig::from_value(json!({
            "root": "site",
            "entries": ["index.html"],
            "versioning_strategy": "indirection",
            "hot_update": false
        }))
        .unwrap();
        let options = config
            .session_options(Path::new("/project"), BuildMode::Build)
            .unwrap();
        assert_eq!(options.root, ResourceUrl::from_path("/project/site").unwrap());
        assert_eq!(options.mode, BuildMode::Build);
        assert_eq!(options.entries, vec![EntryPoint::new("index.html")]);
        assert_eq!(options.versioning_strategy, VersioningStrategy::Indirection);
        assert!(!options.hot_update);
        assert_eq!(config.out_dir(Path::new("/project")), PathBuf::from("/project/dist"));
    }
}
