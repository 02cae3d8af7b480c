//! Finding and loading `kiln.toml` / `package.json`.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::KilnConfig;
use crate::error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "kiln.toml";
pub const PACKAGE_JSON_FIELD: &str = "kiln";
/// Prefix of the environment overrides (`KILN_VERSIONING`, `KILN_HOT_UPDATE`).
pub const ENV_PREFIX: &str = "KILN_";

#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    versioning: Option<bool>,
    hot_update: Option<bool>,
}

/// Locates the project config under a directory and loads it.
///
/// Precedence, lowest first: file contents, the selected profile, environment.
///
/// ```no_run
/// use kiln_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").with_profile("ci").load().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    root: PathBuf,
    profile: Option<String>,
    env: bool,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            profile: None,
            env: true,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Skip the `KILN_*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.env = false;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `kiln.toml` first, then a `package.json` with a non-null `"kiln"` field.
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.is_file() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed: Value = serde_json::from_str(&content).ok()?;
        parsed
            .get(PACKAGE_JSON_FIELD)
            .is_some_and(|field| !field.is_null())
            .then_some(pkg_path)
    }

    /// # Errors
    ///
    /// [`ConfigError::NotFound`] when [`ConfigDiscovery::find`] finds nothing.
    pub fn load(&self) -> Result<KilnConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        self.load_from(&path)
    }

    /// Like [`ConfigDiscovery::load`], but starts from defaults when there is no file.
    pub fn load_or_default(&self) -> Result<KilnConfig> {
        match self.find() {
            Some(path) => self.load_from(&path),
            None => self.finish(KilnConfig::default()),
        }
    }

    /// Load a specific file, `kiln.toml`-shaped TOML or a `package.json`.
    pub fn load_from(&self, path: &Path) -> Result<KilnConfig> {
        debug!(path = %path.display(), "loading config");
        let value = if path.file_name() == Some(OsStr::new("package.json")) {
            package_json_value(path)?
        } else {
            toml_value(path)?
        };
        self.finish(KilnConfig::from_value(value)?)
    }

    fn finish(&self, config: KilnConfig) -> Result<KilnConfig> {
        let mut config = config.materialize_profile(self.profile.as_deref())?;
        if self.env {
            apply_env(&mut config)?;
        }
        Ok(config)
    }
}

fn toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| ConfigError::InvalidValue {
        field: path.display().to_string(),
        message: format!("invalid TOML: {e}"),
    })?;
    serde_json::to_value(table).map_err(|e| ConfigError::InvalidValue {
        field: path.display().to_string(),
        message: e.to_string(),
    })
}

fn package_json_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    let mut parsed: Value = serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
        field: "package.json".to_string(),
        message: format!("invalid JSON: {e}"),
    })?;
    match parsed.get_mut(PACKAGE_JSON_FIELD).map(Value::take) {
        Some(value) if !value.is_null() => Ok(value),
        _ => Err(ConfigError::InvalidValue {
            field: PACKAGE_JSON_FIELD.to_string(),
            message: "package.json has no \"kiln\" field".to_string(),
        }),
    }
}

fn apply_env(config: &mut KilnConfig) -> Result<()> {
    let overrides: EnvOverrides = Figment::from(
        Env::prefixed(ENV_PREFIX).only(&["versioning", "hot_update"]),
    )
    .extract()
    .map_err(|e| ConfigError::Environment(e.to_string()))?;

    if let Some(versioning) = overrides.versioning {
        debug!(versioning, "versioning overridden from environment");
        config.versioning = versioning;
    }
    if let Some(hot_update) = overrides.hot_update {
        debug!(hot_update, "hot_update overridden from environment");
        config.hot_update = hot_update;
    }
    Ok(())
}

/// Load the config of the current directory, optionally under `profile`.
pub fn discover(profile: Option<&str>) -> Result<KilnConfig> {
    let root = std::env::current_dir()?;
    let discovery = ConfigDiscovery::new(root);
    match profile {
        Some(profile) => discovery.with_profile(profile).load(),
        None => discovery.load(),
    }
}
