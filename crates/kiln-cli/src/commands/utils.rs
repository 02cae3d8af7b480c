//! Config loading and session construction shared by the commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_config::{ConfigDiscovery, ConfigValidator, FsValidator, KilnConfig};
use kiln_engine::{BuildMode, BuildSession, PluginRegistry};
use kiln_graph::NativeRuntime;
use tracing::debug;

use crate::cli::ConfigArgs;
use crate::error::{CliError, Result};

/// A loaded config and the directory its relative paths resolve against.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: KilnConfig,
    pub base_dir: PathBuf,
}

pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Load the config named by `--config` (a file or a directory), else the one
/// in the current directory.
pub fn load_config(args: &ConfigArgs) -> Result<LoadedConfig> {
    let cwd = std::env::current_dir()?;
    let target = match &args.config {
        Some(path) => resolve_path(path, &cwd),
        None => cwd.clone(),
    };

    let (base_dir, file) = if target.is_file() {
        let base = target.parent().map_or_else(|| cwd.clone(), Path::to_path_buf);
        (base, Some(target))
    } else if target.is_dir() {
        (target, None)
    } else {
        return Err(CliError::FileNotFound(target));
    };

    let mut discovery = ConfigDiscovery::new(&base_dir);
    if let Some(profile) = &args.profile {
        discovery = discovery.with_profile(profile.clone());
    }
    let config = match file {
        Some(file) => discovery.load_from(&file)?,
        None => discovery.load()?,
    };
    debug!(base = %base_dir.display(), entries = config.entries.len(), "config loaded");
    Ok(LoadedConfig { config, base_dir })
}

/// Validate `config` and open a session over the native filesystem.
pub fn open_session(loaded: &LoadedConfig, mode: BuildMode) -> Result<BuildSession> {
    let LoadedConfig { config, base_dir } = loaded;
    let registry = PluginRegistry::with_builtins();
    FsValidator::new(base_dir).validate(config)?;

    let pipeline = config.pipeline(&registry)?;
    let options = config.session_options(base_dir, mode)?;
    Ok(BuildSession::new(options, pipeline, Arc::new(NativeRuntime::new())))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn resolves_relative_paths() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_path(Path::new("dist"), cwd), PathBuf::from("/work/dist"));
        assert_eq!(resolve_path(Path::new("/out"), cwd), PathBuf::from("/out"));
    }

    #[test]
    fn config_file_sets_base_dir() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("site");
        fs::create_dir_all(&site).unwrap();
        fs::write(site.join("kiln.toml"), "entries = [\"index.html\"]\n").unwrap();

        let loaded = load_config(&ConfigArgs {
            config: Some(site.join("kiln.toml")),
            profile: None,
        })
        .unwrap();
        assert_eq!(loaded.base_dir, site);
        assert_eq!(loaded.config.entries.len(), 1);

        let from_dir = load_config(&ConfigArgs {
            config: Some(site.clone()),
            profile: None,
        })
        .unwrap();
        assert_eq!(from_dir.base_dir, site);
    }

    #[test]
    fn missing_config_path_is_reported() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config(&ConfigArgs {
            config: Some(missing.clone()),
            profile: None,
        })
        .unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(path) if path == missing));
    }

    #[test]
    fn session_requires_existing_entries() {
        let dir = TempDir::new().unwrap();
        let loaded = LoadedConfig {
            config: KilnConfig {
                entries: vec![kiln_config::EntryConfig::new("index.html")],
                ..KilnConfig::default()
            },
            base_dir: dir.path().to_path_buf(),
        };
        let err = open_session(&loaded, BuildMode::Build).unwrap_err();
        assert!(matches!(err, CliError::Config(kiln_config::ConfigError::EntryNotFound { .. })));
    }
}
