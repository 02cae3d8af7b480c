//! Dev-mode watcher configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevConfig {
    /// Changes to the same file within this window are collapsed.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path prefixes (`node_modules`) or extension patterns (`*.log`) to skip.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Extra directories to watch besides the root.
    #[serde(default)]
    pub watch_paths: Vec<PathBuf>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            ignore: default_ignore(),
            watch_paths: Vec::new(),
        }
    }
}

pub(crate) const MIN_DEBOUNCE_MS: u64 = 10;
pub(crate) const MAX_DEBOUNCE_MS: u64 = 10_000;

fn default_debounce_ms() -> u64 {
    100
}

fn default_ignore() -> Vec<String> {
    vec!["node_modules".to_string(), "dist".to_string()]
}
