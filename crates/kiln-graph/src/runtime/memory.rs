//! In-memory runtime.

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Runtime, RuntimeError, RuntimeResult};

/// `Runtime` over a map of paths to bytes. Clones share the same files.
///
/// Relative paths resolve against the configured working directory.
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into(),
        }
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let key = self.normalize(path.as_ref());
        self.files.write().insert(key, content.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let key = self.normalize(path.as_ref());
        self.files.write().remove(&key)
    }

    /// Content of a file as UTF-8, if present.
    pub fn read_to_string(&self, path: impl AsRef<Path>) -> Option<String> {
        let key = self.normalize(path.as_ref());
        let files = self.files.read();
        files
            .get(&key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new("/")
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let key = self.normalize(path);
        self.files
            .read()
            .get(&key)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(key))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let key = self.normalize(path);
        self.files.write().insert(key, content.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let key = self.normalize(path);
        let files = self.files.read();
        files.contains_key(&key) || files.keys().any(|p| p.starts_with(&key))
    }

    async fn create_dir(&self, _path: &Path, _recursive: bool) -> RuntimeResult<()> {
        Ok(())
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
