//! In-memory files served under `virtual:` URLs.
//!
//! Useful for generated entries and for running the whole pipeline without
//! touching the filesystem.

use std::sync::Arc;

use async_trait::async_trait;
use kiln_graph::{Content, Reference, ResourceUrl, UrlScheme, content_type_for_extension};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::resolve_path_specifier;
use crate::plugins::{
    KilnPlugin, LoadResult, LoadedContent, PluginContext, PluginError, PluginResult,
};

/// Maximum size for a single virtual file (1MB)
pub const MAX_VIRTUAL_FILE_SIZE: usize = 1024 * 1024;

/// Serves in-memory files. Clones share the same file table, so a test can keep
/// a handle and edit files between fetches.
#[derive(Debug, Clone, Default)]
pub struct VirtualFilesPlugin {
    files: Arc<RwLock<FxHashMap<ResourceUrl, String>>>,
}

impl VirtualFilesPlugin {
    pub const NAME: &'static str = "virtual-files";

    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(path, content)` pairs, validating each file.
    pub fn from_files<I, P, C>(files: I) -> PluginResult<Self>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: Into<String>,
    {
        let plugin = Self::new();
        for (path, content) in files {
            plugin.insert(path, content)?;
        }
        Ok(plugin)
    }

    /// Add or replace a file. Returns the file's URL.
    pub fn insert(&self, path: impl AsRef<str>, content: impl Into<String>) -> PluginResult<ResourceUrl> {
        let path = path.as_ref();
        validate_path(path)?;
        let content = content.into();
        validate_content_size(path, &content)?;

        let url = ResourceUrl::new_virtual(path);
        self.files.write().insert(url.clone(), content);
        Ok(url)
    }

    pub fn remove(&self, path: impl AsRef<str>) -> Option<String> {
        self.files.write().remove(&ResourceUrl::new_virtual(path))
    }

    pub fn contains(&self, path: impl AsRef<str>) -> bool {
        self.files.read().contains_key(&ResourceUrl::new_virtual(path))
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

fn validate_path(path: &str) -> PluginResult<()> {
    if path.is_empty() {
        return Err(PluginError::new("virtual file path is empty"));
    }
    if path.contains('\0') {
        return Err(PluginError::new(format!(
            "virtual file path contains a null byte: {path:?}"
        )));
    }
    Ok(())
}

fn validate_content_size(path: &str, content: &str) -> PluginResult<()> {
    if content.len() > MAX_VIRTUAL_FILE_SIZE {
        return Err(PluginError::new(format!(
            "virtual file {path} is {} bytes, exceeding the {MAX_VIRTUAL_FILE_SIZE} byte limit",
            content.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl KilnPlugin for VirtualFilesPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn resolve_reference(
        &self,
        reference: &Reference,
        ctx: &PluginContext,
    ) -> PluginResult<Option<ResourceUrl>> {
        let root = if ctx.root().is_virtual() {
            ctx.root().clone()
        } else {
            ResourceUrl::new_virtual("/")
        };
        let resolved = resolve_path_specifier(reference, &root, UrlScheme::Virtual);

        // Entries and root-relative requests only claim files we actually hold,
        // so a filesystem plugin later in the pipeline still sees them.
        let from_virtual = reference
            .source_url
            .as_ref()
            .is_some_and(ResourceUrl::is_virtual);
        Ok(resolved.filter(|url| from_virtual || self.files.read().contains_key(url)))
    }

    async fn load_content(
        &self,
        url: &ResourceUrl,
        _ctx: &PluginContext,
    ) -> PluginResult<Option<LoadResult>> {
        if !url.is_virtual() {
            return Ok(None);
        }
        let Some(text) = self.files.read().get(url).cloned() else {
            return Ok(Some(LoadResult::NotFound));
        };
        let content_type = content_type_for_extension(url.extension().unwrap_or(""));
        Ok(Some(LoadResult::Loaded(LoadedContent::new(
            Content::Text(text),
            content_type,
        ))))
    }
}
