//! Filesystem loader plugin.

use async_trait::async_trait;
use kiln_graph::{Content, Reference, ResourceUrl, RuntimeError, UrlScheme, content_type_for_extension};
use tracing::trace;

use super::resolve_path_specifier;
use crate::plugins::{KilnPlugin, LoadResult, LoadedContent, PluginContext, PluginResult};

/// Resolves relative and root-relative specifiers to `file://` URLs and loads
/// them through the session's [`kiln_graph::Runtime`].
///
/// Resolution is purely lexical; a missing file surfaces at load time as
/// [`LoadResult::NotFound`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemPlugin;

impl FileSystemPlugin {
    pub const NAME: &'static str = "fs";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KilnPlugin for FileSystemPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn resolve_reference(
        &self,
        reference: &Reference,
        ctx: &PluginContext,
    ) -> PluginResult<Option<ResourceUrl>> {
        Ok(resolve_path_specifier(reference, ctx.root(), UrlScheme::File))
    }

    async fn load_content(
        &self,
        url: &ResourceUrl,
        ctx: &PluginContext,
    ) -> PluginResult<Option<LoadResult>> {
        let Some(path) = url.to_file_path() else {
            return Ok(None);
        };

        match ctx.runtime().read_file(&path).await {
            Ok(bytes) => {
                let content_type = content_type_for_extension(url.extension().unwrap_or(""));
                trace!(path = %path.display(), bytes = bytes.len(), "read file");
                Ok(Some(LoadResult::Loaded(LoadedContent::new(
                    Content::from_bytes(bytes, content_type),
                    content_type,
                ))))
            }
            Err(RuntimeError::FileNotFound(_)) => Ok(Some(LoadResult::NotFound)),
            Err(err) => Err(err.into()),
        }
    }
}
