//! Plugin contract and the ordered pipeline that dispatches to plugins.
//!
//! A plugin implements any subset of five hooks. For `resolve_reference`,
//! `load_content`, `finalize_content` and `format_referenced_specifier` the
//! first plugin returning `Some` wins; `transform_content` runs every plugin in
//! order over a shared [`TransformState`].

mod context;
mod pipeline;
mod registry;

pub use context::{
    BuildMode, FinalizeInput, FormatInput, HotDeclaration, PluginContext, TransformState,
};
pub use pipeline::{HookFailure, PluginPipeline};
pub use registry::{PluginFactory, PluginRegistry, UnknownPlugin};

use std::fmt;

use async_trait::async_trait;
use kiln_graph::{Content, Reference, ResourceKind, ResourceUrl, RuntimeError};

/// Error returned by a plugin hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct PluginError {
    pub message: String,
}

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<RuntimeError> for PluginError {
    fn from(err: RuntimeError) -> Self {
        Self::new(err.to_string())
    }
}

/// Result type for plugin hooks.
pub type PluginResult<T> = Result<T, PluginError>;

/// Content produced by a load hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedContent {
    pub content: Content,
    pub content_type: String,
    /// Overrides the kind inferred from the content type.
    pub kind: Option<ResourceKind>,
}

impl LoadedContent {
    pub fn new(content: impl Into<Content>, content_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Outcome of a load hook that handled the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    Loaded(LoadedContent),
    /// The plugin owns this URL and knows nothing exists there.
    NotFound,
}

/// Names of the hooks, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    ResolveReference,
    LoadContent,
    TransformContent,
    FinalizeContent,
    FormatReferencedSpecifier,
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ResolveReference => "resolve_reference",
            Self::LoadContent => "load_content",
            Self::TransformContent => "transform_content",
            Self::FinalizeContent => "finalize_content",
            Self::FormatReferencedSpecifier => "format_referenced_specifier",
        })
    }
}

/// A kiln plugin. Every hook is optional.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use kiln_engine::plugins::{KilnPlugin, PluginContext, PluginResult, TransformState};
///
/// #[derive(Debug)]
/// struct Banner;
///
/// #[async_trait]
/// impl KilnPlugin for Banner {
///     fn name(&self) -> &str {
///         "banner"
///     }
///
///     async fn transform_content(
///         &self,
///         state: &mut TransformState,
///         _ctx: &PluginContext,
///     ) -> PluginResult<()> {
///         if let Some(text) = state.text() {
///             let banned = format!("/* built by kiln */\n{text}");
///             state.set_text(banned);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait KilnPlugin: Send + Sync + fmt::Debug {
    /// Stable name used in configuration and error messages.
    fn name(&self) -> &str;

    /// Map a reference to a URL. Must not perform I/O.
    async fn resolve_reference(
        &self,
        _reference: &Reference,
        _ctx: &PluginContext,
    ) -> PluginResult<Option<ResourceUrl>> {
        Ok(None)
    }

    /// Produce the raw content for a URL.
    async fn load_content(
        &self,
        _url: &ResourceUrl,
        _ctx: &PluginContext,
    ) -> PluginResult<Option<LoadResult>> {
        Ok(None)
    }

    /// Rewrite content and report references, hot declarations and exposed names.
    async fn transform_content(
        &self,
        _state: &mut TransformState,
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        Ok(())
    }

    /// Produce final content once every dependency has its final URL.
    async fn finalize_content(
        &self,
        _input: &FinalizeInput,
        _ctx: &PluginContext,
    ) -> PluginResult<Option<Content>> {
        Ok(None)
    }

    /// Spell a reference to a final URL inside the referencing resource.
    fn format_referenced_specifier(
        &self,
        _input: &FormatInput<'_>,
        _ctx: &PluginContext,
    ) -> Option<String> {
        None
    }
}
