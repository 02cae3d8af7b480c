use std::sync::Arc;

use kiln_graph::{Content, Reference, ResourceUrl};
use tracing::trace;

use super::{
    FinalizeInput, FormatInput, HookName, KilnPlugin, LoadResult, PluginContext, PluginError,
    TransformState,
};

/// A hook error together with the plugin and hook that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub plugin: String,
    pub hook: HookName,
    pub error: PluginError,
}

/// Ordered list of plugins. Earlier plugins take precedence.
#[derive(Debug, Clone, Default)]
pub struct PluginPipeline {
    plugins: Arc<Vec<Arc<dyn KilnPlugin>>>,
}

impl PluginPipeline {
    pub fn new(plugins: Vec<Arc<dyn KilnPlugin>>) -> Self {
        Self {
            plugins: Arc::new(plugins),
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    fn failure(plugin: &dyn KilnPlugin, hook: HookName, error: PluginError) -> HookFailure {
        HookFailure {
            plugin: plugin.name().to_string(),
            hook,
            error,
        }
    }

    pub async fn resolve_reference(
        &self,
        reference: &Reference,
        ctx: &PluginContext,
    ) -> Result<Option<ResourceUrl>, HookFailure> {
        for plugin in self.plugins.iter() {
            let resolved = plugin
                .resolve_reference(reference, ctx)
                .await
                .map_err(|e| Self::failure(plugin.as_ref(), HookName::ResolveReference, e))?;
            if let Some(url) = resolved {
                trace!(plugin = plugin.name(), specifier = %reference.specifier, url = %url, "resolved");
                return Ok(Some(url));
            }
        }
        Ok(None)
    }

    pub async fn load_content(
        &self,
        url: &ResourceUrl,
        ctx: &PluginContext,
    ) -> Result<Option<LoadResult>, HookFailure> {
        for plugin in self.plugins.iter() {
            let loaded = plugin
                .load_content(url, ctx)
                .await
                .map_err(|e| Self::failure(plugin.as_ref(), HookName::LoadContent, e))?;
            if loaded.is_some() {
                trace!(plugin = plugin.name(), url = %url, "loaded");
                return Ok(loaded);
            }
        }
        Ok(None)
    }

    /// Run every plugin's transform in order.
    pub async fn transform_content(
        &self,
        state: &mut TransformState,
        ctx: &PluginContext,
    ) -> Result<(), HookFailure> {
        for plugin in self.plugins.iter() {
            plugin
                .transform_content(state, ctx)
                .await
                .map_err(|e| Self::failure(plugin.as_ref(), HookName::TransformContent, e))?;
        }
        Ok(())
    }

    pub async fn finalize_content(
        &self,
        input: &FinalizeInput,
        ctx: &PluginContext,
    ) -> Result<Option<Content>, HookFailure> {
        for plugin in self.plugins.iter() {
            let finalized = plugin
                .finalize_content(input, ctx)
                .await
                .map_err(|e| Self::failure(plugin.as_ref(), HookName::FinalizeContent, e))?;
            if finalized.is_some() {
                return Ok(finalized);
            }
        }
        Ok(None)
    }

    pub fn format_referenced_specifier(
        &self,
        input: &FormatInput<'_>,
        ctx: &PluginContext,
    ) -> Option<String> {
        self.plugins
            .iter()
            .find_map(|plugin| plugin.format_referenced_specifier(input, ctx))
    }
}
