//! Versioning: content fingerprints and specifier rewriting for finalized output.
//!
//! Resources are finalized dependency-first. Each reference is rewritten to the
//! target's final (fingerprinted) URL when it is already known. Inside a cycle
//! the target is not known yet, so the reference gets a stable placeholder, the
//! target's unversioned public path, and the [`IndirectionTable`] maps it to the
//! final URL afterwards.

mod indirection;
mod paths;

pub use indirection::IndirectionTable;
pub use paths::{public_path, relative_url, versioned_path};

use std::ops::Range;

use indexmap::IndexMap;
use kiln_graph::{
    Content, Edge, ReferenceTrace, ResourceGraph, ResourceKind, ResourceNode, ResourceUrl,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::changes::fingerprint;
use crate::error::{EngineError, Result};
use crate::fetch::plugin_failure;
use crate::output::{FinalizedOutput, IMPORT_MAP_FILE, OutputFile};
use crate::plugins::{FinalizeInput, FormatInput, PluginContext, PluginPipeline};
use crate::session::SessionOptions;

/// Hex characters kept from the BLAKE3 digest.
pub const FINGERPRINT_LEN: usize = 8;

/// How module references reach fingerprinted targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersioningStrategy {
    /// Embed final URLs directly; only cycles go through the table.
    #[default]
    Inline,
    /// Every module reference goes through the table, so a dependency change
    /// does not change its dependents' fingerprints.
    Indirection,
}

struct Finalized {
    public_url: String,
    version: Option<String>,
    content: Content,
}

/// One pass over the graph producing [`FinalizedOutput`].
pub struct Versioner<'a> {
    options: &'a SessionOptions,
    pipeline: &'a PluginPipeline,
    ctx: &'a PluginContext,
}

impl<'a> Versioner<'a> {
    pub fn new(options: &'a SessionOptions, pipeline: &'a PluginPipeline, ctx: &'a PluginContext) -> Self {
        Self {
            options,
            pipeline,
            ctx,
        }
    }

    fn versions(&self, node: &ResourceNode) -> bool {
        self.options.versioning && !node.is_entry && node.kind != ResourceKind::InlineVirtual
    }

    pub async fn run(&self, graph: &ResourceGraph, entries: &[ResourceUrl]) -> Result<FinalizedOutput> {
        let order = graph.topological_order(entries);
        for cycle in &order.cycles {
            let members: Vec<&str> = cycle.iter().map(ResourceUrl::as_str).collect();
            warn!(members = ?members, "reference cycle; members are reached through placeholders");
        }

        let root = self.ctx.root();
        let mut finalized: FxHashMap<ResourceUrl, Finalized> = FxHashMap::default();
        let mut placeholders: IndexMap<ResourceUrl, String> = IndexMap::new();
        let mut files = IndexMap::new();

        for url in &order.order {
            let Some(node) = graph.node(url) else {
                continue;
            };
            let public_url = public_path(url, root);
            let content = self.substitute(graph, &node, &public_url, &finalized, &mut placeholders);

            let input = FinalizeInput {
                url: url.clone(),
                kind: node.kind,
                content,
                content_type: node.content_type.clone(),
                public_url: public_url.clone(),
                is_entry: node.is_entry,
            };
            let content = match self.pipeline.finalize_content(&input, self.ctx).await {
                Ok(Some(content)) => content,
                Ok(None) => input.content,
                Err(failure) => return Err(plugin_failure(failure, &self.trace_to(graph, url))),
            };

            let version = self
                .versions(&node)
                .then(|| fingerprint(content.as_bytes(), FINGERPRINT_LEN));
            let final_url = match &version {
                Some(version) => versioned_path(&public_url, version),
                None => public_url,
            };
            graph
                .assign_version(url, version.clone(), None)
                .map_err(|source| EngineError::StaleNode {
                    source,
                    trace: self.trace_to(graph, url),
                })?;
            debug!(url = %url, public = %final_url, "finalized");

            if node.kind != ResourceKind::InlineVirtual {
                files.insert(
                    final_url.trim_start_matches('/').to_string(),
                    OutputFile {
                        content: content.clone(),
                        content_type: node.content_type.clone(),
                        source_url: url.clone(),
                    },
                );
            }
            finalized.insert(
                url.clone(),
                Finalized {
                    public_url: final_url,
                    version,
                    content,
                },
            );
        }

        let mut indirection = IndirectionTable::new();
        for (target, placeholder) in &placeholders {
            let Some(done) = finalized.get(target) else {
                continue;
            };
            indirection.insert(placeholder.as_str(), done.public_url.as_str());
            graph
                .assign_version(target, done.version.clone(), Some(placeholder.clone()))
                .map_err(|source| EngineError::StaleNode {
                    source,
                    trace: self.trace_to(graph, target),
                })?;
        }

        if !indirection.is_empty() {
            self.publish_table(graph, entries, &finalized, &indirection, &mut files);
        }

        Ok(FinalizedOutput {
            files,
            indirection,
            cycles: order.cycles,
        })
    }

    /// Content of `node` with every spanned reference rewritten.
    fn substitute(
        &self,
        graph: &ResourceGraph,
        node: &ResourceNode,
        public_url: &str,
        finalized: &FxHashMap<ResourceUrl, Finalized>,
        placeholders: &mut IndexMap<ResourceUrl, String>,
    ) -> Content {
        let Some(text) = node.content.as_text() else {
            return node.content.clone();
        };

        let mut replacements: Vec<(Range<usize>, String)> = Vec::new();
        for edge in graph.references(&node.url) {
            let Some(span) = edge.reference.span.clone() else {
                if self.needs_rewrite(graph, &edge) {
                    warn!(
                        url = %node.url,
                        specifier = %edge.reference.specifier,
                        "reference has no span and cannot be rewritten to its final URL"
                    );
                }
                continue;
            };
            if span.end > text.len() || !text.is_char_boundary(span.start) || !text.is_char_boundary(span.end) {
                warn!(url = %node.url, specifier = %edge.reference.specifier, "reference span out of range");
                continue;
            }
            if let Some(replacement) =
                self.replacement(graph, &edge, public_url, finalized, placeholders)
            {
                replacements.push((span, replacement));
            }
        }

        replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
        let mut output = text.to_string();
        let mut limit = usize::MAX;
        for (span, replacement) in replacements {
            if span.end > limit {
                continue;
            }
            limit = span.start;
            output.replace_range(span, &replacement);
        }
        Content::Text(output)
    }

    /// Whether the authored specifier of `edge` would go stale in the output.
    fn needs_rewrite(&self, graph: &ResourceGraph, edge: &Edge) -> bool {
        edge.reference.inline.is_some()
            || graph
                .node(&edge.target)
                .is_some_and(|target| self.versions(&target))
    }

    fn replacement(
        &self,
        graph: &ResourceGraph,
        edge: &Edge,
        from_public: &str,
        finalized: &FxHashMap<ResourceUrl, Finalized>,
        placeholders: &mut IndexMap<ResourceUrl, String>,
    ) -> Option<String> {
        let done = finalized.get(&edge.target);
        if edge.reference.inline.is_some() {
            return done.and_then(|done| done.content.as_text().map(str::to_string));
        }

        let target = graph.node(&edge.target)?;
        let unversioned = public_path(&edge.target, self.ctx.root());
        if !self.versions(&target) {
            return Some(self.format(edge, from_public, &unversioned));
        }

        let through_table = match done {
            None => true,
            Some(_) => {
                self.options.versioning_strategy == VersioningStrategy::Indirection
                    && edge.reference.kind.is_module_specifier()
            }
        };
        match done {
            Some(done) if !through_table => Some(self.format(edge, from_public, &done.public_url)),
            _ => {
                if !edge.reference.kind.is_module_specifier() {
                    warn!(
                        target = %edge.target,
                        "non-module reference inside a cycle cannot be redirected by the import map"
                    );
                }
                placeholders.insert(edge.target.clone(), unversioned.clone());
                Some(unversioned)
            }
        }
    }

    fn format(&self, edge: &Edge, from_public: &str, target_public: &str) -> String {
        let input = FormatInput {
            reference: &edge.reference,
            from_public_url: from_public,
            target_url: &edge.target,
            target_public_url: target_public,
        };
        self.pipeline
            .format_referenced_specifier(&input, self.ctx)
            .unwrap_or_else(|| relative_url(from_public, target_public))
    }

    /// Inject the table into markup entries; write it as a file for the others.
    fn publish_table(
        &self,
        graph: &ResourceGraph,
        entries: &[ResourceUrl],
        finalized: &FxHashMap<ResourceUrl, Finalized>,
        table: &IndirectionTable,
        files: &mut IndexMap<String, OutputFile>,
    ) {
        let mut needs_file = false;
        for entry in entries {
            let Some(node) = graph.node(entry) else {
                continue;
            };
            if node.kind != ResourceKind::Markup {
                needs_file = true;
                continue;
            }
            let Some(done) = finalized.get(entry) else {
                continue;
            };
            let key = done.public_url.trim_start_matches('/');
            if let Some(file) = files.get_mut(key) {
                if let Some(html) = file.content.as_text() {
                    file.content = Content::Text(table.inject_html(html));
                }
            }
        }
        if needs_file {
            files.insert(
                IMPORT_MAP_FILE.to_string(),
                OutputFile {
                    content: Content::Text(table.to_json()),
                    content_type: "application/importmap+json".to_string(),
                    source_url: self.ctx.root().clone(),
                },
            );
        }
    }

    fn trace_to(&self, graph: &ResourceGraph, url: &ResourceUrl) -> ReferenceTrace {
        graph
            .reference_chain(url)
            .iter()
            .fold(ReferenceTrace::new(), |trace, reference| trace.with(reference))
    }
}
