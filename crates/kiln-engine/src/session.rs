//! Build sessions.
//!
//! A [`BuildSession`] owns everything one build or dev server needs: the graph,
//! the plugin pipeline, the runtime, the table of in-flight computes and the
//! hot-update channel. Sessions are cheap to clone and share one state.

use std::sync::Arc;

use futures::future::{BoxFuture, Shared, try_join_all};
use kiln_graph::{ResourceGraph, ResourceKind, ResourceNode, ResourceUrl, Runtime};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

use crate::error::Result;
use crate::hot::HotUpdateEvent;
use crate::output::FinalizedOutput;
use crate::plugins::{BuildMode, PluginContext, PluginPipeline};
use crate::versioning::{Versioner, VersioningStrategy};

/// Capacity of the hot-update broadcast channel. Slow subscribers lag.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// A top-level request the session starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Specifier resolved against the session root (`index.html`, `src/main.js`).
    pub specifier: String,
    /// Kind the entry must have once loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
}

impl EntryPoint {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Options for a [`BuildSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory URL entries and root-relative specifiers resolve against.
    pub root: ResourceUrl,
    pub mode: BuildMode,
    pub entries: Vec<EntryPoint>,
    /// Fingerprint finalized resources and rewrite references to them.
    pub versioning: bool,
    pub versioning_strategy: VersioningStrategy,
    /// When false every change produces a full reload.
    pub hot_update: bool,
}

impl SessionOptions {
    pub fn new(root: ResourceUrl) -> Self {
        Self {
            root,
            mode: BuildMode::default(),
            entries: Vec::new(),
            versioning: true,
            versioning_strategy: VersioningStrategy::default(),
            hot_update: true,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_entry(mut self, entry: EntryPoint) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_versioning(mut self, versioning: bool) -> Self {
        self.versioning = versioning;
        self
    }

    pub fn with_versioning_strategy(mut self, strategy: VersioningStrategy) -> Self {
        self.versioning_strategy = strategy;
        self
    }

    pub fn with_hot_update(mut self, hot_update: bool) -> Self {
        self.hot_update = hot_update;
        self
    }
}

pub(crate) type SharedCompute = Shared<BoxFuture<'static, Result<Arc<ResourceNode>>>>;

pub(crate) struct SessionInner {
    pub options: SessionOptions,
    pub graph: ResourceGraph,
    pub pipeline: PluginPipeline,
    pub ctx: PluginContext,
    /// At most one compute per URL. Entries remove themselves when done.
    pub inflight: Mutex<FxHashMap<ResourceUrl, SharedCompute>>,
    pub updates: broadcast::Sender<HotUpdateEvent>,
}

impl SessionInner {
    /// The compute currently running for `url`, if any.
    pub fn pending(&self, url: &ResourceUrl) -> Option<SharedCompute> {
        self.inflight.lock().get(url).cloned()
    }
}

/// Shared handle to one build or dev-serving session.
#[derive(Clone)]
pub struct BuildSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("root", &self.inner.options.root)
            .field("mode", &self.inner.options.mode)
            .field("nodes", &self.inner.graph.len())
            .field("plugins", &self.inner.pipeline.names())
            .finish()
    }
}

impl BuildSession {
    pub fn new(options: SessionOptions, pipeline: PluginPipeline, runtime: Arc<dyn Runtime>) -> Self {
        let graph = ResourceGraph::new();
        let ctx = PluginContext::new(graph.clone(), runtime, options.root.clone(), options.mode);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                options,
                graph,
                pipeline,
                ctx,
                inflight: Mutex::new(FxHashMap::default()),
                updates,
            }),
        }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    pub fn graph(&self) -> &ResourceGraph {
        &self.inner.graph
    }

    pub fn pipeline(&self) -> &PluginPipeline {
        &self.inner.pipeline
    }

    pub fn context(&self) -> &PluginContext {
        &self.inner.ctx
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        self.inner.ctx.runtime()
    }

    /// Receive every hot-update event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HotUpdateEvent> {
        self.inner.updates.subscribe()
    }

    /// Fetch every configured entry and everything it reaches.
    ///
    /// Returns the entry URLs in configuration order.
    pub async fn build_graph(&self) -> Result<Vec<ResourceUrl>> {
        let nodes = try_join_all(
            self.inner
                .options
                .entries
                .iter()
                .map(|entry| self.fetch_entry(entry)),
        )
        .await?;
        info!(
            entries = nodes.len(),
            resources = self.inner.graph.len(),
            "resource graph built"
        );
        Ok(nodes.into_iter().map(|node| node.url.clone()).collect())
    }

    /// Build the graph and produce the finalized, versioned output tree.
    pub async fn finalize_all(&self) -> Result<FinalizedOutput> {
        let entries = self.build_graph().await?;
        let output = Versioner::new(&self.inner.options, &self.inner.pipeline, &self.inner.ctx)
            .run(&self.inner.graph, &entries)
            .await?;
        info!(
            files = output.files.len(),
            placeholders = output.indirection.len(),
            "finalized output"
        );
        Ok(output)
    }
}
