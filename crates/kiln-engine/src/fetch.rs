//! Fetch and compute.
//!
//! `fetch` resolves a reference, obtains the target node (cache hit, attach to
//! an in-flight compute, or start one) and then walks the node's outgoing
//! references concurrently. A compute never waits on another compute; only the
//! walk does, and the walk's visited set stops it at cycles.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use kiln_graph::{
    HotState, NodeUpdate, Reference, ReferenceKind, ReferenceTrace, ResourceKind, ResourceNode,
    ResourceUrl, essence,
};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, debug_span, trace};

use crate::changes::content_hash;
use crate::error::{EngineError, Result};
use crate::plugins::{HookFailure, HotDeclaration, LoadResult, LoadedContent, TransformState};
use crate::session::{BuildSession, EntryPoint, SessionInner};

/// URLs a single walk has already descended into.
pub(crate) type Visited = Arc<Mutex<FxHashSet<ResourceUrl>>>;

pub(crate) fn plugin_failure(failure: HookFailure, trace: &ReferenceTrace) -> EngineError {
    EngineError::Plugin {
        plugin: failure.plugin,
        hook: failure.hook,
        message: failure.error.message,
        trace: trace.clone(),
    }
}

impl BuildSession {
    /// Fetch the resource `reference` points at, along with everything it reaches.
    ///
    /// Fresh nodes are returned as-is, so fetching twice yields the same `Arc`.
    pub async fn fetch(&self, reference: Reference) -> Result<Arc<ResourceNode>> {
        let trace = ReferenceTrace::start(&reference);
        fetch_walk(
            Arc::clone(&self.inner),
            reference,
            None,
            trace,
            Visited::default(),
        )
        .await
    }

    /// Resolve an entry, mark it as an entry point and fetch it.
    pub async fn fetch_entry(&self, entry: &EntryPoint) -> Result<Arc<ResourceNode>> {
        let mut reference = Reference::entry(entry.specifier.as_str());
        if let Some(kind) = entry.kind {
            reference = reference.expect_kind(kind);
        }
        let trace = ReferenceTrace::start(&reference);
        let url = self.inner.resolve(&reference, &trace).await?;
        self.inner.graph.mark_entry(&url);
        fetch_walk(
            Arc::clone(&self.inner),
            reference,
            Some(url),
            trace,
            Visited::default(),
        )
        .await
    }
}

/// Obtain the target of `reference`, check its contract, then walk its references.
pub(crate) fn fetch_walk(
    session: Arc<SessionInner>,
    reference: Reference,
    resolved: Option<ResourceUrl>,
    trace: ReferenceTrace,
    visited: Visited,
) -> BoxFuture<'static, Result<Arc<ResourceNode>>> {
    async move {
        let url = match resolved {
            Some(url) => url,
            None => session.resolve(&reference, &trace).await?,
        };
        let node = session.obtain(url.clone(), &reference, &trace).await?;
        check_contract(&reference, &node, &trace)?;

        let first_visit = visited.lock().insert(url.clone());
        if !first_visit {
            return Ok(node);
        }

        let mut walk = JoinSet::new();
        for edge in session.graph.references(&url) {
            let child_trace = trace.with(&edge.reference);
            walk.spawn(fetch_walk(
                Arc::clone(&session),
                edge.reference,
                Some(edge.target),
                child_trace,
                Arc::clone(&visited),
            ));
        }
        while let Some(joined) = walk.join_next().await {
            match joined {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => return Err(err),
                Err(err) => return Err(EngineError::TaskFailed(err.to_string())),
            }
        }
        Ok(node)
    }
    .boxed()
}

fn check_contract(
    reference: &Reference,
    node: &ResourceNode,
    trace: &ReferenceTrace,
) -> Result<()> {
    if let Some(expected) = reference.expected_kind {
        if node.kind != expected {
            return Err(EngineError::ContractViolation {
                url: node.url.clone(),
                expected: expected.to_string(),
                actual: node.kind.to_string(),
                trace: trace.clone(),
            });
        }
    }
    if let Some(expected) = &reference.expected_content_type {
        if essence(expected) != essence(&node.content_type) {
            return Err(EngineError::ContractViolation {
                url: node.url.clone(),
                expected: expected.clone(),
                actual: node.content_type.clone(),
                trace: trace.clone(),
            });
        }
    }
    Ok(())
}

impl SessionInner {
    /// Map a reference to a URL. Inline content gets a URL derived from its parent.
    pub(crate) async fn resolve(
        &self,
        reference: &Reference,
        trace: &ReferenceTrace,
    ) -> Result<ResourceUrl> {
        if let (Some(source), Some(inline)) = (&reference.source_url, &reference.inline) {
            return Ok(ResourceUrl::inline(
                source,
                reference.position.line,
                reference.position.column,
                &inline.extension,
            ));
        }

        match self.pipeline.resolve_reference(reference, &self.ctx).await {
            Ok(Some(url)) => Ok(url),
            Ok(None) => Err(EngineError::Resolution {
                specifier: reference.specifier.clone(),
                trace: trace.clone(),
            }),
            Err(failure) => Err(plugin_failure(failure, trace)),
        }
    }

    /// Return the fresh node for `url`, computing it at most once across callers.
    async fn obtain(
        self: &Arc<Self>,
        url: ResourceUrl,
        reference: &Reference,
        trace: &ReferenceTrace,
    ) -> Result<Arc<ResourceNode>> {
        if let Some(node) = self.graph.fresh_node(&url) {
            trace!(url = %url, "cache hit");
            return Ok(node);
        }

        let compute = {
            let mut inflight = self.inflight.lock();
            if let Some(existing) = inflight.get(&url) {
                debug!(url = %url, "attaching to in-flight compute");
                existing.clone()
            } else if let Some(node) = self.graph.fresh_node(&url) {
                return Ok(node);
            } else {
                let session = Arc::clone(self);
                let task_url = url.clone();
                let task_reference = reference.clone();
                let task_trace = trace.clone();
                let span = debug_span!("compute", url = %url);
                let handle = tokio::spawn(
                    async move {
                        let result = session
                            .compute(&task_url, &task_reference, &task_trace)
                            .await;
                        session.inflight.lock().remove(&task_url);
                        result
                    }
                    .instrument(span),
                );
                let shared = async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(err) => Err(EngineError::TaskFailed(err.to_string())),
                    }
                }
                .boxed()
                .shared();
                inflight.insert(url, shared.clone());
                shared
            }
        };
        compute.await
    }

    /// Load, transform and commit one resource. Does not touch its dependencies.
    async fn compute(
        &self,
        url: &ResourceUrl,
        reference: &Reference,
        trace: &ReferenceTrace,
    ) -> Result<Arc<ResourceNode>> {
        let hint = if reference.inline.is_some() {
            ResourceKind::InlineVirtual
        } else {
            reference
                .expected_kind
                .unwrap_or_else(|| ResourceKind::from_url(url))
        };
        let instance = self.graph.upsert_node(url.clone(), hint).instance;

        let loaded = match &reference.inline {
            Some(inline) => LoadedContent::new(inline.content.as_str(), inline.content_type.as_str())
                .with_kind(ResourceKind::InlineVirtual),
            None => match self
                .pipeline
                .load_content(url, &self.ctx)
                .await
                .map_err(|failure| plugin_failure(failure, trace))?
            {
                Some(LoadResult::Loaded(loaded)) => loaded,
                Some(LoadResult::NotFound) | None => {
                    return Err(EngineError::NotFound {
                        url: url.clone(),
                        trace: trace.clone(),
                    });
                }
            },
        };

        let kind = loaded
            .kind
            .unwrap_or_else(|| ResourceKind::from_content_type(&loaded.content_type));
        let source_hash = content_hash(loaded.content.as_bytes());

        let mut state = TransformState::new(
            url.clone(),
            kind,
            loaded.content.clone(),
            loaded.content_type.clone(),
        );
        self.pipeline
            .transform_content(&mut state, &self.ctx)
            .await
            .map_err(|failure| plugin_failure(failure, trace))?;
        let output = state.into_parts();

        let mut edges = Vec::with_capacity(output.references.len());
        let mut inline_targets = Vec::new();
        for child in output.references {
            let child_trace = trace.with(&child);
            let target = self.resolve(&child, &child_trace).await?;
            let target_kind = if child.inline.is_some() {
                inline_targets.push(target.clone());
                ResourceKind::InlineVirtual
            } else {
                child
                    .expected_kind
                    .unwrap_or_else(|| ResourceKind::from_url(&target))
            };
            edges.push((child, target, target_kind));
        }

        let hot_state = match output.hot {
            None => HotState::Unspecified,
            Some(HotDeclaration::AcceptSelf) => HotState::AcceptsSelf,
            Some(HotDeclaration::Decline) => HotState::Declines,
            Some(HotDeclaration::AcceptDependencies(specifiers)) => {
                let mut accepted = Vec::with_capacity(specifiers.len());
                for specifier in specifiers {
                    let accept = Reference::new(specifier, ReferenceKind::HotAccept)
                        .with_source(url.clone());
                    accepted.push(self.resolve(&accept, &trace.with(&accept)).await?);
                }
                HotState::AcceptsDependencies(accepted)
            }
        };

        let update = NodeUpdate {
            kind: Some(output.kind),
            content: output.content,
            content_type: output.content_type,
            original_content: Some(loaded.content),
            hot_state,
            exposed: output.exposed,
            source_hash: Some(source_hash),
        };
        let node = self
            .graph
            .commit(url, instance, update, edges)
            .map_err(|source| EngineError::StaleNode {
                source,
                trace: trace.clone(),
            })?;

        // Inline children carry their content in the edge; recompute them from it.
        for target in &inline_targets {
            self.graph.mark_stale(target);
        }

        debug!(url = %url, kind = %node.kind, references = self.graph.references(url).len(), "computed");
        Ok(node)
    }
}
