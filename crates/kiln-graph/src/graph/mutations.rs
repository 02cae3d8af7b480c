//! Mutation methods for ResourceGraph.

use std::sync::Arc;

use rustc_hash::FxHashSet as HashSet;
use tracing::{debug, trace};

use super::store::{Edge, ResourceGraph};
use crate::node::{NodeInstance, NodeUpdate, ResourceKind, ResourceNode};
use crate::reference::Reference;
use crate::url::ResourceUrl;
use crate::{GraphError, Result};

impl ResourceGraph {
    /// Return the node for `url`, creating an uncomputed one if absent.
    ///
    /// An existing node is returned untouched; `kind` only seeds new nodes.
    pub fn upsert_node(&self, url: ResourceUrl, kind: ResourceKind) -> Arc<ResourceNode> {
        self.inner.write().ensure_node(&url, kind)
    }

    /// Record that `reference` (made by its source) points at `target`.
    ///
    /// Both ends must already exist. Registering the same reference twice is a no-op;
    /// returns whether a new edge was added.
    pub fn register_reference(&self, reference: Reference, target: &ResourceUrl) -> Result<bool> {
        let Some(source) = reference.source_url.clone() else {
            return Err(GraphError::Inconsistent(format!(
                "entry reference \"{}\" has no source to attach to",
                reference.specifier
            )));
        };

        let mut inner = self.inner.write();
        for url in [&source, target] {
            if !inner.nodes.contains_key(url) {
                return Err(GraphError::MissingNode { url: url.clone() });
            }
        }

        let edge = Edge::new(reference, target.clone());
        if inner.has_edge(&source, &edge) {
            return Ok(false);
        }

        inner
            .dependents
            .entry(target.clone())
            .or_default()
            .insert(source.clone());
        inner.references.entry(source).or_default().push(edge);
        Ok(true)
    }

    /// Atomically replace all outgoing references of `url`.
    ///
    /// Targets that lose their last dependent are removed, cascading, unless they
    /// are entries or pinned. Returns the removed URLs.
    pub fn replace_outgoing_references(
        &self,
        url: &ResourceUrl,
        edges: Vec<Edge>,
    ) -> Result<Vec<ResourceUrl>> {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(url) {
            return Err(GraphError::MissingNode { url: url.clone() });
        }
        if let Some(missing) = edges.iter().find(|e| !inner.nodes.contains_key(&e.target)) {
            return Err(GraphError::MissingNode {
                url: missing.target.clone(),
            });
        }

        let removed = inner.replace_edges(url, edges);
        if !removed.is_empty() {
            debug!(from = %url, removed = removed.len(), "collected unreferenced resources");
        }
        Ok(removed)
    }

    /// Publish the result of one compute in a single step.
    ///
    /// Targets are created as needed, outgoing references replaced, the node's
    /// content swapped and the node marked fresh. Fails with a stale-node error if
    /// the node was removed, or removed and re-added, since `instance` was taken.
    pub fn commit(
        &self,
        url: &ResourceUrl,
        instance: NodeInstance,
        update: NodeUpdate,
        edges: Vec<(Reference, ResourceUrl, ResourceKind)>,
    ) -> Result<Arc<ResourceNode>> {
        let mut inner = self.inner.write();

        let found = inner
            .nodes
            .get(url)
            .map(|node| node.instance)
            .ok_or_else(|| GraphError::MissingNode { url: url.clone() })?;
        if found != instance {
            return Err(GraphError::InstanceMismatch {
                url: url.clone(),
                expected: instance,
                found,
            });
        }

        let mut new_edges = Vec::with_capacity(edges.len());
        for (reference, target, kind) in edges {
            inner.ensure_node(&target, kind);
            new_edges.push(Edge::new(reference, target));
        }
        let removed = inner.replace_edges(url, new_edges);

        let node = inner
            .update_node(url, |node| {
                if let Some(kind) = update.kind {
                    node.kind = kind;
                }
                node.content = update.content;
                node.content_type = update.content_type;
                node.original_content = update.original_content;
                node.hot_state = update.hot_state;
                node.exposed = update.exposed;
                node.source_hash = update.source_hash;
                node.version = None;
                node.placeholder = None;
            })
            .ok_or_else(|| GraphError::MissingNode { url: url.clone() })?;
        inner.fresh.insert(url.clone());

        trace!(url = %url, instance = %instance, removed = removed.len(), "committed node");
        Ok(node)
    }

    /// Mark `url` as an entry point. Entries are never collected.
    pub fn mark_entry(&self, url: &ResourceUrl) {
        let mut inner = self.inner.write();
        inner.entry_points.insert(url.clone());
        inner.update_node(url, |node| node.is_entry = true);
    }

    /// Keep `url` alive regardless of dependents.
    pub fn pin(&self, url: &ResourceUrl) {
        self.inner.write().pinned.insert(url.clone());
    }

    /// Release a pin, collecting the node if nothing references it.
    pub fn unpin(&self, url: &ResourceUrl) -> Vec<ResourceUrl> {
        let mut inner = self.inner.write();
        if !inner.pinned.remove(url) {
            return Vec::new();
        }
        inner.collect_garbage(vec![url.clone()])
    }

    /// Flag a node as needing recompute. Returns false when the node is unknown.
    pub fn mark_stale(&self, url: &ResourceUrl) -> bool {
        let mut inner = self.inner.write();
        if !inner.nodes.contains_key(url) {
            return false;
        }
        inner.fresh.remove(url);
        true
    }

    /// Record a node's fingerprint and the placeholder emitted for it, if any.
    pub fn assign_version(
        &self,
        url: &ResourceUrl,
        version: Option<String>,
        placeholder: Option<String>,
    ) -> Result<Arc<ResourceNode>> {
        self.inner
            .write()
            .update_node(url, |node| {
                node.version = version;
                node.placeholder = placeholder;
            })
            .ok_or_else(|| GraphError::MissingNode { url: url.clone() })
    }

    /// Remove every node not reachable from an entry or pinned node.
    ///
    /// Unlike reference counting this also collects unreachable cycles.
    pub fn remove_unreachable(&self) -> Vec<ResourceUrl> {
        let mut inner = self.inner.write();

        let mut reachable: HashSet<ResourceUrl> = HashSet::default();
        let mut stack: Vec<ResourceUrl> = inner
            .entry_points
            .iter()
            .chain(inner.pinned.iter())
            .cloned()
            .collect();
        while let Some(url) = stack.pop() {
            if !reachable.insert(url.clone()) {
                continue;
            }
            if let Some(edges) = inner.references.get(&url) {
                stack.extend(edges.iter().map(|e| e.target.clone()));
            }
        }

        let unreachable: Vec<ResourceUrl> = inner
            .nodes
            .keys()
            .filter(|url| !reachable.contains(*url))
            .cloned()
            .collect();
        for url in &unreachable {
            inner.remove_node(url);
        }
        if !unreachable.is_empty() {
            debug!(removed = unreachable.len(), "removed unreachable resources");
        }
        unreachable
    }
}
