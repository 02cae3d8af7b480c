//! Query methods for ResourceGraph.

use std::sync::Arc;

use super::store::{Edge, ResourceGraph};
use crate::node::ResourceNode;
use crate::url::ResourceUrl;
use crate::{GraphError, Result};

impl ResourceGraph {
    /// Current snapshot of a node.
    pub fn node(&self, url: &ResourceUrl) -> Option<Arc<ResourceNode>> {
        self.inner.read().nodes.get(url).cloned()
    }

    /// The node, only if its content is up to date.
    pub fn fresh_node(&self, url: &ResourceUrl) -> Option<Arc<ResourceNode>> {
        let inner = self.inner.read();
        if !inner.fresh.contains(url) {
            return None;
        }
        inner.nodes.get(url).cloned()
    }

    pub fn contains(&self, url: &ResourceUrl) -> bool {
        self.inner.read().nodes.contains_key(url)
    }

    pub fn is_fresh(&self, url: &ResourceUrl) -> bool {
        self.inner.read().fresh.contains(url)
    }

    pub fn is_entry(&self, url: &ResourceUrl) -> bool {
        self.inner.read().entry_points.contains(url)
    }

    pub fn is_pinned(&self, url: &ResourceUrl) -> bool {
        self.inner.read().pinned.contains(url)
    }

    /// Outgoing edges of `url` in authored order.
    pub fn references(&self, url: &ResourceUrl) -> Vec<Edge> {
        self.inner
            .read()
            .references
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    /// Resources referencing `url`, in the order they first did so.
    pub fn dependents(&self, url: &ResourceUrl) -> Vec<ResourceUrl> {
        self.inner
            .read()
            .dependents
            .get(url)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn entry_points(&self) -> Vec<ResourceUrl> {
        self.inner.read().entry_points.iter().cloned().collect()
    }

    /// URLs of every node, in insertion order.
    pub fn urls(&self) -> Vec<ResourceUrl> {
        self.inner.read().nodes.keys().cloned().collect()
    }

    pub fn nodes(&self) -> Vec<Arc<ResourceNode>> {
        self.inner.read().nodes.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().nodes.is_empty()
    }

    /// Verify that forward and reverse edges mirror each other and point at live nodes.
    pub fn check_consistency(&self) -> Result<()> {
        let inner = self.inner.read();

        for (from, edges) in &inner.references {
            if !inner.nodes.contains_key(from) {
                return Err(GraphError::Inconsistent(format!(
                    "edges recorded for missing node {from}"
                )));
            }
            for edge in edges {
                if !inner.nodes.contains_key(&edge.target) {
                    return Err(GraphError::Inconsistent(format!(
                        "{from} references missing node {}",
                        edge.target
                    )));
                }
                let mirrored = inner
                    .dependents
                    .get(&edge.target)
                    .is_some_and(|deps| deps.contains(from));
                if !mirrored {
                    return Err(GraphError::Inconsistent(format!(
                        "{} does not list {from} as a dependent",
                        edge.target
                    )));
                }
            }
        }

        for (target, deps) in &inner.dependents {
            for dep in deps {
                let forward = inner
                    .references
                    .get(dep)
                    .is_some_and(|edges| edges.iter().any(|e| &e.target == target));
                if !forward {
                    return Err(GraphError::Inconsistent(format!(
                        "{dep} is listed as a dependent of {target} without an edge"
                    )));
                }
            }
        }

        Ok(())
    }
}
