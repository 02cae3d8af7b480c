//! Core ResourceGraph structure and inner state.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use crate::node::{NodeInstance, ResourceKind, ResourceNode};
use crate::reference::Reference;
use crate::url::ResourceUrl;

/// A reference together with the resource it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub reference: Reference,
    pub target: ResourceUrl,
}

impl Edge {
    pub fn new(reference: Reference, target: ResourceUrl) -> Self {
        Self { reference, target }
    }
}

/// In-memory resource graph shared by every fetch, hot update and versioning pass.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    pub(super) inner: Arc<RwLock<GraphInner>>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub(super) struct GraphInner {
    /// All nodes, in insertion order
    pub nodes: IndexMap<ResourceUrl, Arc<ResourceNode>>,
    /// Forward edges in authored order
    pub references: HashMap<ResourceUrl, Vec<Edge>>,
    /// Reverse edges: resource -> resources referencing it
    pub dependents: HashMap<ResourceUrl, IndexSet<ResourceUrl>>,
    pub entry_points: IndexSet<ResourceUrl>,
    pub pinned: HashSet<ResourceUrl>,
    /// Nodes whose content reflects their current source
    pub fresh: HashSet<ResourceUrl>,
    pub next_instance: u64,
}

impl GraphInner {
    pub fn ensure_node(&mut self, url: &ResourceUrl, kind: ResourceKind) -> Arc<ResourceNode> {
        if let Some(existing) = self.nodes.get(url) {
            return Arc::clone(existing);
        }

        self.next_instance += 1;
        let mut node = ResourceNode::new(url.clone(), kind, NodeInstance(self.next_instance));
        node.is_entry = self.entry_points.contains(url);
        let node = Arc::new(node);
        self.nodes.insert(url.clone(), Arc::clone(&node));
        node
    }

    /// Swap in a modified copy of a node.
    pub fn update_node<F>(&mut self, url: &ResourceUrl, f: F) -> Option<Arc<ResourceNode>>
    where
        F: FnOnce(&mut ResourceNode),
    {
        let current = self.nodes.get(url)?;
        let mut node = (**current).clone();
        f(&mut node);
        let node = Arc::new(node);
        self.nodes.insert(url.clone(), Arc::clone(&node));
        Some(node)
    }

    pub fn has_edge(&self, from: &ResourceUrl, edge: &Edge) -> bool {
        self.references
            .get(from)
            .is_some_and(|edges| edges.contains(edge))
    }

    /// A node nobody references any more and that is neither an entry nor pinned.
    pub fn is_orphan(&self, url: &ResourceUrl) -> bool {
        if self.entry_points.contains(url) || self.pinned.contains(url) {
            return false;
        }
        self.dependents
            .get(url)
            .is_none_or(|deps| deps.iter().all(|dep| dep == url))
    }

    /// Replace every outgoing edge of `from`, returning the nodes collected as a result.
    pub fn replace_edges(&mut self, from: &ResourceUrl, edges: Vec<Edge>) -> Vec<ResourceUrl> {
        let old = self.references.remove(from).unwrap_or_default();

        let mut kept: HashSet<ResourceUrl> = HashSet::default();
        let mut unique: Vec<Edge> = Vec::with_capacity(edges.len());
        for edge in edges {
            if unique.contains(&edge) {
                continue;
            }
            self.dependents
                .entry(edge.target.clone())
                .or_default()
                .insert(from.clone());
            kept.insert(edge.target.clone());
            unique.push(edge);
        }
        self.references.insert(from.clone(), unique);

        let mut candidates = Vec::new();
        for edge in old {
            if kept.contains(&edge.target) {
                continue;
            }
            if let Some(deps) = self.dependents.get_mut(&edge.target) {
                deps.shift_remove(from);
            }
            if &edge.target != from && !candidates.contains(&edge.target) {
                candidates.push(edge.target);
            }
        }

        self.collect_garbage(candidates)
    }

    /// Remove orphaned candidates, cascading through their own references.
    pub fn collect_garbage(&mut self, mut worklist: Vec<ResourceUrl>) -> Vec<ResourceUrl> {
        let mut removed = Vec::new();

        while let Some(url) = worklist.pop() {
            if !self.nodes.contains_key(&url) || !self.is_orphan(&url) {
                continue;
            }
            removed.push(url.clone());
            for target in self.remove_node(&url) {
                if !worklist.contains(&target) {
                    worklist.push(target);
                }
            }
        }

        removed
    }

    /// Drop a node and its outgoing edges. Returns the targets it referenced.
    pub fn remove_node(&mut self, url: &ResourceUrl) -> Vec<ResourceUrl> {
        self.nodes.shift_remove(url);
        self.fresh.remove(url);
        self.dependents.remove(url);

        let mut targets = Vec::new();
        for edge in self.references.remove(url).unwrap_or_default() {
            if let Some(deps) = self.dependents.get_mut(&edge.target) {
                deps.shift_remove(url);
            }
            if &edge.target != url && !targets.contains(&edge.target) {
                targets.push(edge.target);
            }
        }
        targets
    }
}
