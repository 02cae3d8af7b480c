//! Traversal methods for ResourceGraph.

use std::collections::VecDeque;

use rustc_hash::FxHashSet as HashSet;

use super::store::ResourceGraph;
use crate::reference::Reference;
use crate::url::ResourceUrl;

impl ResourceGraph {
    /// Returns true if `from` references `to`, directly or transitively.
    pub fn depends_on(&self, from: &ResourceUrl, to: &ResourceUrl) -> bool {
        let inner = self.inner.read();
        let mut visited = HashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back(from.clone());

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(edges) = inner.references.get(&current) {
                for edge in edges {
                    if &edge.target == to {
                        return true;
                    }
                    queue.push_back(edge.target.clone());
                }
            }
        }

        false
    }

    /// Every resource `url` reaches through references, breadth first.
    pub fn descendants(&self, url: &ResourceUrl) -> Vec<ResourceUrl> {
        let inner = self.inner.read();
        let mut visited = HashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([url.clone()]);
        visited.insert(url.clone());

        while let Some(current) = queue.pop_front() {
            for edge in inner.references.get(&current).into_iter().flatten() {
                if visited.insert(edge.target.clone()) {
                    order.push(edge.target.clone());
                    queue.push_back(edge.target.clone());
                }
            }
        }

        order
    }

    /// Every resource that reaches `url`, breadth first.
    pub fn ancestors(&self, url: &ResourceUrl) -> Vec<ResourceUrl> {
        let inner = self.inner.read();
        let mut visited = HashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([url.clone()]);
        visited.insert(url.clone());

        while let Some(current) = queue.pop_front() {
            for dep in inner.dependents.get(&current).into_iter().flatten() {
                if visited.insert(dep.clone()) {
                    order.push(dep.clone());
                    queue.push_back(dep.clone());
                }
            }
        }

        order
    }

    /// One chain of references leading from an entry down to `url`, outermost first.
    ///
    /// Follows the first recorded dependent at each step. The chain starts with a
    /// synthetic entry reference when an entry is reached.
    pub fn reference_chain(&self, url: &ResourceUrl) -> Vec<Reference> {
        let inner = self.inner.read();
        let mut chain = Vec::new();
        let mut visited = HashSet::default();
        let mut current = url.clone();
        visited.insert(current.clone());

        loop {
            let next = inner.dependents.get(&current).and_then(|deps| {
                deps.iter().find(|dep| !visited.contains(*dep)).cloned()
            });
            let Some(dependent) = next else {
                break;
            };
            let edge = inner
                .references
                .get(&dependent)
                .and_then(|edges| edges.iter().find(|e| e.target == current));
            if let Some(edge) = edge {
                chain.push(edge.reference.clone());
            }
            visited.insert(dependent.clone());
            current = dependent;
        }

        if inner.entry_points.contains(&current) {
            chain.push(Reference::entry(current.as_str()));
        }
        chain.reverse();
        chain
    }
}
