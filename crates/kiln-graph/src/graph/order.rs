//! Dependency-first ordering with cycle grouping.

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

use super::store::{GraphInner, ResourceGraph};
use crate::url::ResourceUrl;

/// Result of [`ResourceGraph::topological_order`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologicalOrder {
    /// Every reachable node; dependencies come before their dependents.
    ///
    /// Members of a cycle are adjacent, in the order the walk discovered them.
    pub order: Vec<ResourceUrl>,
    /// Strongly connected groups of more than one node, or with a self reference.
    pub cycles: Vec<Vec<ResourceUrl>>,
}

impl TopologicalOrder {
    /// Index of each URL in `order`.
    pub fn positions(&self) -> HashMap<ResourceUrl, usize> {
        self.order
            .iter()
            .enumerate()
            .map(|(idx, url)| (url.clone(), idx))
            .collect()
    }

    pub fn is_cyclic(&self, url: &ResourceUrl) -> bool {
        self.cycles.iter().any(|group| group.contains(url))
    }
}

impl ResourceGraph {
    /// Order the subgraph reachable from `roots`, dependencies first.
    ///
    /// Deterministic for a given graph: roots are walked in the given order and
    /// edges in authored order. Missing roots are skipped.
    pub fn topological_order(&self, roots: &[ResourceUrl]) -> TopologicalOrder {
        let inner = self.inner.read();
        let mut tarjan = Tarjan::new(&inner);
        for root in roots {
            if inner.nodes.contains_key(root) && !tarjan.index.contains_key(root) {
                tarjan.run(root);
            }
        }
        tarjan.finish()
    }
}

/// Iterative Tarjan SCC. Components come out in reverse topological order of the
/// condensation, which is exactly dependency-first.
struct Tarjan<'a> {
    inner: &'a GraphInner,
    index: HashMap<ResourceUrl, usize>,
    lowlink: HashMap<ResourceUrl, usize>,
    on_stack: HashSet<ResourceUrl>,
    stack: Vec<ResourceUrl>,
    next_index: usize,
    result: TopologicalOrder,
}

impl<'a> Tarjan<'a> {
    fn new(inner: &'a GraphInner) -> Self {
        Self {
            inner,
            index: HashMap::default(),
            lowlink: HashMap::default(),
            on_stack: HashSet::default(),
            stack: Vec::new(),
            next_index: 0,
            result: TopologicalOrder::default(),
        }
    }

    fn successors(&self, url: &ResourceUrl) -> Vec<ResourceUrl> {
        let mut targets: Vec<ResourceUrl> = Vec::new();
        for edge in self.inner.references.get(url).into_iter().flatten() {
            if self.inner.nodes.contains_key(&edge.target) && !targets.contains(&edge.target) {
                targets.push(edge.target.clone());
            }
        }
        targets
    }

    fn visit(&mut self, url: &ResourceUrl) {
        self.index.insert(url.clone(), self.next_index);
        self.lowlink.insert(url.clone(), self.next_index);
        self.next_index += 1;
        self.stack.push(url.clone());
        self.on_stack.insert(url.clone());
    }

    fn run(&mut self, root: &ResourceUrl) {
        self.visit(root);
        let mut work: Vec<(ResourceUrl, Vec<ResourceUrl>, usize)> =
            vec![(root.clone(), self.successors(root), 0)];

        while let Some((url, successors, cursor)) = work.last_mut() {
            if *cursor < successors.len() {
                let next = successors[*cursor].clone();
                *cursor += 1;
                let url = url.clone();

                if !self.index.contains_key(&next) {
                    self.visit(&next);
                    let next_successors = self.successors(&next);
                    work.push((next, next_successors, 0));
                } else if self.on_stack.contains(&next) {
                    let low = self.lowlink[&url].min(self.index[&next]);
                    self.lowlink.insert(url, low);
                }
                continue;
            }

            let url = url.clone();
            work.pop();
            if let Some((parent, _, _)) = work.last() {
                let low = self.lowlink[parent].min(self.lowlink[&url]);
                self.lowlink.insert(parent.clone(), low);
            }
            if self.lowlink[&url] == self.index[&url] {
                self.emit_component(&url);
            }
        }
    }

    fn emit_component(&mut self, root: &ResourceUrl) {
        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.remove(&member);
            let done = &member == root;
            component.push(member);
            if done {
                break;
            }
        }
        component.sort_by_key(|url| self.index[url]);

        let self_referencing = component.len() == 1
            && self
                .inner
                .references
                .get(&component[0])
                .is_some_and(|edges| edges.iter().any(|e| e.target == component[0]));
        if component.len() > 1 || self_referencing {
            self.result.cycles.push(component.clone());
        }
        self.result.order.extend(component);
    }

    fn finish(self) -> TopologicalOrder {
        self.result
    }
}
