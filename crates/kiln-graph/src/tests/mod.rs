mod order_tests;
mod property_tests;

use crate::{Edge, Reference, ReferenceKind, ResourceGraph, ResourceKind, ResourceUrl};

pub(crate) fn url(path: &str) -> ResourceUrl {
    ResourceUrl::new_virtual(path)
}

pub(crate) fn import(from: &ResourceUrl, specifier: &str) -> Reference {
    Reference::new(specifier, ReferenceKind::ModuleImport).with_source(from.clone())
}

/// Build a graph from `(from, [to...])` adjacency, marking the first node as entry.
pub(crate) fn graph_of(adjacency: &[(&str, &[&str])]) -> ResourceGraph {
    let graph = ResourceGraph::new();
    if let Some((first, _)) = adjacency.first() {
        graph.mark_entry(&url(first));
    }
    for (from, targets) in adjacency {
        graph.upsert_node(url(from), ResourceKind::Module);
        for to in *targets {
            graph.upsert_node(url(to), ResourceKind::Module);
        }
    }
    for (from, targets) in adjacency {
        let source = url(from);
        let edges = targets
            .iter()
            .map(|to| Edge::new(import(&source, &format!(".{to}")), url(to)))
            .collect();
        graph
            .replace_outgoing_references(&source, edges)
            .unwrap();
    }
    graph
}
