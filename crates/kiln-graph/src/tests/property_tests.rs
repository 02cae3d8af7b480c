//! Property-based tests for the graph's structural invariants.

use proptest::prelude::*;

use super::{import, url};
use crate::{Edge, ResourceGraph, ResourceKind, ResourceUrl};

/// Adjacency over up to 8 nodes named `/n0.js` .. `/n7.js`.
fn adjacency_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..=8).prop_flat_map(|size| {
        prop::collection::vec(prop::collection::vec(0..size, 0..=3), size)
    })
}

fn node(idx: usize) -> ResourceUrl {
    url(&format!("/n{idx}.js"))
}

fn build(adjacency: &[Vec<usize>]) -> ResourceGraph {
    let graph = ResourceGraph::new();
    graph.mark_entry(&node(0));
    for idx in 0..adjacency.len() {
        graph.upsert_node(node(idx), ResourceKind::Module);
    }
    for (from, targets) in adjacency.iter().enumerate() {
        let source = node(from);
        let edges = targets
            .iter()
            .map(|to| Edge::new(import(&source, &format!("./n{to}.js")), node(*to)))
            .collect();
        graph.replace_outgoing_references(&source, edges).unwrap();
    }
    graph
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// A references B exactly when B lists A as a dependent.
    #[test]
    fn prop_forward_and_reverse_edges_mirror(adjacency in adjacency_strategy()) {
        let graph = build(&adjacency);
        prop_assert!(graph.check_consistency().is_ok());

        for url in graph.urls() {
            for edge in graph.references(&url) {
                prop_assert!(graph.dependents(&edge.target).contains(&url));
            }
        }
    }

    /// Outside of cycles, every target precedes its referrer.
    #[test]
    fn prop_topological_order_respects_edges(adjacency in adjacency_strategy()) {
        let graph = build(&adjacency);
        let order = graph.topological_order(&[node(0)]);
        let positions = order.positions();

        for url in &order.order {
            for edge in graph.references(url) {
                let same_cycle = order
                    .cycles
                    .iter()
                    .any(|group| group.contains(url) && group.contains(&edge.target));
                if !same_cycle {
                    prop_assert!(positions[&edge.target] < positions[url]);
                }
            }
        }
    }

    /// The order covers exactly the nodes reachable from the root, once each.
    #[test]
    fn prop_order_covers_reachable_nodes(adjacency in adjacency_strategy()) {
        let graph = build(&adjacency);
        let order = graph.topological_order(&[node(0)]);

        let mut expected = graph.descendants(&node(0));
        expected.push(node(0));
        expected.sort();
        expected.dedup();

        let mut actual = order.order.clone();
        actual.sort();
        prop_assert_eq!(actual, expected);
    }

    /// Dropping the root's references leaves only nodes still reachable or kept alive by a cycle.
    #[test]
    fn prop_collection_keeps_graph_consistent(adjacency in adjacency_strategy()) {
        let graph = build(&adjacency);
        graph.replace_outgoing_references(&node(0), Vec::new()).unwrap();
        prop_assert!(graph.check_consistency().is_ok());

        graph.remove_unreachable();
        prop_assert!(graph.check_consistency().is_ok());
        for url in graph.urls() {
            prop_assert!(url == node(0) || graph.depends_on(&node(0), &url));
        }
    }
}
