use super::{graph_of, url};
use crate::ResourceGraph;

#[test]
fn chain_orders_dependencies_first() {
    let graph = graph_of(&[("/a.js", &["/b.js"]), ("/b.js", &["/c.js"])]);
    let order = graph.topological_order(&[url("/a.js")]);

    assert_eq!(order.order, vec![url("/c.js"), url("/b.js"), url("/a.js")]);
    assert!(order.cycles.is_empty());
}

#[test]
fn two_node_cycle_is_grouped_in_discovery_order() {
    let graph = graph_of(&[("/a.js", &["/b.js"]), ("/b.js", &["/a.js"])]);
    let order = graph.topological_order(&[url("/a.js")]);

    assert_eq!(order.order, vec![url("/a.js"), url("/b.js")]);
    assert_eq!(order.cycles, vec![vec![url("/a.js"), url("/b.js")]]);
    assert!(order.is_cyclic(&url("/b.js")));
}

#[test]
fn diamond_visits_shared_dependency_once() {
    let graph = graph_of(&[
        ("/main.js", &["/left.js", "/right.js"]),
        ("/left.js", &["/shared.js"]),
        ("/right.js", &["/shared.js"]),
    ]);
    let order = graph.topological_order(&[url("/main.js")]);

    assert_eq!(
        order.order,
        vec![url("/shared.js"), url("/left.js"), url("/right.js"), url("/main.js")]
    );
}

#[test]
fn cycle_below_acyclic_prefix() {
    // main -> a -> b -> c -> b
    let graph = graph_of(&[
        ("/main.js", &["/a.js"]),
        ("/a.js", &["/b.js"]),
        ("/b.js", &["/c.js"]),
        ("/c.js", &["/b.js"]),
    ]);
    let order = graph.topological_order(&[url("/main.js")]);

    assert_eq!(
        order.order,
        vec![url("/b.js"), url("/c.js"), url("/a.js"), url("/main.js")]
    );
    assert_eq!(order.cycles, vec![vec![url("/b.js"), url("/c.js")]]);
}

#[test]
fn self_reference_counts_as_cycle() {
    let graph = graph_of(&[("/a.js", &["/a.js"])]);
    let order = graph.topological_order(&[url("/a.js")]);
    assert_eq!(order.order, vec![url("/a.js")]);
    assert_eq!(order.cycles, vec![vec![url("/a.js")]]);
}

#[test]
fn unknown_roots_are_skipped() {
    let graph = ResourceGraph::new();
    let order = graph.topological_order(&[url("/missing.js")]);
    assert!(order.order.is_empty());
}

#[test]
fn order_is_stable_across_calls() {
    let graph = graph_of(&[
        ("/main.js", &["/x.js", "/y.js"]),
        ("/x.js", &["/y.js"]),
        ("/y.js", &["/x.js"]),
    ]);
    let first = graph.topological_order(&[url("/main.js")]);
    let second = graph.topological_order(&[url("/main.js")]);
    assert_eq!(first, second);
    assert_eq!(first.positions()[&url("/main.js")], 2);
}
