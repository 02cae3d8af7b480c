//! Fetch/compute behaviour: caching, coalescing, cycles and failures.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use helpers::{dev_fixture, dev_options, fixture_with_delay, url};
use kiln_engine::{
    BuildSession, EngineError, HookName, KilnPlugin, PluginContext, PluginError, PluginPipeline,
    PluginResult, ReferenceScannerPlugin, TransformState, VirtualFilesPlugin,
};
use kiln_graph::{HotState, MemoryRuntime, Reference, ResourceKind, ResourceUrl};

#[tokio::test]
async fn fetching_twice_returns_the_same_node() {
    let fx = dev_fixture(
        &["main.js"],
        &[
            ("/main.js", "import { a } from './a.js';\nconsole.log(a);\n"),
            ("/a.js", "export const a = 1;\n"),
        ],
    );

    let first = fx.session.fetch(Reference::entry("main.js")).await.unwrap();
    let loads = fx.counter.count();
    assert_eq!(loads, 2);

    let second = fx.session.fetch(Reference::entry("main.js")).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fx.counter.count(), loads);
}

#[tokio::test]
async fn concurrent_fetches_share_one_compute() {
    let fx = fixture_with_delay(
        dev_options(&["main.js"]),
        &[("/main.js", "export const x = 1;\n")],
        Some(Duration::from_millis(50)),
    );

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let session = fx.session.clone();
        tasks.push(tokio::spawn(async move {
            session.fetch(Reference::entry("main.js")).await
        }));
    }

    let mut nodes = Vec::new();
    for task in tasks {
        nodes.push(task.await.unwrap().unwrap());
    }
    assert_eq!(fx.counter.count(), 1);
    assert!(nodes.iter().all(|node| Arc::ptr_eq(node, &nodes[0])));
}

#[tokio::test]
async fn dropping_a_fetch_leaves_the_shared_compute_running() {
    let fx = fixture_with_delay(
        dev_options(&["main.js"]),
        &[("/main.js", "export const x = 1;\n")],
        Some(Duration::from_millis(100)),
    );

    let session = fx.session.clone();
    let first = tokio::spawn(async move { session.fetch(Reference::entry("main.js")).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let session = fx.session.clone();
    let second = tokio::spawn(async move { session.fetch(Reference::entry("main.js")).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    let node = second.await.unwrap().unwrap();
    assert_eq!(fx.counter.count(), 1);
    assert!(fx.session.graph().is_fresh(&url("/main.js")));

    let again = fx.session.fetch(Reference::entry("main.js")).await.unwrap();
    assert!(Arc::ptr_eq(&node, &again));
    assert_eq!(fx.counter.count(), 1);
}

#[tokio::test]
async fn build_graph_records_edges_and_entries() {
    let fx = dev_fixture(
        &["main.js"],
        &[
            ("/main.js", "import './a.js';\nimport './b.js';\n"),
            ("/a.js", "import './shared.js';\n"),
            ("/b.js", "import './shared.js';\n"),
            ("/shared.js", "export default 1;\n"),
        ],
    );

    let entries = fx.session.build_graph().await.unwrap();
    assert_eq!(entries, vec![url("/main.js")]);

    let graph = fx.session.graph();
    assert_eq!(graph.len(), 4);
    assert!(graph.is_entry(&url("/main.js")));
    let mut dependents = graph.dependents(&url("/shared.js"));
    dependents.sort();
    assert_eq!(dependents, vec![url("/a.js"), url("/b.js")]);
    graph.check_consistency().unwrap();

    let shared = graph.node(&url("/shared.js")).unwrap();
    assert_eq!(shared.kind, ResourceKind::Module);
    assert_eq!(shared.exposed, vec!["default".to_string()]);
    assert_eq!(
        shared.original_content.as_ref().and_then(|c| c.as_text()),
        Some("export default 1;\n")
    );
}

#[tokio::test]
async fn reference_cycles_terminate() {
    let fx = dev_fixture(
        &["a.js"],
        &[
            ("/a.js", "import { b } from './b.js';\nexport const a = 1;\n"),
            ("/b.js", "import { a } from './a.js';\nexport const b = 2;\n"),
        ],
    );

    fx.session.build_graph().await.unwrap();

    let graph = fx.session.graph();
    assert_eq!(graph.len(), 2);
    let order = graph.topological_order(&[url("/a.js")]);
    assert_eq!(order.order.len(), 2);
    assert_eq!(order.cycles, vec![vec![url("/a.js"), url("/b.js")]]);
}

#[tokio::test]
async fn kind_mismatch_is_a_contract_violation() {
    let fx = dev_fixture(
        &["index.html"],
        &[
            (
                "/index.html",
                "<html><head><link rel=\"stylesheet\" href=\"./theme.js\"></head></html>\n",
            ),
            ("/theme.js", "export const theme = 'dark';\n"),
        ],
    );

    let err = fx.session.build_graph().await.unwrap_err();
    match &err {
        EngineError::ContractViolation {
            url: target,
            expected,
            actual,
            trace,
        } => {
            assert_eq!(target, &url("/theme.js"));
            assert_eq!(expected, "style");
            assert_eq!(actual, "module");
            assert_eq!(trace.format_chain(), "\"index.html\" -> \"./theme.js\"");
        }
        other => panic!("expected contract violation, got {other:?}"),
    }
    assert_eq!(err.kind(), "contract-violation");
}

#[tokio::test]
async fn unresolvable_specifier_fails_with_trace() {
    let fx = dev_fixture(&["main.js"], &[("/main.js", "import React from 'react';\n")]);

    let err = fx.session.build_graph().await.unwrap_err();
    match err {
        EngineError::Resolution { specifier, trace } => {
            assert_eq!(specifier, "react");
            assert_eq!(trace.len(), 2);
        }
        other => panic!("expected resolution failure, got {other:?}"),
    }
}

#[derive(Debug)]
struct FailingTransform;

#[async_trait]
impl KilnPlugin for FailingTransform {
    fn name(&self) -> &str {
        "boom"
    }

    async fn transform_content(
        &self,
        state: &mut TransformState,
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        if state.url().file_name() == "bad.js" {
            return Err(PluginError::new("cannot handle this file"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn plugin_errors_name_plugin_and_hook() {
    let files = VirtualFilesPlugin::from_files([
        ("/main.js", "import './bad.js';\n"),
        ("/bad.js", "export {};\n"),
    ])
    .unwrap();
    let pipeline = PluginPipeline::new(vec![
        Arc::new(files),
        Arc::new(ReferenceScannerPlugin::new()),
        Arc::new(FailingTransform),
    ]);
    let session = BuildSession::new(
        dev_options(&["main.js"]),
        pipeline,
        Arc::new(MemoryRuntime::default()),
    );

    let err = session.build_graph().await.unwrap_err();
    match err {
        EngineError::Plugin {
            plugin,
            hook,
            message,
            trace,
        } => {
            assert_eq!(plugin, "boom");
            assert_eq!(hook, HookName::TransformContent);
            assert_eq!(message, "cannot handle this file");
            assert_eq!(trace.innermost().unwrap().specifier, "./bad.js");
        }
        other => panic!("expected plugin failure, got {other:?}"),
    }
}

#[tokio::test]
async fn hot_accept_specifiers_resolve_to_urls() {
    let fx = dev_fixture(
        &["main.js"],
        &[
            (
                "/main.js",
                "import { render } from './view.js';\nimport.meta.hot.accept(['./view.js'], () => render());\n",
            ),
            ("/view.js", "export function render() {}\n"),
        ],
    );

    fx.session.build_graph().await.unwrap();
    let main = fx.session.graph().node(&url("/main.js")).unwrap();
    assert_eq!(
        main.hot_state,
        HotState::AcceptsDependencies(vec![url("/view.js")])
    );
}

#[tokio::test]
async fn inline_scripts_become_inline_nodes() {
    let html = "<html><head>\n<script type=\"module\">import { a } from './a.js';</script>\n</head></html>\n";
    let fx = dev_fixture(
        &["index.html"],
        &[("/index.html", html), ("/a.js", "export const a = 1;\n")],
    );

    fx.session.build_graph().await.unwrap();

    let graph = fx.session.graph();
    let inline_url = ResourceUrl::inline(&url("/index.html"), 2, 23, "js");
    let inline = graph.node(&inline_url).unwrap();
    assert_eq!(inline.kind, ResourceKind::InlineVirtual);
    assert_eq!(graph.dependents(&url("/a.js")), vec![inline_url]);
}

#[tokio::test]
async fn fetch_without_entries_leaves_node_unmarked() {
    let fx = dev_fixture(&[], &[("/lib.js", "export const lib = 1;\n")]);
    let node = fx.session.fetch(Reference::entry("lib.js")).await.unwrap();
    assert!(!node.is_entry);
    assert!(fx.session.graph().entry_points().is_empty());
}
