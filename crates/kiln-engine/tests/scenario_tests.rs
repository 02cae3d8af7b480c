//! End-to-end scenarios over a small in-memory site.

mod helpers;

use helpers::{dev_fixture, url};
use kiln_engine::{EngineError, FileChange, HotUpdate, ReloadReason, UpdateKind};

#[tokio::test]
async fn leaf_change_without_acceptors_reloads_from_entry() {
    let fx = dev_fixture(
        &["main.js"],
        &[
            ("/main.js", "import { a } from './a.js';\nconsole.log(a);\n"),
            ("/a.js", "import { b } from './b.js';\nexport const a = b + 1;\n"),
            ("/b.js", "export const b = 1;\n"),
        ],
    );
    fx.session.build_graph().await.unwrap();

    fx.write("/b.js", "export const b = 41;\n");
    let update = fx.session.handle_change(FileChange::modified(url("/b.js"))).await;

    match &update {
        HotUpdate::FullReload {
            changed,
            root,
            reason,
        } => {
            assert_eq!(changed, &url("/b.js"));
            assert_eq!(root, &url("/main.js"));
            assert_eq!(reason, &ReloadReason::NoAcceptingBoundary);
        }
        other => panic!("expected full reload, got {other:?}"),
    }
    let events = update.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].url, url("/main.js"));
    assert_eq!(events[0].update_kind, UpdateKind::FullReload);

    let b = fx.session.graph().node(&url("/b.js")).unwrap();
    assert_eq!(b.content.as_text(), Some("export const b = 41;\n"));
}

#[tokio::test]
async fn missing_import_reports_not_found_with_location() {
    let fx = dev_fixture(
        &["main.js"],
        &[
            ("/main.js", "import { a } from './a.js';\nimport { gone } from './missing.js';\n"),
            ("/a.js", "export const a = 1;\n"),
        ],
    );

    let err = fx.session.build_graph().await.unwrap_err();
    let EngineError::NotFound { url: missing, trace } = &err else {
        panic!("expected not found, got {err:?}");
    };
    assert_eq!(missing, &url("/missing.js"));

    let frame = trace.innermost().unwrap();
    assert_eq!(frame.specifier, "./missing.js");
    assert_eq!(frame.source_url, Some(url("/main.js")));
    assert_eq!(frame.position.line, 2);

    let rendered = err.to_string();
    assert!(rendered.contains("main.js:2"), "{rendered}");
    assert!(rendered.contains("./missing.js"), "{rendered}");
}
