//! Builds against the real filesystem with the built-in plugins.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use kiln_engine::{
    BuildMode, BuildSession, EngineError, EntryPoint, FileChange, PluginRegistry, SessionOptions,
};
use kiln_graph::{NativeRuntime, ResourceUrl};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn session(dir: &Path, mode: BuildMode) -> BuildSession {
    let options = SessionOptions::new(ResourceUrl::from_path(dir).unwrap())
        .with_mode(mode)
        .with_entry(EntryPoint::new("index.html"));
    let pipeline = PluginRegistry::with_builtins()
        .build(&["fs".to_string(), "scanner".to_string()])
        .unwrap();
    BuildSession::new(options, pipeline, Arc::new(NativeRuntime::new()))
}

fn site(dir: &Path) {
    write(
        dir,
        "index.html",
        "<html><head><script type=\"module\" src=\"./src/main.js\"></script></head></html>\n",
    );
    write(dir, "src/main.js", "import { a } from './lib/a.js';\nconsole.log(a);\n");
    write(dir, "src/lib/a.js", "export const a = 1;\n");
}

#[tokio::test]
async fn builds_site_from_disk() {
    let temp = TempDir::new().unwrap();
    site(temp.path());

    let session = session(temp.path(), BuildMode::Build);
    let output = session.finalize_all().await.unwrap();
    let out_dir = temp.path().join("dist");
    let written = output.write_to(session.runtime().as_ref(), &out_dir).await.unwrap();
    assert_eq!(written.len(), 3);

    let a = ResourceUrl::from_path(temp.path().join("src/lib/a.js")).unwrap();
    let a_path = output.path_of(&a).unwrap().to_string();
    assert!(a_path.starts_with("src/lib/a."));
    assert!(out_dir.join(&a_path).is_file());

    let index = fs::read_to_string(out_dir.join("index.html")).unwrap();
    assert!(index.contains("src=\"./src/main."));

    let main = ResourceUrl::from_path(temp.path().join("src/main.js")).unwrap();
    let main_path = output.path_of(&main).unwrap();
    let main_text = fs::read_to_string(out_dir.join(main_path)).unwrap();
    let a_file = Path::new(&a_path).file_name().unwrap().to_str().unwrap();
    assert!(main_text.contains(&format!("'./lib/{a_file}'")));
}

#[tokio::test]
async fn missing_file_on_disk_is_not_found() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "index.html",
        "<html><head><script type=\"module\" src=\"./app.js\"></script></head></html>\n",
    );

    let err = session(temp.path(), BuildMode::Dev).build_graph().await.unwrap_err();
    let EngineError::NotFound { url, .. } = err else {
        panic!("expected not found, got {err:?}");
    };
    assert_eq!(url, ResourceUrl::from_path(temp.path().join("app.js")).unwrap());
}

#[tokio::test]
async fn edits_on_disk_are_picked_up_by_change_handling() {
    let temp = TempDir::new().unwrap();
    site(temp.path());
    let session = session(temp.path(), BuildMode::Dev);
    session.build_graph().await.unwrap();

    write(temp.path(), "src/lib/a.js", "export const a = 2;\n");
    let a = ResourceUrl::from_path(temp.path().join("src/lib/a.js")).unwrap();
    let update = session.handle_change(FileChange::modified(a.clone())).await;
    assert!(update.is_full_reload());

    let node = session.graph().node(&a).unwrap();
    assert_eq!(node.content.as_text(), Some("export const a = 2;\n"));
}
