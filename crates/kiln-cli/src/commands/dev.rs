//! `kiln dev`: build the graph, watch the root and report hot updates.
//!
//! Every hot-update event is printed to stdout as one JSON line; status
//! messages go to stderr.

use std::path::PathBuf;
use std::time::Instant;

use kiln_engine::{BuildMode, BuildSession, HotUpdate, HotUpdateEvent};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::cli::DevArgs;
use crate::commands::utils::{load_config, open_session, resolve_path};
use crate::dev::{FileWatcher, WatchEvent};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: DevArgs) -> Result<()> {
    let started = Instant::now();
    let loaded = load_config(&args.config)?;
    let session = open_session(&loaded, BuildMode::Dev)?;

    let entries = session.build_graph().await?;
    ui::success(&format!(
        "Built {} resources from {} entries in {}",
        session.graph().len(),
        entries.len(),
        ui::format_duration(started.elapsed())
    ));

    let config = &loaded.config;
    let root = config.root_dir(&loaded.base_dir);
    let extra: Vec<PathBuf> = config
        .dev
        .watch_paths
        .iter()
        .map(|path| resolve_path(path, &loaded.base_dir))
        .collect();
    let mut ignore = config.dev.ignore.clone();
    if let Ok(relative) = config.out_dir(&loaded.base_dir).strip_prefix(&root) {
        ignore.push(relative.to_string_lossy().into_owned());
    }

    let (watcher, mut changes) = FileWatcher::new(root, &extra, ignore, config.dev.debounce_ms)?;
    ui::info(&format!("Watching {}", watcher.root().display()));

    let mut updates = session.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "hot-update printer fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    ui::info("Press Ctrl+C to stop");
    loop {
        tokio::select! {
            Some(event) = changes.recv() => handle_change(&session, event).await,
            _ = signal::ctrl_c() => {
                ui::info("Stopping");
                break;
            }
        }
    }

    printer.abort();
    Ok(())
}

async fn handle_change(session: &BuildSession, event: WatchEvent) {
    let Some(change) = event.to_file_change() else {
        return;
    };
    match session.handle_change(change).await {
        HotUpdate::None => debug!(path = %event.path.display(), "no observable change"),
        HotUpdate::Partial(events) => {
            ui::info(&format!("{} hot update(s) from {}", events.len(), event.path.display()));
        }
        HotUpdate::FullReload { root, reason, .. } => {
            ui::info(&format!("Full reload of {root}: {reason}"));
        }
        HotUpdate::Failed { url, error, .. } => {
            ui::error(&format!("Update of {url} failed: {error}"));
        }
    }
}

fn print_event(event: &HotUpdateEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(error = %err, "cannot serialize hot-update event"),
    }
}
