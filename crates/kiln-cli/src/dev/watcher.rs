//! Debounced recursive file watcher.
//!
//! Emits one [`WatchEvent`] per relevant path. Paths outside the root, hidden
//! files and configured ignore patterns are dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use kiln_engine::{ChangeKind, FileChange};
use kiln_graph::ResourceUrl;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{CliError, Result};

/// A filesystem change under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    /// The engine-side change, or `None` for a path that is not absolute.
    pub fn to_file_change(&self) -> Option<FileChange> {
        let url = ResourceUrl::from_path(&self.path).ok()?;
        Some(FileChange::new(url, self.kind))
    }
}

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root` and `extra` recursively.
    ///
    /// `ignore` entries are path prefixes relative to the root (`node_modules`)
    /// or extension patterns (`*.log`).
    pub fn new(
        root: PathBuf,
        extra: &[PathBuf],
        ignore: Vec<String>,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<WatchEvent>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(256);
        let mut debouncer = Debouncer::new(Duration::from_millis(debounce_ms));
        let filter_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            let kind = match event.kind {
                EventKind::Create(_) => ChangeKind::Created,
                EventKind::Modify(_) => ChangeKind::Modified,
                EventKind::Remove(_) => ChangeKind::Removed,
                _ => return,
            };
            for path in event.paths {
                if should_ignore(&path, &filter_root, &ignore) {
                    continue;
                }
                if !debouncer.admit(&path, Instant::now()) {
                    continue;
                }
                trace!(path = %path.display(), ?kind, "file event");
                // Receiver gone means the dev loop is shutting down.
                let _ = tx.blocking_send(WatchEvent { path, kind });
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;
        for path in extra {
            watcher.watch(path, RecursiveMode::Recursive)?;
        }

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Per-path debounce. Entries older than the window are pruned on insert.
struct Debouncer {
    window: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_seen: HashMap::new(),
        }
    }

    /// Whether an event for `path` at `now` falls outside the window.
    fn admit(&mut self, path: &Path, now: Instant) -> bool {
        let window = self.window;
        let fresh = |seen: &Instant| now.saturating_duration_since(*seen) < window;
        if self.last_seen.get(path).is_some_and(fresh) {
            return false;
        }
        self.last_seen.retain(|_, seen| fresh(seen));
        self.last_seen.insert(path.to_path_buf(), now);
        true
    }
}

fn should_ignore(path: &Path, root: &Path, ignore: &[String]) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };

    let hidden = relative.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    });
    if hidden {
        return true;
    }

    let relative = relative.to_string_lossy();
    ignore.iter().any(|pattern| match pattern.strip_prefix('*') {
        Some(suffix) => relative.ends_with(suffix),
        None => {
            let pattern = pattern.trim_end_matches('/');
            relative == pattern
                || relative.starts_with(&format!("{pattern}/"))
                || relative.contains(&format!("/{pattern}/"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ignored(path: &str, patterns: &[&str]) -> bool {
        let patterns: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        should_ignore(Path::new(path), Path::new("/project"), &patterns)
    }

    #[test]
    fn ignores_directory_patterns() {
        assert!(ignored("/project/node_modules/pkg/index.js", &["node_modules"]));
        assert!(ignored("/project/web/node_modules/a.js", &["node_modules"]));
        assert!(!ignored("/project/src/index.js", &["node_modules"]));
        assert!(!ignored("/project/distance.js", &["dist"]));
    }

    #[test]
    fn ignores_extension_patterns() {
        assert!(ignored("/project/debug.log", &["*.log"]));
        assert!(!ignored("/project/src/log.js", &["*.log"]));
    }

    #[test]
    fn ignores_hidden_paths() {
        assert!(ignored("/project/.git/config", &[]));
        assert!(ignored("/project/src/.cache/x.js", &[]));
    }

    #[test]
    fn extra_watch_paths_are_not_filtered_by_root() {
        assert!(!ignored("/shared/lib.js", &["node_modules"]));
    }

    #[test]
    fn debounce_drops_repeats_within_the_window() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        let start = Instant::now();
        let a = Path::new("/project/a.js");
        let b = Path::new("/project/b.js");

        assert!(debouncer.admit(a, start));
        assert!(!debouncer.admit(a, start + Duration::from_millis(10)));
        assert!(debouncer.admit(b, start + Duration::from_millis(10)));
        assert!(debouncer.admit(a, start + Duration::from_millis(60)));
    }

    #[test]
    fn debounce_prunes_stale_paths() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        let start = Instant::now();
        for i in 0..100 {
            let path = PathBuf::from(format!("/project/gen/{i}.js"));
            assert!(debouncer.admit(&path, start));
        }
        assert_eq!(debouncer.last_seen.len(), 100);

        let later = start + Duration::from_millis(100);
        assert!(debouncer.admit(Path::new("/project/a.js"), later));
        assert_eq!(debouncer.last_seen.len(), 1);
        assert!(debouncer.last_seen.contains_key(Path::new("/project/a.js")));
    }

    #[test]
    fn events_convert_to_file_changes() {
        let event = WatchEvent {
            path: PathBuf::from("/project/src/a.js"),
            kind: ChangeKind::Removed,
        };
        let change = event.to_file_change().unwrap();
        assert_eq!(change.url, ResourceUrl::from_path("/project/src/a.js").unwrap());
        assert_eq!(change.kind, ChangeKind::Removed);

        let relative = WatchEvent {
            path: PathBuf::from("src/a.js"),
            kind: ChangeKind::Modified,
        };
        assert!(relative.to_file_change().is_none());
    }
}
