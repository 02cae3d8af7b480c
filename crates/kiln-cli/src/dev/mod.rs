//! Watch mode support for `kiln dev`.

mod watcher;

pub use watcher::{FileWatcher, WatchEvent};
