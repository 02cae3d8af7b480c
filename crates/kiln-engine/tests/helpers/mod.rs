//! Shared fixtures for kiln-engine integration tests.
//!
//! Sessions run entirely in memory: a [`VirtualFilesPlugin`] serves the
//! files, a [`CountingPlugin`] in front of it counts loads.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kiln_engine::{
    BuildMode, BuildSession, EntryPoint, KilnPlugin, LoadResult, PluginContext, PluginPipeline,
    PluginResult, ReferenceScannerPlugin, SessionOptions, VirtualFilesPlugin,
};
use kiln_graph::{MemoryRuntime, ResourceUrl};

/// Counts `load_content` calls and optionally slows them down. Never loads anything.
#[derive(Debug, Default, Clone)]
pub struct CountingPlugin {
    pub loads: Arc<AtomicUsize>,
    pub delay: Option<Duration>,
}

impl CountingPlugin {
    pub fn count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KilnPlugin for CountingPlugin {
    fn name(&self) -> &str {
        "counting"
    }

    async fn load_content(
        &self,
        _url: &ResourceUrl,
        _ctx: &PluginContext,
    ) -> PluginResult<Option<LoadResult>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(None)
    }
}

pub struct Fixture {
    pub session: BuildSession,
    pub files: VirtualFilesPlugin,
    pub counter: CountingPlugin,
}

impl Fixture {
    /// Replace a file's content, as an editor would.
    pub fn write(&self, path: &str, content: &str) {
        self.files.insert(path, content).unwrap();
    }
}

pub fn url(path: &str) -> ResourceUrl {
    ResourceUrl::new_virtual(path)
}

pub fn dev_options(entries: &[&str]) -> SessionOptions {
    entries.iter().fold(
        SessionOptions::new(ResourceUrl::new_virtual("/")),
        |options, entry| options.with_entry(EntryPoint::new(*entry)),
    )
}

pub fn build_options(entries: &[&str]) -> SessionOptions {
    dev_options(entries).with_mode(BuildMode::Build)
}

pub fn fixture_with(options: SessionOptions, files: &[(&str, &str)]) -> Fixture {
    fixture_with_delay(options, files, None)
}

pub fn fixture_with_delay(
    options: SessionOptions,
    files: &[(&str, &str)],
    delay: Option<Duration>,
) -> Fixture {
    let files = VirtualFilesPlugin::from_files(files.iter().copied()).unwrap();
    let counter = CountingPlugin {
        loads: Arc::default(),
        delay,
    };
    let pipeline = PluginPipeline::new(vec![
        Arc::new(counter.clone()),
        Arc::new(files.clone()),
        Arc::new(ReferenceScannerPlugin::new()),
    ]);
    let session = BuildSession::new(options, pipeline, Arc::new(MemoryRuntime::default()));
    Fixture {
        session,
        files,
        counter,
    }
}

/// Dev session over `files` with the given entries.
pub fn dev_fixture(entries: &[&str], files: &[(&str, &str)]) -> Fixture {
    fixture_with(dev_options(entries), files)
}
