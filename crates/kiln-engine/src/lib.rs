//! # kiln-engine
//!
//! Plugin pipeline, fetch/compute, hot updates and versioning on top of
//! [`kiln_graph`].
//!
//! ```text
//!   entry ──► fetch ──► resolve ──► load ──► transform ──► commit
//!               ▲                                            │
//!               └──────────── walk new references ◄──────────┘
//!
//!   file change ──► handle_change ──► recompute ──► walk dependents ──► events
//!
//!   finalize_all ──► build graph ──► versioner (dependency-first) ──► output
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kiln_engine::{
//!     BuildMode, BuildSession, EntryPoint, PluginRegistry, SessionOptions,
//! };
//! use kiln_graph::{NativeRuntime, ResourceUrl};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let root = ResourceUrl::from_path("/srv/site")?;
//! let options = SessionOptions::new(root)
//!     .with_mode(BuildMode::Build)
//!     .with_entry(EntryPoint::new("index.html"));
//! let pipeline = PluginRegistry::with_builtins().build(&["fs".into(), "scanner".into()])?;
//!
//! let session = BuildSession::new(options, pipeline, Arc::new(NativeRuntime::new()));
//! let output = session.finalize_all().await?;
//! output
//!     .write_to(session.runtime().as_ref(), std::path::Path::new("/srv/site/dist"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod builtins;
pub mod changes;
pub mod error;
mod fetch;
pub mod hot;
pub mod output;
pub mod plugins;
mod session;
pub mod versioning;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use builtins::{FileSystemPlugin, ReferenceScannerPlugin, VirtualFilesPlugin};
pub use error::{EngineError, Result};
pub use hot::{ChangeKind, FileChange, HotUpdate, HotUpdateEvent, ReloadReason, UpdateKind};
pub use output::{FinalizedOutput, IMPORT_MAP_FILE, OutputFile};
pub use plugins::{
    BuildMode, FinalizeInput, FormatInput, HookName, HotDeclaration, KilnPlugin, LoadResult,
    LoadedContent, PluginContext, PluginError, PluginPipeline, PluginRegistry, PluginResult,
    TransformState,
};
pub use session::{BuildSession, EntryPoint, SessionOptions};
pub use versioning::{FINGERPRINT_LEN, IndirectionTable, Versioner, VersioningStrategy};

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};
