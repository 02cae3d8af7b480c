//! Configuration for kiln.
//!
//! A project is configured by `kiln.toml` or a `"kiln"` field in
//! `package.json`:
//!
//! ```toml
//! root = "site"
//! entries = ["index.html", { path = "src/worker.js", kind = "module" }]
//! versioning_strategy = "indirection"
//!
//! [dev]
//! debounce_ms = 50
//!
//! [profiles.ci]
//! versioning = false
//! ```
//!
//! [`ConfigDiscovery`] finds and loads the file, applies `KILN_VERSIONING` and
//! `KILN_HOT_UPDATE` from the environment, and [`KilnConfig::session_options`]
//! turns the result into engine options.

pub mod config;
pub mod dev;
pub mod discovery;
pub mod error;
pub mod validation;

pub use config::{EntryConfig, KilnConfig};
pub use dev::DevConfig;
pub use discovery::{CONFIG_FILE, ConfigDiscovery, ENV_PREFIX, PACKAGE_JSON_FIELD, discover};
pub use error::{ConfigError, Result};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};

pub use kiln_engine::VersioningStrategy;
