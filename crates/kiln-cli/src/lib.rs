//! Command-line interface for kiln.
//!
//! - [`cli`] - clap argument definitions
//! - `commands` - `build`, `dev` and `check`
//! - [`dev`] - file watching for `kiln dev`
//! - [`error`] - [`CliError`] and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal messages and formatting

pub mod cli;
pub mod commands;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
