//! Command-line definition.
//!
//! - `kiln build` - finalize the graph and write the versioned output tree
//! - `kiln dev` - build the graph, watch the root and print hot updates
//! - `kiln check` - validate the configuration

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, CheckArgs, Command, ConfigArgs, DevArgs};

/// kiln - resource graph builder with hot updates and content versioning
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Resource graph builder with hot updates and content versioning"
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
