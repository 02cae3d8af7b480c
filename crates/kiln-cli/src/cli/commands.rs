use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the versioned output tree
    ///
    /// Fetches every entry and everything it references, fingerprints the
    /// results dependency-first and writes them to the output directory.
    Build(BuildArgs),

    /// Watch the project and report hot updates
    ///
    /// Builds the resource graph, then recomputes changed files and prints
    /// one JSON hot-update event per line on stdout.
    Dev(DevArgs),

    /// Validate the configuration and entry files
    Check(CheckArgs),
}

/// Where to find the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file (kiln.toml or package.json) or the directory holding it
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Profile from `[profiles.<name>]` to apply
    #[arg(short, long, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output directory, overriding `out_dir`
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Keep unversioned file names and references
    #[arg(long)]
    pub no_versioning: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DevArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}
