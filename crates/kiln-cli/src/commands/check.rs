//! `kiln check`: validate the configuration without building.

use kiln_engine::BuildMode;

use crate::cli::CheckArgs;
use crate::commands::utils::{load_config, open_session};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: CheckArgs) -> Result<()> {
    let loaded = load_config(&args.config)?;
    let session = open_session(&loaded, BuildMode::Dev)?;

    let options = session.options();
    for entry in &options.entries {
        ui::info(&format!("entry {}", entry.specifier));
    }
    ui::info(&format!("plugins {}", session.pipeline().names().join(", ")));
    ui::success("Configuration is valid");
    Ok(())
}
