//! `kiln build`: finalize the graph and write the output tree.

use std::time::Instant;

use kiln_engine::BuildMode;
use tracing::debug;

use crate::cli::BuildArgs;
use crate::commands::utils::{LoadedConfig, load_config, open_session, resolve_path};
use crate::error::Result;
use crate::ui;

pub async fn execute(args: BuildArgs) -> Result<()> {
    let started = Instant::now();
    let mut loaded = load_config(&args.config)?;
    if args.no_versioning {
        loaded.config.versioning = false;
    }
    let out_dir = match &args.out_dir {
        Some(dir) => resolve_path(dir, &std::env::current_dir()?),
        None => loaded.config.out_dir(&loaded.base_dir),
    };

    let LoadedConfig { config, base_dir } = &loaded;
    ui::info(&format!(
        "Building {} entr{} from {}",
        config.entries.len(),
        if config.entries.len() == 1 { "y" } else { "ies" },
        config.root_dir(base_dir).display()
    ));

    let session = open_session(&loaded, BuildMode::Build)?;
    let output = session.finalize_all().await?;
    if !output.cycles.is_empty() {
        ui::warning(&format!(
            "{} reference cycle(s) routed through the import map",
            output.cycles.len()
        ));
    }

    let written = output.write_to(session.runtime().as_ref(), &out_dir).await?;
    debug!(files = written.len(), out_dir = %out_dir.display(), "output written");

    let summary: Vec<(String, u64)> = output
        .files
        .iter()
        .map(|(name, file)| (name.clone(), file.content.len() as u64))
        .collect();
    ui::print_build_summary(&summary, started.elapsed());
    ui::success(&format!("Wrote {} files to {}", written.len(), out_dir.display()));
    Ok(())
}
