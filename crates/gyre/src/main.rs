//! `gyre`: validate a model configuration and print what a run would
//! allocate and execute.

use clap::Parser;
use gyre::cli::CliArgs;
use gyre::dry_run::dry_run;
use gyre::logging;
use gyre::types::backend_by_name;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logging::init(args.loglevel, args.logfile.as_deref())?;

    let settings = args.load_settings()?;
    let backend = backend_by_name(&args.backend)?;
    info!(settings = %args.settings.display(), backend = backend.name(), "configuration loaded");

    let run = args.run_config(&settings)?;
    let report = dry_run(&settings, backend.as_ref(), run)?;
    print!("{report}");
    Ok(())
}
