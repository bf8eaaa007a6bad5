mod cli;
mod config;
mod domain;
mod error;
mod infra;
mod logging;
mod media;
mod providers;
mod workflows;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use cli::Cli;
use config::Settings;
use workflows::pipeline;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load()?;
    settings.apply_cli(&cli);

    // Held until exit so buffered file log lines get flushed
    let _guard = logging::init(settings.verbose, settings.log_folder())?;

    if let Err(e) = pipeline::run(&settings) {
        error!("Error: {e:#}");
        return Err(e);
    }
    Ok(())
}
