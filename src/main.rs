//! audio-export CLI
//!
//! Batch effect chain and export for folders of WAV/MP3 files.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{error, info};

use audio_export::cli::{commands, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("audio-export v{}", env!("CARGO_PKG_VERSION"));

    let report = commands::run(&cli).context("batch export could not start")?;

    if report.has_failures() {
        error!(
            "{} of {} file(s) failed",
            report.failed(),
            report.files.len()
        );
        std::process::exit(1);
    }
    Ok(())
}
