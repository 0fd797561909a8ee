//! PulseMap - headless audio-reactive parameter engine
//!
//! Runs the analysis loop against a synthetic audio source and prints the
//! published parameter frames.

mod cli;
mod demo_source;
mod logging;
mod logging_setup;
mod runner;

use anyhow::Result;
use clap::Parser;
use tracing::info;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    let _log_guard = logging_setup::init(&args.log_config())?;

    info!("==========================================");
    info!("===      PulseMap Session Started      ===");
    info!("==========================================");

    runner::run(&args)
}
