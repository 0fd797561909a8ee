//! Headless session: demo audio in, parameter frames out

use crate::cli::Args;
use crate::demo_source::{DemoConfig, DemoSource};
use anyhow::{Context, Result};
use pulsemap_core::{AnalysisLoop, EngineConfig, ParameterFrame, SpectrumBank};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

const DEMO_CONFIG: &str = include_str!("../demo.toml");

/// Read an engine configuration file; `.json` files parse as JSON, anything else as TOML
pub fn load_engine_config(path: &Path) -> Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        EngineConfig::from_json_str(&text)
    } else {
        EngineConfig::from_toml_str(&text)
    };
    config.with_context(|| format!("Invalid config file: {:?}", path))
}

/// Built-in configuration matching the demo tracks
pub fn demo_config() -> Result<EngineConfig> {
    EngineConfig::from_toml_str(DEMO_CONFIG).context("Built-in demo config is invalid")
}

/// One-line summary of a frame for the console
pub fn format_frame(frame: &ParameterFrame) -> String {
    let mut line = format!("tick {:>6}", frame.tick);
    for reading in &frame.triggers {
        let mark = if reading.active { '*' } else { ' ' };
        let _ = write!(line, " | {}{} {:.3}", mark, reading.name, reading.intensity);
    }
    for (name, value) in &frame.values {
        let _ = write!(line, " | {}={:.3}", name, value);
    }
    if let Some(progress) = frame.transition_progress {
        let _ = write!(line, " | transition {:.2}", progress);
    }
    line
}

/// Run a session until the configured run time elapses
pub fn run(args: &Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_engine_config(path)?,
        None => {
            info!("No config given, using the built-in demo setup");
            demo_config()?
        }
    };
    info!(
        "Engine: {} triggers, {} mappings, transition {}",
        config.triggers.len(),
        config.mappings.len(),
        if config.transition.is_some() { "on" } else { "off" }
    );

    let bank = Arc::new(SpectrumBank::new());
    let demo = DemoConfig {
        sample_rate: config.sample_rate,
        bpm: args.bpm,
        ..Default::default()
    };
    let mut audio =
        DemoSource::spawn(demo, bank.clone()).context("Failed to start demo audio thread")?;

    let analysis = AnalysisLoop::new(&config, bank)?;
    let mut handle = analysis
        .spawn()
        .context("Failed to start analysis loop thread")?;
    let reader = handle.reader().clone();

    let started = Instant::now();
    let run_time = args.run_time();
    let mut last_tick = 0;
    loop {
        thread::sleep(args.report_interval());

        let frame = reader.latest();
        if frame.tick == last_tick {
            warn!("No new frame since tick {}", last_tick);
        }
        last_tick = frame.tick;
        println!("{}", format_frame(&frame));

        if run_time.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
    }

    handle.stop();
    audio.stop();

    let stats = handle.stats();
    info!(
        "Session finished: {} ticks, last {} us, max {} us, {} rejected, {} faults",
        stats.ticks,
        stats.last_tick_micros,
        stats.max_tick_micros,
        stats.rejected_commands,
        stats.mapping_faults
    );
    debug!("Final frame: {:?}", reader.latest());
    Ok(())
}
