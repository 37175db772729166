//! # Zilly Sim
//!
//! Headless runner for the Zilly physics core.
//!
//! Loads a scenario config (path as the first argument, `zilly.toml` by
//! default), simulates it tick by tick and writes a JSON trace of every
//! character's network state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use zilly_engine::config::{SimConfig, CONFIG_FILE};
use zilly_engine::scenario::Scenario;

/// Main entry point.
fn main() -> Result<()> {
    // Logs go to stderr so a trace on stdout stays clean.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive("zilly=info".parse()?))
        .init();

    info!("Zilly sim starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = if path.exists() {
        SimConfig::try_load_from(&path)
            .with_context(|| format!("loading {}", path.display()))?
    } else {
        info!("No config at {}, using the built-in scenario", path.display());
        SimConfig::default()
    };
    config.validate().context("checking scenario")?;

    let mut scenario = Scenario::build(&config).context("building scenario")?;
    let trace = scenario.run(config.ticks);

    match &config.trace_path {
        Some(out) => {
            let file =
                File::create(out).with_context(|| format!("creating {}", out.display()))?;
            let mut writer = BufWriter::new(file);
            trace.write_json(&mut writer)?;
            writer.flush()?;
            info!("Wrote {} ticks to {}", trace.ticks.len(), out.display());
        },
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            trace.write_json(&mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
        },
    }

    for (slot, core) in scenario.world().iter() {
        info!(
            "Slot {} finished at ({:.0}, {:.0})",
            slot, core.pos.x, core.pos.y
        );
    }

    info!("Zilly sim done");
    Ok(())
}
