//! # Raw Plot
//!
//! Chart one column of a single filtered session file against its own
//! timestamps, at full rate. Useful for eyeballing a channel before
//! resampling it with `sensor-plot`.

use anyhow::{Context, Result};
use tracing::info;

use sensor_logger::analysis::plot;
use sensor_logger::config::Config;
use sensor_logger::logging;

const LOG_FILE_NAME: &str = "raw-plot.log";

fn main() -> Result<()> {
    let config = Config::resolve().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging, LOG_FILE_NAME);

    info!(
        "Plotting '{}' from {}",
        config.plot.raw_channel, config.plot.raw_file
    );
    let path = plot::render_raw(&config.plot)
        .with_context(|| format!("Failed to plot {}", config.plot.raw_file))?;

    println!("Saved: {}", path.display());
    Ok(())
}
