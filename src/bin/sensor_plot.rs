//! # Sensor Plot
//!
//! Resample filtered sensor sessions and gamepad logs to 1-second buckets
//! and chart every sensor channel against gamepad events per second.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

use sensor_logger::analysis::plot;
use sensor_logger::analysis::resample::{self, EventBuckets, SensorBuckets};
use sensor_logger::config::Config;
use sensor_logger::logging;
use sensor_logger::session::record::SENSOR_FIELDS;

const LOG_FILE_NAME: &str = "sensor-plot.log";

fn main() -> Result<()> {
    let config = Config::resolve().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging, LOG_FILE_NAME);

    let input_dir = Path::new(&config.plot.input_dir);
    let sensor_files = resample::find_inputs(input_dir, &config.plot.sensor_suffix)
        .with_context(|| format!("Failed to list {}", input_dir.display()))?;
    let event_files = resample::find_inputs(input_dir, &config.plot.event_suffix)
        .with_context(|| format!("Failed to list {}", input_dir.display()))?;

    if sensor_files.is_empty() {
        bail!(
            "No '*{}' files in {}",
            config.plot.sensor_suffix,
            input_dir.display()
        );
    }
    info!(
        "Found {} sensor files and {} gamepad logs",
        sensor_files.len(),
        event_files.len()
    );

    let mut sensors = SensorBuckets::from_paths(&sensor_files, &SENSOR_FIELDS)?;
    sensors.add_motion_magnitudes()?;
    let events = EventBuckets::from_paths(&event_files)?;

    println!("Total sensor time: {:.3} s", sensors.total_time);
    println!("Total gamepad events time: {:.3} s", events.total_time);

    let written = plot::render_all(&sensors, &events, &resample::plot_channels(), &config.plot)?;
    for path in &written {
        println!("Saved: {}", path.display());
    }
    Ok(())
}
