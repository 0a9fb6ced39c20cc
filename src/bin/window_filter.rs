//! # Window Filter
//!
//! For each configured session index, keep only the sensor rows recorded
//! while the matching gamepad log was active.

use anyhow::{bail, Context, Result};
use tracing::info;

use sensor_logger::analysis::window::{self, BatchOutcome};
use sensor_logger::config::Config;
use sensor_logger::logging;

const LOG_FILE_NAME: &str = "window-filter.log";

fn main() -> Result<()> {
    let config = Config::resolve().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging, LOG_FILE_NAME);

    let filter = &config.filter;
    info!(
        "Filtering indices {}..={} ({} against {})",
        filter.first_index, filter.last_index, filter.sensor_pattern, filter.reference_pattern
    );

    let results = window::run_batch(filter);
    let mut failed = 0usize;

    for (index, outcome) in &results {
        match outcome {
            BatchOutcome::Filtered { output, summary } => println!(
                "{}: kept {} rows, dropped {} outside the window and {} unreadable -> {}",
                index,
                summary.kept,
                summary.outside,
                summary.unparsable,
                output.display()
            ),
            BatchOutcome::Missing => println!("{}: files missing, skipping", index),
            BatchOutcome::Failed(e) => {
                failed += 1;
                println!("{}: failed: {}", index, e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} indices failed", failed, results.len());
    }
    Ok(())
}
