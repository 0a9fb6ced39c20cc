//! # Gamepad Logger
//!
//! Log every button press and (rate-limited) axis movement of the connected
//! gamepads to a numbered CSV file until Ctrl+C. Gamepads may be plugged in
//! or unplugged at any time. The files serve as the reference span for
//! `window-filter` and the event series for `sensor-plot`.

use anyhow::{Context, Result};
use tracing::info;

use sensor_logger::config::Config;
use sensor_logger::{controller, logging};

const LOG_FILE_NAME: &str = "gamepad-logger.log";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::resolve().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging, LOG_FILE_NAME);

    info!("Gamepad Logger v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Press Ctrl+C to exit");

    let events = controller::run(&config.gamepad).await?;
    info!("Logged {} gamepad events", events);
    Ok(())
}
