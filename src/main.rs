//! # Sensor Logger
//!
//! Record sensor-board readings from a serial port into numbered CSV
//! session files, started and stopped from the keyboard.
//!
//! Keys: `s` starts a session, `e` ends it, `q` (or Ctrl+C) quits.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use sensor_logger::config::Config;
use sensor_logger::keyboard::{self, RawModeGuard};
use sensor_logger::logging;
use sensor_logger::serial::SensorSerial;
use sensor_logger::session::{recorder, SessionLogger};

/// Base name of the rolling diagnostic log file
const LOG_FILE_NAME: &str = "sensor-logger.log";

/// Printed once at startup, before the terminal switches to raw mode
const KEY_HELP: &str = "Press 's' to start logging, 'e' to stop logging, 'q' to quit.";

/// Main entry point for the session logger
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration, set up logging
///    - Open the sensor serial port (fatal if it cannot be opened)
///
/// 2. **Main Loop**
///    - Key listener thread applies `s`/`e`/`q` to the shared logger
///    - Serial loop reads lines and appends them while a session is open
///    - Ctrl+C routes through the same shutdown as `q`
///
/// 3. **Shutdown**
///    - Close any open session file
///    - Release the serial port and restore the terminal
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is invalid
/// - The serial port cannot be opened
/// - The serial device fails or disconnects while running
///
/// # Examples
///
/// ```bash
/// cargo run --release --bin sensor-logger
/// ```
///
/// Expected output:
/// ```text
/// INFO sensor_logger: Sensor Logger v0.1.0 starting...
/// INFO sensor_logger::serial: Successfully opened sensor board at /dev/ttyUSB0 (115200 baud)
/// Press 's' to start logging, 'e' to stop logging, 'q' to quit.
/// INFO sensor_logger::session: Logging started: sensorData/sensorData1.csv
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::resolve().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging, LOG_FILE_NAME);

    info!("Sensor Logger v{} starting...", env!("CARGO_PKG_VERSION"));
    match Config::source_path() {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let mut serial = SensorSerial::open(&config.serial)?;
    let logger = SessionLogger::from_config(&config.session);
    let poll_interval = Duration::from_millis(config.serial.poll_interval_ms);

    let interrupt_logger = logger.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                interrupt_logger.shutdown();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    println!("{}", KEY_HELP);
    let raw_mode = RawModeGuard::enable();
    let listener = keyboard::spawn_listener(logger.clone(), poll_interval)
        .context("Failed to start key listener")?;

    let result = recorder::run(serial.reader_mut(), &logger, poll_interval).await;

    logger.shutdown();
    if listener.join().is_err() {
        warn!("Key listener thread panicked");
    }
    drop(raw_mode);
    serial.close();

    match result {
        Ok(stats) => {
            info!(
                "Exiting ({} rows recorded, {} discarded, {} skipped)",
                stats.recorded, stats.discarded, stats.skipped
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_help_names_every_command() {
        for key in ["'s'", "'e'", "'q'"] {
            assert!(KEY_HELP.contains(key), "help text should mention {}", key);
        }
    }

    #[test]
    fn test_log_file_name() {
        assert!(LOG_FILE_NAME.starts_with("sensor-logger"));
    }
}
