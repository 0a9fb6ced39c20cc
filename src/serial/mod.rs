//! # Serial Communication Module
//!
//! Handles the serial link to the sensor board.
//!
//! This module handles:
//! - Opening the configured serial device (8N1, no flow control)
//! - Non-blocking, line-oriented reads
//! - Closing the device on shutdown

pub mod line_reader;
pub mod port_trait;

use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{Result, SensorLoggerError};
use line_reader::LineReader;
use port_trait::TokioSerialPort;

/// Sensor board serial handle
///
/// Owns the open device; dropping it (or calling [`SensorSerial::close`])
/// releases the port.
pub struct SensorSerial {
    reader: LineReader<TokioSerialPort>,
    device_path: String,
}

impl std::fmt::Debug for SensorSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SensorSerial {
    /// Open the device named in the `[serial]` configuration section
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if the device cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sensor_logger::config::SerialConfig;
    /// use sensor_logger::serial::SensorSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = SensorSerial::open(&SerialConfig::default())?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        Self::open_with_paths(&[config.port.as_str()], config.baud_rate, timeout)
    }

    /// Open the first device in `paths` that accepts the connection
    ///
    /// Must be called from within a tokio runtime.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate, timeout) {
                Ok(port) => {
                    info!("Successfully opened sensor board at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        reader: LineReader::new(TokioSerialPort::new(port)),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(SensorLoggerError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(timeout)
            .open_native_async()
            .map_err(|e| SensorLoggerError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Line reader over the open port
    pub fn reader_mut(&mut self) -> &mut LineReader<TokioSerialPort> {
        &mut self.reader
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Release the device
    pub fn close(self) {
        info!("Closing serial port {}", self.device_path);
        drop(self.reader.into_inner());
    }
}
