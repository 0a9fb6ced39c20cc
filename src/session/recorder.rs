//! # Serial Recorder Loop
//!
//! The foreground half of the session logger: poll the serial line reader,
//! decode each line into a sample and hand it to the shared
//! [`SessionLogger`].

use chrono::Local;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::record::{Sample, SENSOR_FIELD_COUNT};
use super::{RecordOutcome, SessionLogger};
use crate::error::{Result, SensorLoggerError};
use crate::serial::line_reader::{LineEvent, LineReader};
use crate::serial::port_trait::SerialPortIO;

/// Result of one [`poll_and_record`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Line appended to the open session file
    Recorded,
    /// Line read while idle and dropped
    Discarded,
    /// Line could not be decoded and was skipped
    Skipped,
    /// Append failed; the session was closed
    WriteFailed,
    /// No complete line waiting
    Idle,
    /// Serial device reported end of stream
    Closed,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub recorded: u64,
    pub discarded: u64,
    pub skipped: u64,
}

impl LoopStats {
    fn count(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Recorded => self.recorded += 1,
            PollOutcome::Discarded => self.discarded += 1,
            PollOutcome::Skipped | PollOutcome::WriteFailed => self.skipped += 1,
            PollOutcome::Idle | PollOutcome::Closed => {}
        }
    }
}

/// Check the serial reader once and persist a complete line if recording
///
/// The capture timestamp is taken as soon as the line is available. Lines
/// that are not UTF-8 or are blank are logged and skipped. Lines with an
/// unexpected number of fields are kept as sent.
///
/// # Errors
///
/// Propagates serial read errors.
pub async fn poll_and_record<P: SerialPortIO>(
    reader: &mut LineReader<P>,
    logger: &SessionLogger,
) -> std::io::Result<PollOutcome> {
    let line = match reader.poll_line().await? {
        LineEvent::Line(line) => line,
        LineEvent::Idle => return Ok(PollOutcome::Idle),
        LineEvent::Closed => return Ok(PollOutcome::Closed),
    };
    let captured_at = Local::now();

    let sample = match Sample::parse(&line) {
        Ok(sample) => sample,
        Err(e) => {
            warn!("Skipping serial line ({}): {:?}", e, String::from_utf8_lossy(&line));
            return Ok(PollOutcome::Skipped);
        }
    };

    if !sample.is_complete() {
        debug!(
            "Serial line has {} fields, expected {}",
            sample.fields().len(),
            SENSOR_FIELD_COUNT
        );
    }

    Ok(match logger.record(sample, captured_at) {
        RecordOutcome::Written => PollOutcome::Recorded,
        RecordOutcome::Discarded => PollOutcome::Discarded,
        RecordOutcome::Failed => PollOutcome::WriteFailed,
    })
}

/// Run the serial loop until the logger is shut down
///
/// Sleeps `idle_delay` whenever no complete line is waiting. A serial
/// failure or end of stream shuts the logger down (closing any open
/// session) and is reported as an error.
pub async fn run<P: SerialPortIO>(
    reader: &mut LineReader<P>,
    logger: &SessionLogger,
    idle_delay: Duration,
) -> Result<LoopStats> {
    let mut stats = LoopStats::default();

    while logger.is_running() {
        let outcome = match poll_and_record(reader, logger).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Serial read failed: {}", e);
                logger.shutdown();
                return Err(SensorLoggerError::Serial(format!("Read failed: {}", e)));
            }
        };

        stats.count(outcome);
        match outcome {
            PollOutcome::Idle => tokio::time::sleep(idle_delay).await,
            PollOutcome::Closed => {
                logger.shutdown();
                return Err(SensorLoggerError::Serial("Serial device closed".to_string()));
            }
            _ => {}
        }
    }

    info!(
        "Serial loop finished: {} recorded, {} discarded, {} skipped",
        stats.recorded, stats.discarded, stats.skipped
    );
    Ok(stats)
}
