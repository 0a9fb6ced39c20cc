//! # Capture Timestamps
//!
//! Wall-clock timestamps written into session and event files, and the
//! parser the batch tools use to read them back.
//!
//! Files carry local time as `YYYY-MM-DD HH:MM:SS.mmm`. The batch tools only
//! compare and subtract timestamps, so they are parsed into plain seconds.

use chrono::{DateTime, Local, NaiveDateTime};

use crate::error::{Result, SensorLoggerError};

/// Format used for every `Timestamp` cell the loggers write
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Formats accepted when reading timestamps back (fraction optional)
const PARSE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Format a capture time with millisecond precision
///
/// # Examples
///
/// ```
/// use chrono::{Local, TimeZone};
/// use sensor_logger::timestamp::format_timestamp;
///
/// let t = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
/// assert_eq!(format_timestamp(&t), "2025-03-14 09:26:53.000");
/// ```
pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local wall-clock time, formatted for a `Timestamp` cell
pub fn now_timestamp() -> String {
    format_timestamp(&Local::now())
}

/// Parse a `Timestamp` cell into seconds
///
/// Accepts the logger's own date-time format (with or without a fraction,
/// space or `T` separator) and bare numbers, which are taken as seconds.
/// Date-times are interpreted without a zone; only differences matter.
///
/// # Errors
///
/// Returns `Timestamp` if the cell is neither a number nor a date-time.
pub fn parse_timestamp(cell: &str) -> Result<f64> {
    parse_timestamp_kind(cell).map(|(seconds, _)| seconds)
}

/// Which notation a `Timestamp` cell used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKind {
    /// Bare number of seconds
    Seconds,
    /// `YYYY-MM-DD HH:MM:SS[.f]`
    DateTime,
}

/// Parse a `Timestamp` cell, also reporting its notation
///
/// Numbers and date-times live on different scales (a date-time is about
/// 1.7e9 seconds), so callers that subtract timestamps must not mix them.
pub fn parse_timestamp_kind(cell: &str) -> Result<(f64, TimestampKind)> {
    let cell = cell.trim();

    if let Ok(seconds) = cell.parse::<f64>() {
        if seconds.is_finite() {
            return Ok((seconds, TimestampKind::Seconds));
        }
    }

    for format in PARSE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(cell, format) {
            let seconds = parsed.and_utc().timestamp_micros() as f64 / 1_000_000.0;
            return Ok((seconds, TimestampKind::DateTime));
        }
    }

    Err(SensorLoggerError::Timestamp(cell.to_string()))
}
