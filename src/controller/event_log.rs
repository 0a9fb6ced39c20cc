//! # Gamepad Event Log
//!
//! CSV file of gamepad events with columns `Timestamp,JoystickID,EventType`.
//! These files are the reference the window filter trims sensor sessions to.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::session::file::{create_csv, next_available_path};

/// Header row of every event log
pub const EVENT_LOG_HEADER: [&str; 3] = ["Timestamp", "JoystickID", "EventType"];

/// An open event log; each row is flushed as it is written
pub struct EventLog {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: u64,
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl EventLog {
    /// Create the next free `<prefix><n>.csv` in `dir` and write the header
    pub fn create_next<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Self> {
        let path = next_available_path(dir, prefix);
        let mut writer = create_csv(&path)?;
        writer.write_record(EVENT_LOG_HEADER)?;
        writer.flush()?;
        info!("Logging gamepad events to {}", path.display());

        Ok(Self { writer, path, rows: 0 })
    }

    /// Append one event row and flush it
    pub fn append(&mut self, timestamp: &str, joystick_id: u32, description: &str) -> Result<()> {
        let id = joystick_id.to_string();
        self.writer.write_record([timestamp, id.as_str(), description])?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and close, returning the number of event rows
    pub fn close(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_create_next_numbers_files() {
        let dir = TempDir::new().unwrap();
        let first = EventLog::create_next(dir.path(), "log").unwrap();
        let second = EventLog::create_next(dir.path(), "log").unwrap();

        assert_eq!(first.path(), dir.path().join("log1.csv"));
        assert_eq!(second.path(), dir.path().join("log2.csv"));
    }

    #[test]
    fn test_rows_written_with_header() {
        let dir = TempDir::new().unwrap();
        let mut log = EventLog::create_next(dir.path(), "log").unwrap();
        log.append("2025-01-01 10:00:00.000", 0, "Joystick #0 added").unwrap();
        log.append("2025-01-01 10:00:00.120", 0, "Joystick #0 button 304 -> PRESSED").unwrap();
        let path = log.path().to_path_buf();
        assert_eq!(log.close().unwrap(), 2);

        let contents = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Timestamp,JoystickID,EventType");
        assert_eq!(lines[1], "2025-01-01 10:00:00.000,0,Joystick #0 added");
        assert_eq!(lines[2], "2025-01-01 10:00:00.120,0,Joystick #0 button 304 -> PRESSED");
    }

    #[test]
    fn test_event_log_is_a_valid_filter_reference() {
        let dir = TempDir::new().unwrap();
        let mut log = EventLog::create_next(dir.path(), "log").unwrap();
        log.append("2025-01-01 10:00:00.000", 1, "Joystick #1 axis 0 -> 5").unwrap();
        log.append("2025-01-01 10:00:02.500", 1, "Joystick #1 axis 0 -> 9").unwrap();
        let path = log.path().to_path_buf();
        log.close().unwrap();

        let window = crate::analysis::window::TimeWindow::from_path(&path).unwrap();
        assert!((window.duration() - 2.5).abs() < 1e-6);
    }
}
