//! # Session Files
//!
//! CSV files that hold one recording each, plus the numbered-filename
//! allocation shared with the gamepad event log.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::record::{session_header, Record};
use crate::error::Result;

/// Extension of every file the loggers create
pub const CSV_EXTENSION: &str = "csv";

/// Find the lowest unused `<prefix><n>.csv` in `dir`, counting from 1
///
/// This is a plain existence scan. Two processes writing to the same
/// directory at once can pick the same name; [`create_csv`] refuses to
/// overwrite in that case.
///
/// # Examples
///
/// ```no_run
/// use sensor_logger::session::file::next_available_path;
///
/// // With sensorData1.csv and sensorData2.csv present:
/// let path = next_available_path("sensorData", "sensorData");
/// assert!(path.ends_with("sensorData3.csv"));
/// ```
pub fn next_available_path<P: AsRef<Path>>(dir: P, prefix: &str) -> PathBuf {
    let dir = dir.as_ref();
    (1u64..)
        .map(|index| dir.join(format!("{}{}.{}", prefix, index, CSV_EXTENSION)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(format!("{}.{}", prefix, CSV_EXTENSION)))
}

/// Create a new CSV writer at `path`, creating parent directories
///
/// Never truncates an existing file. Rows may have a different number of
/// cells than the header.
pub fn create_csv(path: &Path) -> Result<csv::Writer<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(csv::WriterBuilder::new().flexible(true).from_writer(file))
}

/// An open session file
///
/// Every appended row is flushed to the OS immediately so that an abrupt
/// termination loses at most the row being written.
pub struct SessionFile {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: u64,
}

impl std::fmt::Debug for SessionFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFile")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl SessionFile {
    /// Create the file and write the header row
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory or file cannot be created (including when
    /// the file already exists), `Csv` if the header cannot be written.
    pub fn create(path: PathBuf) -> Result<Self> {
        let mut writer = create_csv(&path)?;
        writer.write_record(session_header())?;
        writer.flush()?;
        debug!("Created session file {}", path.display());

        Ok(Self { writer, path, rows: 0 })
    }

    /// Append one record and flush it
    pub fn append(&mut self, record: &Record) -> Result<()> {
        self.writer.write_record(record.cells())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close the file, returning how many rows it holds
    pub fn close(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.rows)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::record::Sample;
    use tempfile::TempDir;

    #[test]
    fn test_next_path_in_empty_dir() {
        let dir = TempDir::new().unwrap();
        let path = next_available_path(dir.path(), "sensorData");
        assert_eq!(path, dir.path().join("sensorData1.csv"));
    }

    #[test]
    fn test_next_path_skips_existing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sensorData1.csv"), "").unwrap();
        fs::write(dir.path().join("sensorData2.csv"), "").unwrap();

        let path = next_available_path(dir.path(), "sensorData");
        assert_eq!(path, dir.path().join("sensorData3.csv"));
    }

    #[test]
    fn test_next_path_fills_lowest_gap() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("log1.csv"), "").unwrap();
        fs::write(dir.path().join("log3.csv"), "").unwrap();

        let path = next_available_path(dir.path(), "log");
        assert_eq!(path, dir.path().join("log2.csv"));
    }

    #[test]
    fn test_next_path_in_missing_dir() {
        let dir = TempDir::new().unwrap();
        let path = next_available_path(dir.path().join("not-yet"), "sensorData");
        assert!(path.ends_with("not-yet/sensorData1.csv"));
    }

    #[test]
    fn test_create_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sensorData1.csv");
        let file = SessionFile::create(path.clone()).unwrap();
        assert_eq!(file.rows(), 0);
        drop(file);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Timestamp,Left Sensor,Right Sensor,GSR,Accel X,Accel Y,Accel Z,Gyro X,Gyro Y,Gyro Z,Temperature (C)\n"
        );
    }

    #[test]
    fn test_create_refuses_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensorData1.csv");
        fs::write(&path, "keep me").unwrap();

        assert!(SessionFile::create(path.clone()).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[test]
    fn test_append_is_visible_before_close() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensorData1.csv");
        let mut file = SessionFile::create(path.clone()).unwrap();

        let sample = Sample::parse(b"1,2,3,4,5,6,7,8,9,10").unwrap();
        file.append(&Record::new("2025-01-01 00:00:00.000".to_string(), sample)).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("2025-01-01 00:00:00.000,1,2,3,4,5,6,7,8,9,10\n"));
        assert_eq!(file.close().unwrap(), 1);
    }

    #[test]
    fn test_append_short_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sensorData1.csv");
        let mut file = SessionFile::create(path.clone()).unwrap();

        let sample = Sample::parse(b"1,2").unwrap();
        file.append(&Record::new("t".to_string(), sample)).unwrap();
        assert_eq!(file.close().unwrap(), 1);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("t,1,2\n"));
    }
}
