//! # Window Filter
//!
//! Trims a sensor file to the time span covered by a reference file (a
//! gamepad event log): rows with `min(ref) <= t <= max(ref)` are kept in
//! their original order with every column untouched.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{csv_reader, timestamp_index};
use crate::config::FilterConfig;
use crate::error::{Result, SensorLoggerError};
use crate::timestamp::parse_timestamp;

/// Inclusive time span, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// Span of every parsable `Timestamp` in a reference CSV
    ///
    /// Unparsable reference timestamps are ignored.
    ///
    /// # Errors
    ///
    /// - `MissingColumn` if there is no `Timestamp` column
    /// - `EmptyInput` if no timestamp parses
    pub fn from_reader<R: Read>(input: R, source: &str) -> Result<Self> {
        let mut reader = csv_reader(input);
        let ts_index = timestamp_index(reader.headers()?, source)?;

        let mut window: Option<TimeWindow> = None;
        let mut unparsable = 0usize;

        for row in reader.records() {
            let row = row?;
            let t = match row.get(ts_index).map(parse_timestamp) {
                Some(Ok(t)) => t,
                _ => {
                    unparsable += 1;
                    continue;
                }
            };
            window = Some(match window {
                None => TimeWindow { start: t, end: t },
                Some(w) => TimeWindow { start: w.start.min(t), end: w.end.max(t) },
            });
        }

        if unparsable > 0 {
            warn!("{}: ignored {} rows with unreadable timestamps", source, unparsable);
        }

        window.ok_or_else(|| SensorLoggerError::EmptyInput(format!("{} has no timestamps", source)))
    }

    /// Span of a reference CSV file
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?, &path.display().to_string())
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Row counts from one filter run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterSummary {
    /// Rows inside the window, written out
    pub kept: u64,
    /// Rows outside the window
    pub outside: u64,
    /// Rows whose timestamp did not parse
    pub unparsable: u64,
}

/// Copy the header and every in-window row of `sensor` to `output`
pub fn filter_rows<R: Read, W: Write>(
    sensor: R,
    output: W,
    window: &TimeWindow,
    source: &str,
) -> Result<FilterSummary> {
    let mut reader = csv_reader(sensor);
    let headers = reader.headers()?.clone();
    let ts_index = timestamp_index(&headers, source)?;

    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(output);
    writer.write_record(&headers)?;

    let mut summary = FilterSummary::default();
    for row in reader.records() {
        let row = row?;
        match row.get(ts_index).map(parse_timestamp) {
            Some(Ok(t)) if window.contains(t) => {
                writer.write_record(&row)?;
                summary.kept += 1;
            }
            Some(Ok(_)) => summary.outside += 1,
            _ => summary.unparsable += 1,
        }
    }

    writer.flush()?;
    Ok(summary)
}

/// Filter `sensor_path` to the span of `reference_path`, writing `output_path`
///
/// Creates the output directory if needed.
pub fn filter_files(sensor_path: &Path, reference_path: &Path, output_path: &Path) -> Result<FilterSummary> {
    let window = TimeWindow::from_path(reference_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let sensor = File::open(sensor_path)?;
    let output = File::create(output_path)?;
    let summary = filter_rows(sensor, output, &window, &sensor_path.display().to_string())?;

    if summary.unparsable > 0 {
        warn!(
            "{}: dropped {} rows with unreadable timestamps",
            sensor_path.display(),
            summary.unparsable
        );
    }
    info!("Filtered sensor data saved to {}", output_path.display());
    Ok(summary)
}

/// Outcome for one index of a batch run
#[derive(Debug)]
pub enum BatchOutcome {
    Filtered { output: PathBuf, summary: FilterSummary },
    /// Sensor or reference file absent
    Missing,
    Failed(SensorLoggerError),
}

/// Run the filter for every index in the configured range
///
/// Missing inputs and per-index failures do not stop the batch.
pub fn run_batch(config: &FilterConfig) -> Vec<(u32, BatchOutcome)> {
    (config.first_index..=config.last_index)
        .map(|index| {
            let (sensor, reference, output) = config.paths_for(index);

            if !sensor.exists() || !reference.exists() {
                info!("Files for index {} are missing. Skipping.", index);
                return (index, BatchOutcome::Missing);
            }

            let outcome = match filter_files(&sensor, &reference, &output) {
                Ok(summary) => BatchOutcome::Filtered { output, summary },
                Err(e) => {
                    warn!("Index {} failed: {}", index, e);
                    BatchOutcome::Failed(e)
                }
            };
            (index, outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn window_of(csv: &str) -> TimeWindow {
        TimeWindow::from_reader(csv.as_bytes(), "ref").unwrap()
    }

    fn filter_str(sensor: &str, window: &TimeWindow) -> (String, FilterSummary) {
        let mut out = Vec::new();
        let summary = filter_rows(sensor.as_bytes(), &mut out, window, "sensor").unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn test_window_from_numeric_timestamps() {
        let window = window_of("Timestamp,JoystickID,EventType\n10,0,a\n20,0,b\n30,0,c\n");
        assert_eq!(window, TimeWindow { start: 10.0, end: 30.0 });
    }

    #[test]
    fn test_window_uses_min_and_max_not_first_and_last() {
        let window = window_of("Timestamp\n20\n5\n40\n30\n");
        assert_eq!(window, TimeWindow { start: 5.0, end: 40.0 });
    }

    #[test]
    fn test_filter_keeps_rows_inside_reference_span() {
        let window = window_of("Timestamp,JoystickID,EventType\n10,0,a\n20,0,b\n30,0,c\n");
        let sensor = "Timestamp,GSR\n5,a\n12,b\n25,c\n35,d\n";

        let (out, summary) = filter_str(sensor, &window);
        assert_eq!(out, "Timestamp,GSR\n12,b\n25,c\n");
        assert_eq!(summary, FilterSummary { kept: 2, outside: 2, unparsable: 0 });
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let window = TimeWindow { start: 10.0, end: 30.0 };
        let (out, summary) = filter_str("Timestamp,x\n10,a\n30,b\n30.001,c\n", &window);
        assert_eq!(out, "Timestamp,x\n10,a\n30,b\n");
        assert_eq!(summary.kept, 2);
    }

    #[test]
    fn test_filter_with_datetime_timestamps() {
        let window = window_of(
            "Timestamp,JoystickID,EventType\n\
             2025-02-01 12:00:01.000,0,a\n\
             2025-02-01 12:00:03.000,0,b\n",
        );
        let sensor = "Timestamp,Left Sensor\n\
                      2025-02-01 12:00:00.900,1\n\
                      2025-02-01 12:00:01.000,2\n\
                      2025-02-01 12:00:02.500,3\n\
                      2025-02-01 12:00:03.001,4\n";

        let (out, summary) = filter_str(sensor, &window);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with(",2"));
        assert!(lines[2].ends_with(",3"));
        assert_eq!(summary.outside, 2);
    }

    #[test]
    fn test_filter_preserves_all_columns_and_ragged_rows() {
        let window = TimeWindow { start: 0.0, end: 100.0 };
        let sensor = "Timestamp,a,b,c\n1,x,\"y,z\",w\n2,short\n";
        let (out, _) = filter_str(sensor, &window);
        assert_eq!(out, "Timestamp,a,b,c\n1,x,\"y,z\",w\n2,short\n");
    }

    #[test]
    fn test_filter_drops_unparsable_timestamps() {
        let window = TimeWindow { start: 0.0, end: 100.0 };
        let (out, summary) = filter_str("Timestamp,a\nnot-a-time,1\n50,2\n", &window);
        assert_eq!(out, "Timestamp,a\n50,2\n");
        assert_eq!(summary.unparsable, 1);
    }

    #[test]
    fn test_reference_without_timestamps_is_error() {
        let result = TimeWindow::from_reader("Timestamp,JoystickID\n".as_bytes(), "empty.csv");
        assert!(matches!(result, Err(SensorLoggerError::EmptyInput(_))));
    }

    #[test]
    fn test_reference_without_timestamp_column_is_error() {
        let result = TimeWindow::from_reader("Time,JoystickID\n1,0\n".as_bytes(), "bad.csv");
        assert!(matches!(result, Err(SensorLoggerError::MissingColumn { .. })));
    }

    #[test]
    fn test_filter_files_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let sensor = dir.path().join("1.sensorData.csv");
        let reference = dir.path().join("1.logData.csv");
        let output = dir.path().join("filtered").join("1filteredSensorData.csv");
        fs::write(&sensor, "Timestamp,GSR\n5,a\n12,b\n25,c\n35,d\n").unwrap();
        fs::write(&reference, "Timestamp,JoystickID,EventType\n10,0,a\n30,0,b\n").unwrap();

        let summary = filter_files(&sensor, &reference, &output).unwrap();
        assert_eq!(summary.kept, 2);
        assert_eq!(fs::read_to_string(&output).unwrap(), "Timestamp,GSR\n12,b\n25,c\n");
    }

    #[test]
    fn test_run_batch_skips_missing_indices() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let config = FilterConfig {
            sensor_pattern: format!("{}/s/{{index}}.sensorData.csv", root),
            reference_pattern: format!("{}/r/{{index}}.logData.csv", root),
            output_pattern: format!("{}/o/{{index}}filteredSensorData.csv", root),
            first_index: 1,
            last_index: 3,
        };
        fs::create_dir_all(dir.path().join("s")).unwrap();
        fs::create_dir_all(dir.path().join("r")).unwrap();
        fs::write(dir.path().join("s/2.sensorData.csv"), "Timestamp,GSR\n1,a\n2,b\n").unwrap();
        fs::write(dir.path().join("r/2.logData.csv"), "Timestamp\n2\n").unwrap();
        fs::write(dir.path().join("s/3.sensorData.csv"), "Timestamp,GSR\n1,a\n").unwrap();

        let results = run_batch(&config);
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], (1, BatchOutcome::Missing)));
        match &results[1] {
            (2, BatchOutcome::Filtered { output, summary }) => {
                assert_eq!(summary.kept, 1);
                assert!(output.exists());
            }
            other => panic!("Expected index 2 to be filtered, got: {:?}", other),
        }
        assert!(matches!(results[2], (3, BatchOutcome::Missing)));
    }
}
