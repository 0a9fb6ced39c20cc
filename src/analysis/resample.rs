//! # Resampling
//!
//! Aligns filtered sensor files and gamepad event logs to elapsed seconds
//! and reduces them to 1-second buckets.
//!
//! Each file is aligned to its own earliest timestamp, so several sessions
//! overlay each other from t = 0. Sensor buckets hold the mean of every
//! reading that falls in them; event buckets hold the number of events.
//! A sensor bucket with no readings has no value (a gap, not zero).

use csv::StringRecord;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{column_index, csv_reader, timestamp_index};
use crate::error::{Result, SensorLoggerError};
use crate::session::record::SENSOR_FIELDS;
use crate::timestamp::{parse_timestamp_kind, TimestampKind};

pub const ACCEL_MAGNITUDE: &str = "Accel_Magnitude";
pub const GYRO_MAGNITUDE: &str = "Gyro_Magnitude";

/// Column counted in event logs (an event row has a joystick id)
pub const EVENT_COLUMN: &str = "JoystickID";

/// Channel excluded from plotting
const TEMPERATURE_CHANNEL: &str = "Temperature (C)";

const ACCEL_AXES: [&str; 3] = ["Accel X", "Accel Y", "Accel Z"];
const GYRO_AXES: [&str; 3] = ["Gyro X", "Gyro Y", "Gyro Z"];

/// Channels charted against gamepad activity, in output order
pub fn plot_channels() -> Vec<&'static str> {
    SENSOR_FIELDS
        .iter()
        .copied()
        .filter(|&name| name != TEMPERATURE_CHANNEL)
        .chain([ACCEL_MAGNITUDE, GYRO_MAGNITUDE])
        .collect()
}

/// One CSV file with each row's timestamp replaced by seconds since the
/// file's earliest timestamp
#[derive(Debug, Clone)]
pub struct ElapsedTable {
    source: String,
    headers: StringRecord,
    ts_index: usize,
    rows: Vec<(f64, StringRecord)>,
}

impl ElapsedTable {
    /// Read a CSV with a `Timestamp` column
    ///
    /// Rows whose timestamp does not parse are dropped, as are rows whose
    /// timestamp notation (plain seconds or date-time) differs from the
    /// first readable row.
    pub fn from_reader<R: Read>(input: R, source: &str) -> Result<Self> {
        let mut reader = csv_reader(input);
        let headers = reader.headers()?.clone();
        let ts_index = timestamp_index(&headers, source)?;

        let mut stamped = Vec::new();
        let mut unparsable = 0usize;
        let mut mixed = 0usize;
        let mut file_kind: Option<TimestampKind> = None;
        for row in reader.records() {
            let row = row?;
            match row.get(ts_index).map(parse_timestamp_kind) {
                Some(Ok((t, kind))) => {
                    // The first readable row fixes the notation for the file
                    if *file_kind.get_or_insert(kind) == kind {
                        stamped.push((t, row));
                    } else {
                        mixed += 1;
                    }
                }
                _ => unparsable += 1,
            }
        }
        if unparsable > 0 {
            warn!("{}: dropped {} rows with unreadable timestamps", source, unparsable);
        }
        if mixed > 0 {
            warn!(
                "{}: dropped {} rows whose timestamps mix numbers and date-times",
                source, mixed
            );
        }

        let origin = stamped.iter().map(|(t, _)| *t).fold(f64::INFINITY, f64::min);
        let mut rows: Vec<(f64, StringRecord)> = stamped
            .into_iter()
            .map(|(t, row)| (t - origin, row))
            .collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(Self {
            source: source.to_string(),
            headers,
            ts_index,
            rows,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_reader(File::open(path)?, &path.display().to_string())
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Elapsed time of the last row (0 for an empty table)
    pub fn duration(&self) -> f64 {
        self.rows.last().map(|(t, _)| *t).unwrap_or(0.0)
    }

    /// Timestamp cell of the earliest row, as written in the file
    pub fn start_label(&self) -> Option<&str> {
        self.rows.first().and_then(|(_, row)| row.get(self.ts_index))
    }

    /// `(elapsed, value)` for every row with a numeric `column` cell, in
    /// time order
    ///
    /// # Errors
    ///
    /// `MissingColumn` when the file has no such column.
    pub fn series(&self, column: &str) -> Result<Vec<(f64, f64)>> {
        let index = column_index(&self.headers, column, &self.source)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|(t, row)| {
                let value = row.get(index)?.trim().parse::<f64>().ok()?;
                value.is_finite().then_some((*t, value))
            })
            .collect())
    }

    fn column(&self, name: &str) -> Option<usize> {
        column_index(&self.headers, name, &self.source).ok()
    }
}

/// Bucket holding elapsed time `t`
fn bucket_of(elapsed: f64) -> usize {
    elapsed.max(0.0).floor() as usize
}

/// Number of buckets needed to cover every row of `tables`
fn bucket_count(tables: &[ElapsedTable]) -> usize {
    tables
        .iter()
        .filter(|table| !table.is_empty())
        .map(|table| bucket_of(table.duration()) + 1)
        .max()
        .unwrap_or(0)
}

/// Longest elapsed time across `tables`
fn total_time(tables: &[ElapsedTable]) -> f64 {
    tables.iter().map(ElapsedTable::duration).fold(0.0, f64::max)
}

/// Per-second means of named sensor channels
#[derive(Debug, Clone, PartialEq)]
pub struct SensorBuckets {
    channels: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
    /// Longest elapsed time across the input files
    pub total_time: f64,
}

impl SensorBuckets {
    /// Mean of every reading per channel per second, over all `tables`
    ///
    /// Cells that are not numbers, and channels a file lacks, contribute
    /// nothing. A bucket with no contributing reading is `None`.
    pub fn from_tables(tables: &[ElapsedTable], channels: &[&str]) -> Self {
        let len = bucket_count(tables);
        let mut sums = vec![vec![(0.0f64, 0u32); len]; channels.len()];

        for table in tables {
            let indices: Vec<Option<usize>> = channels.iter().map(|c| table.column(c)).collect();
            for (channel, index) in channels.iter().zip(&indices) {
                if index.is_none() {
                    debug!("{} has no '{}' column", table.source(), channel);
                }
            }

            for (elapsed, row) in &table.rows {
                let bucket = bucket_of(*elapsed);
                for (channel, index) in indices.iter().enumerate() {
                    let value = index
                        .and_then(|i| row.get(i))
                        .and_then(|cell| cell.trim().parse::<f64>().ok())
                        .filter(|v| v.is_finite());
                    if let Some(v) = value {
                        let slot = &mut sums[channel][bucket];
                        slot.0 += v;
                        slot.1 += 1;
                    }
                }
            }
        }

        let values = sums
            .into_iter()
            .map(|buckets| {
                buckets
                    .into_iter()
                    .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
                    .collect()
            })
            .collect();

        Self {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            values,
            total_time: total_time(tables),
        }
    }

    /// Load and bucket every file in `paths`
    pub fn from_paths(paths: &[PathBuf], channels: &[&str]) -> Result<Self> {
        let tables = load_tables(paths)?;
        Ok(Self::from_tables(&tables, channels))
    }

    pub fn len(&self) -> usize {
        self.values.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, name: &str) -> Option<&[Option<f64>]> {
        self.channels
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Add a channel that is the Euclidean norm of three existing channels
    ///
    /// A bucket is `None` unless all three components have a value.
    pub fn add_magnitude(&mut self, name: &str, axes: [&str; 3]) -> Result<()> {
        let mut components = Vec::with_capacity(3);
        for axis in axes {
            let values = self.channel(axis).ok_or_else(|| SensorLoggerError::MissingColumn {
                column: axis.to_string(),
                file: "resampled sensor data".to_string(),
            })?;
            components.push(values);
        }

        let magnitude: Vec<Option<f64>> = (0..self.len())
            .map(|i| match (components[0][i], components[1][i], components[2][i]) {
                (Some(x), Some(y), Some(z)) => Some((x * x + y * y + z * z).sqrt()),
                _ => None,
            })
            .collect();

        self.channels.push(name.to_string());
        self.values.push(magnitude);
        Ok(())
    }

    /// Add `Accel_Magnitude` and `Gyro_Magnitude`
    pub fn add_motion_magnitudes(&mut self) -> Result<()> {
        self.add_magnitude(ACCEL_MAGNITUDE, ACCEL_AXES)?;
        self.add_magnitude(GYRO_MAGNITUDE, GYRO_AXES)
    }
}

/// Per-second gamepad event counts
#[derive(Debug, Clone, PartialEq)]
pub struct EventBuckets {
    counts: Vec<u64>,
    /// Longest elapsed time across the input logs
    pub total_time: f64,
}

impl EventBuckets {
    /// Count rows with a non-empty `JoystickID` per second, over all `tables`
    ///
    /// # Errors
    ///
    /// Returns `MissingColumn` if a log has no `JoystickID` column.
    pub fn from_tables(tables: &[ElapsedTable]) -> Result<Self> {
        let mut counts = vec![0u64; bucket_count(tables)];

        for table in tables {
            let index = column_index(&table.headers, EVENT_COLUMN, &table.source)?;
            for (elapsed, row) in &table.rows {
                if row.get(index).map(|cell| !cell.trim().is_empty()).unwrap_or(false) {
                    counts[bucket_of(*elapsed)] += 1;
                }
            }
        }

        Ok(Self {
            counts,
            total_time: total_time(tables),
        })
    }

    pub fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let tables = load_tables(paths)?;
        Self::from_tables(&tables)
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Event counts over `len` sensor buckets; seconds past the last event
    /// bucket are gaps
    pub fn aligned(&self, len: usize) -> Vec<Option<f64>> {
        (0..len)
            .map(|i| self.counts.get(i).map(|&n| n as f64))
            .collect()
    }
}

fn load_tables(paths: &[PathBuf]) -> Result<Vec<ElapsedTable>> {
    paths.iter().map(|p| ElapsedTable::from_path(p)).collect()
}

/// Files in `dir` whose names end with `suffix`, sorted by name
pub fn find_inputs(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(suffix))
            .unwrap_or(false);
        if matches && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table(csv: &str) -> ElapsedTable {
        ElapsedTable::from_reader(csv.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn test_plot_channels_skip_temperature() {
        let channels = plot_channels();
        assert_eq!(channels.len(), 11);
        assert_eq!(channels[0], "Left Sensor");
        assert!(!channels.contains(&"Temperature (C)"));
        assert_eq!(&channels[9..], &[ACCEL_MAGNITUDE, GYRO_MAGNITUDE]);
    }

    #[test]
    fn test_elapsed_is_relative_to_earliest_timestamp() {
        let t = table("Timestamp,GSR\n12.5,1\n10,2\n11,3\n");
        let elapsed: Vec<f64> = t.rows.iter().map(|(e, _)| *e).collect();
        assert_eq!(elapsed, vec![0.0, 1.0, 2.5]);
        assert_eq!(t.duration(), 2.5);
    }

    #[test]
    fn test_mixed_timestamp_notations_are_not_combined() {
        let t = table("Timestamp,GSR\n0,1\n1,2\n2025-01-01 10:00:00,3\n");
        assert_eq!(t.len(), 2);
        assert_eq!(t.duration(), 1.0);

        let buckets = SensorBuckets::from_tables(&[t], &["GSR"]);
        assert_eq!(buckets.len(), 2);
    }

    #[test]
    fn test_date_time_file_drops_numeric_rows() {
        let t = table(
            "Timestamp,GSR\n\
             2025-01-01 10:00:00.000,1\n\
             99999999,2\n\
             2025-01-01 10:00:01.500,3\n",
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.duration(), 1.5);
        assert_eq!(t.start_label(), Some("2025-01-01 10:00:00.000"));
    }

    #[test]
    fn test_series_keeps_numeric_rows_in_time_order() {
        let t = table("Timestamp,GSR\n11,5\n10,4\n12,\n13,n/a\n14,7\n");
        assert_eq!(t.series("GSR").unwrap(), vec![(0.0, 4.0), (1.0, 5.0), (4.0, 7.0)]);
        assert_eq!(t.start_label(), Some("10"));
    }

    #[test]
    fn test_series_of_missing_column_is_error() {
        let t = table("Timestamp,GSR\n0,1\n");
        assert!(matches!(
            t.series("Heart Rate"),
            Err(SensorLoggerError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_sensor_buckets_take_mean() {
        let t = table("Timestamp,GSR\n100.0,2\n100.4,4\n101.2,10\n");
        let buckets = SensorBuckets::from_tables(&[t], &["GSR"]);
        assert_eq!(buckets.channel("GSR").unwrap(), &[Some(3.0), Some(10.0)]);
    }

    #[test]
    fn test_empty_sensor_bucket_is_gap() {
        let t = table("Timestamp,GSR\n0,1\n2.5,5\n");
        let buckets = SensorBuckets::from_tables(&[t], &["GSR"]);
        assert_eq!(buckets.channel("GSR").unwrap(), &[Some(1.0), None, Some(5.0)]);
    }

    #[test]
    fn test_files_overlay_from_zero() {
        let a = table("Timestamp,GSR\n100,2\n101,2\n");
        let b = table("Timestamp,GSR\n500,4\n");
        let buckets = SensorBuckets::from_tables(&[a, b], &["GSR"]);
        assert_eq!(buckets.channel("GSR").unwrap(), &[Some(3.0), Some(2.0)]);
        assert_eq!(buckets.total_time, 1.0);
    }

    #[test]
    fn test_non_numeric_cells_are_ignored() {
        let t = table("Timestamp,GSR\n0,abc\n0.5,6\n1.5,\n");
        let buckets = SensorBuckets::from_tables(&[t], &["GSR"]);
        assert_eq!(buckets.channel("GSR").unwrap(), &[Some(6.0), None]);
    }

    #[test]
    fn test_magnitude_from_bucket_means() {
        let t = table(
            "Timestamp,Accel X,Accel Y,Accel Z,Gyro X,Gyro Y,Gyro Z\n\
             0,3,0,0,1,2,2\n\
             0.5,3,4,0,1,2,2\n\
             1.2,,1,1,0,0,0\n",
        );
        let mut buckets = SensorBuckets::from_tables(
            &[t],
            &["Accel X", "Accel Y", "Accel Z", "Gyro X", "Gyro Y", "Gyro Z"],
        );
        buckets.add_motion_magnitudes().unwrap();

        // bucket 0 means: (3, 2, 0) -> sqrt(13)
        let accel = buckets.channel(ACCEL_MAGNITUDE).unwrap();
        assert!((accel[0].unwrap() - 13f64.sqrt()).abs() < 1e-9);
        assert_eq!(accel[1], None);

        let gyro = buckets.channel(GYRO_MAGNITUDE).unwrap();
        assert_eq!(gyro, &[Some(3.0), Some(0.0)]);
    }

    #[test]
    fn test_magnitude_requires_axis_channels() {
        let t = table("Timestamp,GSR\n0,1\n");
        let mut buckets = SensorBuckets::from_tables(&[t], &["GSR"]);
        assert!(matches!(
            buckets.add_motion_magnitudes(),
            Err(SensorLoggerError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_event_counts_per_second() {
        let log = table(
            "Timestamp,JoystickID,EventType\n\
             2025-01-01 10:00:00.000,0,a\n\
             2025-01-01 10:00:00.500,0,b\n\
             2025-01-01 10:00:02.000,0,c\n",
        );
        let events = EventBuckets::from_tables(&[log]).unwrap();
        assert_eq!(events.counts(), &[2, 0, 1]);
        assert!((events.total_time - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_event_counts_skip_rows_without_joystick_id() {
        let log = table("Timestamp,JoystickID,EventType\n0,0,a\n0.5,,b\n");
        let events = EventBuckets::from_tables(&[log]).unwrap();
        assert_eq!(events.counts(), &[1]);
    }

    #[test]
    fn test_event_log_without_joystick_column_is_error() {
        let log = table("Timestamp,EventType\n0,a\n");
        assert!(matches!(
            EventBuckets::from_tables(&[log]),
            Err(SensorLoggerError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_events_aligned_to_sensor_length() {
        let log = table("Timestamp,JoystickID\n0,1\n1.5,1\n1.7,1\n");
        let events = EventBuckets::from_tables(&[log]).unwrap();
        assert_eq!(events.aligned(4), vec![Some(1.0), Some(2.0), None, None]);
        assert_eq!(events.aligned(1), vec![Some(1.0)]);
    }

    #[test]
    fn test_no_tables_gives_no_buckets() {
        let buckets = SensorBuckets::from_tables(&[], &["GSR"]);
        assert!(buckets.is_empty());
        assert_eq!(buckets.total_time, 0.0);
    }

    #[test]
    fn test_find_inputs_matches_suffix() {
        let dir = TempDir::new().unwrap();
        for name in ["2filteredSensorData.csv", "1filteredSensorData.csv", "1.logData.csv", "notes.txt"] {
            fs::write(dir.path().join(name), "Timestamp\n").unwrap();
        }

        let sensors = find_inputs(dir.path(), "filteredSensorData.csv").unwrap();
        assert_eq!(
            sensors,
            vec![
                dir.path().join("1filteredSensorData.csv"),
                dir.path().join("2filteredSensorData.csv"),
            ]
        );
        let logs = find_inputs(dir.path(), ".logData.csv").unwrap();
        assert_eq!(logs, vec![dir.path().join("1.logData.csv")]);
    }
}
