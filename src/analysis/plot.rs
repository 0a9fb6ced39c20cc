//! # Sensor vs Gamepad Charts
//!
//! One PNG per sensor channel: the channel's per-second mean on the left
//! axis and gamepad events per second on the right axis, sharing a time axis
//! in seconds. Gaps in either series break the line instead of dropping to
//! zero.
//!
//! [`RawChart`] draws a single column of one session file at full rate,
//! without resampling.

use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::resample::{ElapsedTable, EventBuckets, SensorBuckets};
use crate::config::PlotConfig;
use crate::error::{Result, SensorLoggerError};

const SENSOR_COLOR: RGBColor = BLUE;
const EVENT_COLOR: RGBColor = RGBColor(0, 128, 0);

const FONT_SIZE_TITLE: u32 = 24;
const FONT_SIZE_LABEL: u32 = 16;

/// Label of the right-hand axis
pub const EVENT_AXIS_LABEL: &str = "Gamepad Event Count";

/// File name of a channel's chart (`1-` + channel with `_` for spaces)
pub fn output_filename(prefix: &str, channel: &str) -> String {
    format!("{}{}_vs_Gamepad.png", prefix, channel.replace(' ', "_"))
}

/// File name of a raw single-column chart
pub fn raw_output_filename(prefix: &str, channel: &str) -> String {
    format!("{}{}_raw.png", prefix, channel.replace(' ', "_"))
}

/// Axis range of the finite values in `values`, padded by 15%
///
/// Falls back to `0..1` when there is nothing to show.
pub fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if min > max {
        return (0.0, 1.0);
    }
    let range = max - min;
    let padding = if range < 1e-6 { 0.5 } else { range * 0.15 };
    (min - padding, max + padding)
}

/// Split a bucketed series into runs of consecutive values
///
/// Bucket `i` is drawn at `x = i` seconds.
pub fn segments(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) if v.is_finite() => current.push((i as f64, *v)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Data for one chart
#[derive(Debug, Clone)]
pub struct ChannelChart<'a> {
    pub channel: &'a str,
    pub values: &'a [Option<f64>],
    pub events: &'a [Option<f64>],
}

impl ChannelChart<'_> {
    fn x_range(&self) -> (f64, f64) {
        let len = self.values.len().max(self.events.len());
        (0.0, len.saturating_sub(1).max(1) as f64)
    }

    /// Render to `path` as a `width` x `height` PNG
    pub fn render(&self, path: &Path, width: u32, height: u32) -> Result<()> {
        self.draw(path, width, height)
            .map_err(|e| SensorLoggerError::Plot(format!("{}: {}", path.display(), e)))
    }

    fn draw(&self, path: &Path, width: u32, height: u32) -> std::result::Result<(), Box<dyn Error>> {
        let (x_min, x_max) = self.x_range();
        let (y_min, y_max) = padded_range(self.values.iter().flatten().copied());
        let (_, e_max) = padded_range(self.events.iter().flatten().copied());

        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} vs. Gamepad Events Over Time", self.channel),
                ("sans-serif", FONT_SIZE_TITLE),
            )
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .right_y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?
            .set_secondary_coord(x_min..x_max, 0.0..e_max.max(1.0));

        chart
            .configure_mesh()
            .x_desc("Time(s)")
            .y_desc(self.channel)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .label_style(("sans-serif", FONT_SIZE_LABEL))
            .axis_desc_style(("sans-serif", FONT_SIZE_LABEL).into_font().color(&SENSOR_COLOR))
            .draw()?;

        chart
            .configure_secondary_axes()
            .y_desc(EVENT_AXIS_LABEL)
            .label_style(("sans-serif", FONT_SIZE_LABEL))
            .axis_desc_style(("sans-serif", FONT_SIZE_LABEL).into_font().color(&EVENT_COLOR))
            .draw()?;

        for (i, run) in segments(self.values).into_iter().enumerate() {
            let series = chart.draw_series(LineSeries::new(run, SENSOR_COLOR.stroke_width(2)))?;
            if i == 0 {
                series
                    .label(self.channel)
                    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SENSOR_COLOR.stroke_width(2)));
            }
        }

        let event_style = EVENT_COLOR.mix(0.5).stroke_width(2);
        for (i, run) in segments(self.events).into_iter().enumerate() {
            let series = chart.draw_secondary_series(LineSeries::new(run, event_style))?;
            if i == 0 {
                series
                    .label("Gamepad Events")
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], event_style));
            }
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", FONT_SIZE_LABEL))
            .draw()?;

        root.present()?;
        Ok(())
    }
}

/// One column of one file against its own elapsed time
#[derive(Debug, Clone)]
pub struct RawChart {
    channel: String,
    start: String,
    points: Vec<(f64, f64)>,
}

impl RawChart {
    /// Collect the numeric `channel` readings of `table`
    ///
    /// # Errors
    ///
    /// - `MissingColumn`: the file has no such column
    /// - `EmptyInput`: no row has a numeric reading
    pub fn from_table(table: &ElapsedTable, channel: &str) -> Result<Self> {
        let points = table.series(channel)?;
        if points.is_empty() {
            return Err(SensorLoggerError::EmptyInput(format!(
                "{} has no numeric '{}' readings",
                table.source(),
                channel
            )));
        }

        Ok(Self {
            channel: channel.to_string(),
            start: table.start_label().unwrap_or_default().to_string(),
            points,
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    fn x_range(&self) -> (f64, f64) {
        let end = self.points.last().map(|(t, _)| *t).unwrap_or(0.0);
        (0.0, end.max(1.0))
    }

    fn x_desc(&self) -> String {
        if self.start.is_empty() {
            "Time(s)".to_string()
        } else {
            format!("Time(s) from {}", self.start)
        }
    }

    /// Render to `path` as a `width` x `height` PNG
    pub fn render(&self, path: &Path, width: u32, height: u32) -> Result<()> {
        self.draw(path, width, height)
            .map_err(|e| SensorLoggerError::Plot(format!("{}: {}", path.display(), e)))
    }

    fn draw(&self, path: &Path, width: u32, height: u32) -> std::result::Result<(), Box<dyn Error>> {
        let (x_min, x_max) = self.x_range();
        let (y_min, y_max) = padded_range(self.points.iter().map(|(_, v)| *v));

        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} Readings Over Time", self.channel),
                ("sans-serif", FONT_SIZE_TITLE),
            )
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc(self.x_desc())
            .y_desc(self.channel.as_str())
            .label_style(("sans-serif", FONT_SIZE_LABEL))
            .axis_desc_style(("sans-serif", FONT_SIZE_LABEL))
            .draw()?;

        chart
            .draw_series(LineSeries::new(self.points.iter().copied(), SENSOR_COLOR.stroke_width(2)))?
            .label(self.channel.as_str())
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SENSOR_COLOR.stroke_width(2)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", FONT_SIZE_LABEL))
            .draw()?;

        root.present()?;
        Ok(())
    }
}

/// Chart `config.raw_channel` of `config.raw_file` into the output dir
///
/// Returns the written path.
pub fn render_raw(config: &PlotConfig) -> Result<PathBuf> {
    let table = ElapsedTable::from_path(Path::new(&config.raw_file))?;
    let chart = RawChart::from_table(&table, &config.raw_channel)?;

    let output_dir = Path::new(&config.output_dir);
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(raw_output_filename(&config.file_prefix, &config.raw_channel));
    chart.render(&path, config.width, config.height)?;

    debug!("Saved: {} ({} readings)", path.display(), chart.points().len());
    Ok(path)
}

/// Write one chart per channel in `channels` to the configured output dir
///
/// Returns the written paths in channel order.
pub fn render_all(
    sensors: &SensorBuckets,
    events: &EventBuckets,
    channels: &[&str],
    config: &PlotConfig,
) -> Result<Vec<PathBuf>> {
    let output_dir = Path::new(&config.output_dir);
    fs::create_dir_all(output_dir)?;

    let aligned = events.aligned(sensors.len());
    let mut written = Vec::with_capacity(channels.len());

    for &channel in channels {
        let values = sensors.channel(channel).ok_or_else(|| SensorLoggerError::MissingColumn {
            column: channel.to_string(),
            file: "resampled sensor data".to_string(),
        })?;

        let path = output_dir.join(output_filename(&config.file_prefix, channel));
        ChannelChart {
            channel,
            values,
            events: &aligned,
        }
        .render(&path, config.width, config.height)?;

        debug!("Saved: {}", path.display());
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_filename_replaces_spaces() {
        assert_eq!(output_filename("1-", "Left Sensor"), "1-Left_Sensor_vs_Gamepad.png");
        assert_eq!(output_filename("1-", "Accel_Magnitude"), "1-Accel_Magnitude_vs_Gamepad.png");
        assert_eq!(output_filename("1-", "GSR"), "1-GSR_vs_Gamepad.png");
    }

    #[test]
    fn test_raw_output_filename() {
        assert_eq!(raw_output_filename("1-", "GSR"), "1-GSR_raw.png");
        assert_eq!(raw_output_filename("", "Heart Rate"), "Heart_Rate_raw.png");
    }

    #[test]
    fn test_raw_chart_uses_readings_unresampled() {
        let table = ElapsedTable::from_reader(
            "Timestamp,GSR\n\
             2025-01-01 10:00:00.000,500\n\
             2025-01-01 10:00:00.100,510\n\
             2025-01-01 10:00:00.200,\n\
             2025-01-01 10:00:02.500,490\n"
                .as_bytes(),
            "4filteredSensorData.csv",
        )
        .unwrap();

        let chart = RawChart::from_table(&table, "GSR").unwrap();
        assert_eq!(chart.points().len(), 3);
        assert!((chart.points()[1].0 - 0.1).abs() < 1e-6);
        assert_eq!(chart.points()[2].1, 490.0);
        assert!((chart.x_range().1 - 2.5).abs() < 1e-6);
        assert_eq!(chart.x_desc(), "Time(s) from 2025-01-01 10:00:00.000");
    }

    #[test]
    fn test_raw_chart_without_readings_is_error() {
        let table = ElapsedTable::from_reader("Timestamp,GSR\n0,\n1,-\n".as_bytes(), "empty.csv").unwrap();
        assert!(matches!(
            RawChart::from_table(&table, "GSR"),
            Err(SensorLoggerError::EmptyInput(_))
        ));
        assert!(matches!(
            RawChart::from_table(&table, "Heart Rate"),
            Err(SensorLoggerError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_render_raw_missing_file() {
        let config = PlotConfig {
            raw_file: "/nonexistent/4filteredSensorData.csv".to_string(),
            ..PlotConfig::default()
        };
        assert!(matches!(render_raw(&config), Err(SensorLoggerError::Io(_))));
    }

    #[test]
    fn test_padded_range() {
        let (lo, hi) = padded_range([0.0, 10.0]);
        assert!((lo - -1.5).abs() < 1e-9);
        assert!((hi - 11.5).abs() < 1e-9);
    }

    #[test]
    fn test_padded_range_flat_and_empty() {
        assert_eq!(padded_range([3.0, 3.0]), (2.5, 3.5));
        assert_eq!(padded_range(std::iter::empty()), (0.0, 1.0));
        assert_eq!(padded_range([f64::NAN]), (0.0, 1.0));
    }

    #[test]
    fn test_segments_break_at_gaps() {
        let values = [Some(1.0), Some(2.0), None, Some(4.0), None, None, Some(7.0), Some(8.0)];
        let runs = segments(&values);
        assert_eq!(
            runs,
            vec![
                vec![(0.0, 1.0), (1.0, 2.0)],
                vec![(3.0, 4.0)],
                vec![(6.0, 7.0), (7.0, 8.0)],
            ]
        );
    }

    #[test]
    fn test_segments_of_all_gaps() {
        assert!(segments(&[None, None]).is_empty());
    }

    #[test]
    fn test_x_range_covers_both_series() {
        let values = [Some(1.0); 4];
        let events = [Some(1.0); 6];
        let chart = ChannelChart {
            channel: "GSR",
            values: &values,
            events: &events,
        };
        assert_eq!(chart.x_range(), (0.0, 5.0));

        let single = ChannelChart {
            channel: "GSR",
            values: &values[..1],
            events: &[],
        };
        assert_eq!(single.x_range(), (0.0, 1.0));
    }
}
