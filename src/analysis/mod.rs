//! # Batch Analysis
//!
//! Offline tools over the CSV files the loggers produce.
//!
//! This module handles:
//! - Trimming sensor sessions to the time span of a gamepad event log
//! - Resampling sensor channels and event counts to 1-second buckets
//! - Dual-axis charts of each sensor channel against event activity

pub mod plot;
pub mod resample;
pub mod window;

use csv::{ReaderBuilder, StringRecord};
use std::io::Read;

use crate::error::{Result, SensorLoggerError};
use crate::session::record::TIMESTAMP_COLUMN;

/// CSV reader tolerant of ragged rows (session files may hold short lines)
pub(crate) fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input)
}

/// Index of `column` in `headers`, ignoring surrounding whitespace
pub(crate) fn column_index(headers: &StringRecord, column: &str, source: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| SensorLoggerError::MissingColumn {
            column: column.to_string(),
            file: source.to_string(),
        })
}

/// Index of the `Timestamp` column
pub(crate) fn timestamp_index(headers: &StringRecord, source: &str) -> Result<usize> {
    column_index(headers, TIMESTAMP_COLUMN, source)
}
