//! # Error Types
//!
//! Custom error types for Sensor Logger using `thiserror`.

use thiserror::Error;

/// Main error type for Sensor Logger
#[derive(Debug, Error)]
pub enum SensorLoggerError {
    /// Serial port could not be opened or read
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Gamepad errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// A timestamp cell that is neither a date-time nor a number
    #[error("Invalid timestamp: {0:?}")]
    Timestamp(String),

    /// A CSV file lacks a required column
    #[error("Missing column {column:?} in {file}")]
    MissingColumn { column: String, file: String },

    /// Input contained no usable rows
    #[error("No data: {0}")]
    EmptyInput(String),

    /// Chart rendering errors
    #[error("Plot error: {0}")]
    Plot(String),

    /// CSV reader/writer errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Sensor Logger
pub type Result<T> = std::result::Result<T, SensorLoggerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message() {
        let err = SensorLoggerError::MissingColumn {
            column: "Timestamp".to_string(),
            file: "log1.csv".to_string(),
        };
        assert_eq!(err.to_string(), "Missing column \"Timestamp\" in log1.csv");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SensorLoggerError = io.into();
        assert!(matches!(err, SensorLoggerError::Io(_)));
    }
}
