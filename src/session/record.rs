//! # Sensor Samples and Records
//!
//! A sample is one serial line from the sensor board: ten comma-separated
//! readings in a fixed order. A record is a sample prefixed with the time it
//! was read.

/// Sensor fields in the order the board sends them
pub const SENSOR_FIELDS: [&str; 10] = [
    "Left Sensor",
    "Right Sensor",
    "GSR",
    "Accel X",
    "Accel Y",
    "Accel Z",
    "Gyro X",
    "Gyro Y",
    "Gyro Z",
    "Temperature (C)",
];

/// Name of the capture-time column
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

/// Number of readings in a well-formed sample
pub const SENSOR_FIELD_COUNT: usize = SENSOR_FIELDS.len();

/// Header row of every session file
pub fn session_header() -> Vec<&'static str> {
    std::iter::once(TIMESTAMP_COLUMN)
        .chain(SENSOR_FIELDS.iter().copied())
        .collect()
}

/// Why a serial line was not turned into a sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Bytes are not valid UTF-8
    NotUtf8,
    /// Nothing left after trimming
    Blank,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineError::NotUtf8 => write!(f, "line is not valid UTF-8"),
            LineError::Blank => write!(f, "line is blank"),
        }
    }
}

/// One decoded serial line
///
/// Fields are kept as text exactly as the board sent them; the board does
/// not validate counts or numeric types, and neither does the logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    fields: Vec<String>,
}

impl Sample {
    /// Decode one raw serial line (without or with its line terminator)
    ///
    /// Trailing whitespace, including `\r\n`, is stripped before splitting on
    /// commas.
    ///
    /// # Examples
    ///
    /// ```
    /// use sensor_logger::session::record::Sample;
    ///
    /// let sample = Sample::parse(b"1,2,3,4,5,6,7,8,9,10\r\n").unwrap();
    /// assert_eq!(sample.fields().len(), 10);
    /// assert!(sample.is_complete());
    /// ```
    pub fn parse(raw: &[u8]) -> Result<Self, LineError> {
        let text = std::str::from_utf8(raw).map_err(|_| LineError::NotUtf8)?;
        let text = text.trim_end();

        if text.trim_start().is_empty() {
            return Err(LineError::Blank);
        }

        Ok(Self {
            fields: text.split(',').map(str::to_string).collect(),
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Whether the sample carries exactly one value per sensor field
    pub fn is_complete(&self) -> bool {
        self.fields.len() == SENSOR_FIELD_COUNT
    }
}

/// A sample stamped with its capture time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub timestamp: String,
    pub sample: Sample,
}

impl Record {
    pub fn new(timestamp: String, sample: Sample) -> Self {
        Self { timestamp, sample }
    }

    /// Cells of the CSV row: timestamp first, then the sample fields
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.timestamp.as_str())
            .chain(self.sample.fields.iter().map(String::as_str))
    }
}
