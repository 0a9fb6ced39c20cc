//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration for the usual lab layout.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SensorLoggerError};

/// Environment variable naming an alternative configuration file
pub const CONFIG_ENV_VAR: &str = "SENSOR_LOGGER_CONFIG";

/// Configuration file used when the environment variable is not set
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Placeholder substituted by the window filter batch driver
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Baud rates accepted for the sensor board
const VALID_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115200, 230400, 460800, 921600];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub gamepad: GamepadConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Session file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_dir")]
    pub output_dir: String,

    #[serde(default = "default_session_prefix")]
    pub file_prefix: String,
}

/// Gamepad event logger configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GamepadConfig {
    /// Empty means auto-detect under /dev/input
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_gamepad_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_gamepad_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_motion_cooldown_ms")]
    pub motion_cooldown_ms: u64,

    /// How often /dev/input is rescanned for plugged or unplugged gamepads
    #[serde(default = "default_rescan_interval_ms")]
    pub rescan_interval_ms: u64,
}

/// Window filter batch configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    #[serde(default = "default_sensor_pattern")]
    pub sensor_pattern: String,

    #[serde(default = "default_reference_pattern")]
    pub reference_pattern: String,

    #[serde(default = "default_output_pattern")]
    pub output_pattern: String,

    #[serde(default = "default_first_index")]
    pub first_index: u32,

    #[serde(default = "default_last_index")]
    pub last_index: u32,
}

/// Resample and plot configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PlotConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,

    #[serde(default = "default_sensor_suffix")]
    pub sensor_suffix: String,

    #[serde(default = "default_event_suffix")]
    pub event_suffix: String,

    #[serde(default = "default_plot_dir")]
    pub output_dir: String,

    #[serde(default = "default_plot_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_plot_width")]
    pub width: u32,

    #[serde(default = "default_plot_height")]
    pub height: u32,

    /// Session file charted by `raw-plot`
    #[serde(default = "default_raw_file")]
    pub raw_file: String,

    /// Column of `raw_file` charted by `raw-plot`
    #[serde(default = "default_raw_channel")]
    pub raw_channel: String,
}

/// Diagnostic log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Empty means stderr only
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 1000 }
fn default_poll_interval_ms() -> u64 { 100 }

fn default_session_dir() -> String { "sensorData".to_string() }
fn default_session_prefix() -> String { "sensorData".to_string() }

fn default_gamepad_log_dir() -> String { "controller_logging/logs".to_string() }
fn default_gamepad_prefix() -> String { "log".to_string() }
fn default_motion_cooldown_ms() -> u64 { 40 }
fn default_rescan_interval_ms() -> u64 { 1000 }

fn default_sensor_pattern() -> String { "sensorData/{index}.sensorData.csv".to_string() }
fn default_reference_pattern() -> String { "controller_logging/logs/{index}.logData.csv".to_string() }
fn default_output_pattern() -> String { "filteredSensorData/{index}filteredSensorData.csv".to_string() }
fn default_first_index() -> u32 { 1 }
fn default_last_index() -> u32 { 10 }

fn default_input_dir() -> String { "filteredSensorData".to_string() }
fn default_sensor_suffix() -> String { "filteredSensorData.csv".to_string() }
fn default_event_suffix() -> String { ".logData.csv".to_string() }
fn default_plot_dir() -> String { "Plotted".to_string() }
fn default_plot_prefix() -> String { "1-".to_string() }
fn default_plot_width() -> u32 { 1500 }
fn default_plot_height() -> u32 { 600 }
fn default_raw_file() -> String { "filteredSensorData/4filteredSensorData.csv".to_string() }
fn default_raw_channel() -> String { "GSR".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_dir: default_session_dir(),
            file_prefix: default_session_prefix(),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            log_dir: default_gamepad_log_dir(),
            file_prefix: default_gamepad_prefix(),
            motion_cooldown_ms: default_motion_cooldown_ms(),
            rescan_interval_ms: default_rescan_interval_ms(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sensor_pattern: default_sensor_pattern(),
            reference_pattern: default_reference_pattern(),
            output_pattern: default_output_pattern(),
            first_index: default_first_index(),
            last_index: default_last_index(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            sensor_suffix: default_sensor_suffix(),
            event_suffix: default_event_suffix(),
            output_dir: default_plot_dir(),
            file_prefix: default_plot_prefix(),
            width: default_plot_width(),
            height: default_plot_height(),
            raw_file: default_raw_file(),
            raw_channel: default_raw_channel(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl FilterConfig {
    /// Expand the three path patterns for one session index
    ///
    /// Returns `(sensor, reference, output)` paths.
    pub fn paths_for(&self, index: u32) -> (PathBuf, PathBuf, PathBuf) {
        let expand = |pattern: &str| PathBuf::from(pattern.replace(INDEX_PLACEHOLDER, &index.to_string()));
        (
            expand(&self.sensor_pattern),
            expand(&self.reference_pattern),
            expand(&self.output_pattern),
        )
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sensor_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration file the process would load, if any
    ///
    /// `$SENSOR_LOGGER_CONFIG` when set, otherwise `config/default.toml` when
    /// present.
    pub fn source_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        let default = Path::new(DEFAULT_CONFIG_PATH);
        default.exists().then(|| default.to_path_buf())
    }

    /// Resolve and load the process configuration
    ///
    /// Loads [`Config::source_path`] (an explicitly named file must exist),
    /// otherwise falls back to built-in defaults.
    pub fn resolve() -> Result<Self> {
        match Self::source_path() {
            Some(path) => Self::load(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Validate serial configuration
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                VALID_BAUD_RATES.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.poll_interval_ms == 0 || self.serial.poll_interval_ms > 10000 {
            return Err(invalid("poll_interval_ms must be between 1 and 10000"));
        }

        // Validate session files
        if self.session.output_dir.is_empty() {
            return Err(invalid("session output_dir cannot be empty"));
        }

        if self.session.file_prefix.is_empty() {
            return Err(invalid("session file_prefix cannot be empty"));
        }

        // Gamepad device_path can be empty (auto-detect)
        if self.gamepad.log_dir.is_empty() {
            return Err(invalid("gamepad log_dir cannot be empty"));
        }

        if self.gamepad.file_prefix.is_empty() {
            return Err(invalid("gamepad file_prefix cannot be empty"));
        }

        if self.gamepad.motion_cooldown_ms > 60000 {
            return Err(invalid("motion_cooldown_ms must be at most 60000"));
        }

        if self.gamepad.rescan_interval_ms == 0 || self.gamepad.rescan_interval_ms > 60000 {
            return Err(invalid("rescan_interval_ms must be between 1 and 60000"));
        }

        // Validate filter patterns
        for (name, pattern) in [
            ("sensor_pattern", &self.filter.sensor_pattern),
            ("reference_pattern", &self.filter.reference_pattern),
            ("output_pattern", &self.filter.output_pattern),
        ] {
            if !pattern.contains(INDEX_PLACEHOLDER) {
                return Err(invalid(format!("{} must contain {}", name, INDEX_PLACEHOLDER)));
            }
        }

        if self.filter.first_index > self.filter.last_index {
            return Err(invalid("first_index must not exceed last_index"));
        }

        // Validate plot output
        if self.plot.sensor_suffix.is_empty() || self.plot.event_suffix.is_empty() {
            return Err(invalid("plot sensor_suffix and event_suffix cannot be empty"));
        }

        if self.plot.sensor_suffix == self.plot.event_suffix {
            return Err(invalid("plot sensor_suffix and event_suffix must differ"));
        }

        if self.plot.output_dir.is_empty() {
            return Err(invalid("plot output_dir cannot be empty"));
        }

        if self.plot.width == 0 || self.plot.height == 0 {
            return Err(invalid("plot width and height must be greater than 0"));
        }

        if self.plot.raw_file.is_empty() || self.plot.raw_channel.is_empty() {
            return Err(invalid("plot raw_file and raw_channel cannot be empty"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> SensorLoggerError {
    SensorLoggerError::Config(toml::de::Error::custom(msg))
}
