//! # Gamepad Device Module
//!
//! Finds and opens gamepads and joysticks through the Linux evdev
//! interface.
//!
//! ## Controller Detection
//!
//! A device counts as a gamepad if it reports any of the joystick or gamepad
//! buttons (`BTN_SOUTH`, `BTN_TRIGGER`, `BTN_THUMB`).
//! Keyboards and mice do not.

use evdev::{Device, InputEvent, Key};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::watcher::{DeviceSource, GamepadEvents};
use crate::error::{Result, SensorLoggerError};

/// Directory holding the evdev event nodes
pub const INPUT_DIR: &str = "/dev/input";

/// Buttons that identify a joystick or gamepad
const GAMEPAD_BUTTONS: &[Key] = &[Key::BTN_SOUTH, Key::BTN_TRIGGER, Key::BTN_THUMB];

/// Open gamepad handle
pub struct Gamepad {
    device: Device,
    device_path: String,
    joystick_id: u32,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("joystick_id", &self.joystick_id)
            .finish_non_exhaustive()
    }
}

/// Joystick id derived from the event node number (`/dev/input/event7` -> 7)
pub fn joystick_id_from_path(path: &str) -> u32 {
    let digits: String = path
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().unwrap_or(0)
}

/// `event*` nodes in `dir`, sorted by path
///
/// # Errors
///
/// Returns `Controller` if the directory cannot be read.
pub fn event_nodes(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SensorLoggerError::Controller(format!("Failed to read {}: {}", dir.display(), e)))?;

    let mut nodes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false)
        })
        .collect();

    // Sorted for a deterministic order when several controllers are connected
    nodes.sort();
    Ok(nodes)
}

impl Gamepad {
    /// Open the evdev node at `device_path`
    ///
    /// # Errors
    ///
    /// Returns `Controller` if the node cannot be opened.
    pub fn open(device_path: &str) -> Result<Self> {
        let device = Device::open(device_path)
            .map_err(|e| SensorLoggerError::Controller(format!("Failed to open {}: {}", device_path, e)))?;
        debug!(
            "Opened input device: {} ({})",
            device_path,
            device.name().unwrap_or("unnamed")
        );

        let joystick_id = joystick_id_from_path(device_path);
        Ok(Self {
            device,
            device_path: device_path.to_string(),
            joystick_id,
        })
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn joystick_id(&self) -> u32 {
        self.joystick_id
    }

    /// Human-readable device name reported by the driver
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }

    /// Whether the device reports joystick or gamepad buttons
    pub fn is_gamepad(&self) -> bool {
        self.device
            .supported_keys()
            .map(|keys| GAMEPAD_BUTTONS.iter().any(|&button| keys.contains(button)))
            .unwrap_or(false)
    }
}

impl GamepadEvents for Gamepad {
    fn device_name(&self) -> Option<String> {
        self.name().map(str::to_string)
    }

    /// Blocks until events are available
    fn fetch(&mut self) -> Result<Vec<InputEvent>> {
        self.device
            .fetch_events()
            .map(|events| events.collect())
            .map_err(|e| SensorLoggerError::Controller(format!("Failed to fetch events: {}", e)))
    }
}

/// Gamepads under an input directory
///
/// With a configured device path only that node is watched and it is used
/// whether or not it reports gamepad buttons. Otherwise every `event*` node
/// is a candidate and non-gamepads are skipped.
#[derive(Debug, Clone)]
pub struct InputDir {
    dir: PathBuf,
    device_path: Option<String>,
}

impl InputDir {
    /// Watch `dir`, or only `device_path` when it is non-empty
    pub fn new<P: AsRef<Path>>(dir: P, device_path: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            device_path: (!device_path.is_empty()).then(|| device_path.to_string()),
        }
    }
}

impl DeviceSource for InputDir {
    type Device = Gamepad;

    fn scan(&mut self) -> Vec<String> {
        if let Some(path) = &self.device_path {
            return if Path::new(path).exists() {
                vec![path.clone()]
            } else {
                Vec::new()
            };
        }

        match event_nodes(&self.dir) {
            Ok(nodes) => nodes
                .into_iter()
                .map(|path| path.to_string_lossy().to_string())
                .collect(),
            Err(e) => {
                debug!("{}", e);
                Vec::new()
            }
        }
    }

    fn open(&mut self, path: &str) -> Result<Option<Gamepad>> {
        let gamepad = Gamepad::open(path)?;
        if self.device_path.is_none() && !gamepad.is_gamepad() {
            return Ok(None);
        }
        info!("Found gamepad at: {}", path);
        Ok(Some(gamepad))
    }
}
