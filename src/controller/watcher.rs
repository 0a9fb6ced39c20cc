//! # Gamepad Hotplug Watcher
//!
//! Keeps track of which gamepads are connected. The watcher thread rescans
//! the input directory at a fixed interval; every newly seen gamepad is
//! announced with an `added` event and gets its own blocking reader thread,
//! which announces `removed` when the device goes away. Unplugging a
//! gamepad never stops the logger, and plugging it back in is picked up on
//! the next rescan.

use evdev::InputEvent;
use std::collections::BTreeSet;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::device::joystick_id_from_path;
use super::events::EventFormatter;
use super::LoggedEvent;
use crate::error::Result;

/// An open gamepad the reader thread can pull events from
pub trait GamepadEvents {
    /// Name reported by the driver
    fn device_name(&self) -> Option<String>;

    /// Next batch of events; an error means the device is gone
    fn fetch(&mut self) -> Result<Vec<InputEvent>>;
}

/// Where gamepads are found and opened
pub trait DeviceSource {
    type Device: GamepadEvents + Send + 'static;

    /// Device nodes currently present, gamepads or not
    fn scan(&mut self) -> Vec<String>;

    /// Open `path`; `Ok(None)` when the node is not a gamepad
    fn open(&mut self, path: &str) -> Result<Option<Self::Device>>;
}

/// Tracks connected gamepads across rescans of a [`DeviceSource`]
pub struct DeviceWatcher<S: DeviceSource> {
    source: S,
    motion_cooldown: Duration,
    tx: mpsc::UnboundedSender<LoggedEvent>,
    gone_tx: std_mpsc::Sender<String>,
    gone_rx: std_mpsc::Receiver<String>,
    connected: BTreeSet<String>,
    ignored: BTreeSet<String>,
}

impl<S: DeviceSource> std::fmt::Debug for DeviceWatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceWatcher")
            .field("connected", &self.connected)
            .field("ignored", &self.ignored)
            .finish_non_exhaustive()
    }
}

impl<S: DeviceSource> DeviceWatcher<S> {
    pub fn new(source: S, motion_cooldown: Duration, tx: mpsc::UnboundedSender<LoggedEvent>) -> Self {
        let (gone_tx, gone_rx) = std_mpsc::channel();
        Self {
            source,
            motion_cooldown,
            tx,
            gone_tx,
            gone_rx,
            connected: BTreeSet::new(),
            ignored: BTreeSet::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Device nodes with a running reader
    pub fn connected(&self) -> impl Iterator<Item = &str> {
        self.connected.iter().map(String::as_str)
    }

    /// Forget gamepads whose reader has exited
    fn reap(&mut self) {
        while let Ok(path) = self.gone_rx.try_recv() {
            self.connected.remove(&path);
        }
    }

    /// Scan once and start a reader for every new gamepad
    ///
    /// Nodes that are not gamepads are skipped until they disappear. Nodes
    /// that fail to open are retried on the next scan, since permissions
    /// on a freshly plugged device are often applied a moment later.
    ///
    /// Returns the number of gamepads added.
    pub fn rescan(&mut self) -> usize {
        self.reap();

        let present = self.source.scan();
        self.ignored.retain(|path| present.contains(path));

        let mut added = 0;
        for path in present {
            if self.connected.contains(&path) || self.ignored.contains(&path) {
                continue;
            }

            let device = match self.source.open(&path) {
                Ok(Some(device)) => device,
                Ok(None) => {
                    debug!("{} is not a gamepad", path);
                    self.ignored.insert(path);
                    continue;
                }
                Err(e) => {
                    debug!("Could not open {}: {}", path, e);
                    continue;
                }
            };

            let formatter = EventFormatter::new(joystick_id_from_path(&path), self.motion_cooldown);
            let announced = LoggedEvent::now(
                formatter.joystick_id(),
                formatter.added(device.device_name().as_deref()),
            );
            if self.tx.send(announced).is_err() {
                return added;
            }

            match spawn_reader(path.clone(), device, formatter, self.tx.clone(), self.gone_tx.clone()) {
                Ok(_) => {
                    info!("Gamepad connected: {}", path);
                    self.connected.insert(path);
                    added += 1;
                }
                Err(e) => warn!("Failed to start reader for {}: {}", path, e),
            }
        }
        added
    }

    /// Rescan every `interval` until the event receiver is dropped
    pub fn run(mut self, interval: Duration) {
        while !self.tx.is_closed() {
            self.rescan();
            thread::sleep(interval);
        }
        debug!("Gamepad watcher stopped");
    }
}

/// Run `watcher` on its own thread
pub fn spawn_watcher<S>(watcher: DeviceWatcher<S>, interval: Duration) -> std::io::Result<thread::JoinHandle<()>>
where
    S: DeviceSource + Send + 'static,
{
    thread::Builder::new()
        .name("gamepad-watcher".to_string())
        .spawn(move || watcher.run(interval))
}

/// Forward described events of one gamepad until it fails
///
/// On failure the path is reported on `gone` before the `removed` event is
/// sent, so a rescan that follows the `removed` event never sees the
/// device as still connected.
fn spawn_reader<D>(
    path: String,
    mut device: D,
    mut formatter: EventFormatter,
    tx: mpsc::UnboundedSender<LoggedEvent>,
    gone: std_mpsc::Sender<String>,
) -> std::io::Result<thread::JoinHandle<()>>
where
    D: GamepadEvents + Send + 'static,
{
    let id = formatter.joystick_id();
    thread::Builder::new()
        .name(format!("gamepad-{}", id))
        .spawn(move || loop {
            if tx.is_closed() {
                let _ = gone.send(path);
                return;
            }

            let events = match device.fetch() {
                Ok(events) => events,
                Err(e) => {
                    warn!("{}: {}", path, e);
                    let _ = gone.send(path);
                    let _ = tx.send(LoggedEvent::now(id, formatter.removed()));
                    return;
                }
            };

            for event in events {
                if let Some(description) = formatter.describe(&event, Instant::now()) {
                    if tx.send(LoggedEvent::now(id, description)).is_err() {
                        let _ = gone.send(path);
                        return;
                    }
                }
            }
        })
}
