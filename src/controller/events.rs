//! # Gamepad Event Descriptions
//!
//! Turns raw evdev events into the one-line descriptions stored in the
//! `EventType` column of a gamepad log.
//!
//! | Event | Description |
//! |-------|-------------|
//! | Device opened | `Joystick #0 ('Name') added` |
//! | EV_ABS | `Joystick #0 axis 1 -> 128` |
//! | EV_KEY | `Joystick #0 button 304 -> PRESSED` |
//! | Device lost | `Joystick #0 removed` |
//!
//! Axis events arrive continuously while a stick is held off-centre, so they
//! are rate limited; buttons never are. Sync and other event types are
//! ignored.

use evdev::{InputEvent, InputEventKind};
use std::time::{Duration, Instant};

/// Key event value for a press
const KEY_PRESSED: i32 = 1;
/// Key event value for a release
const KEY_RELEASED: i32 = 0;

/// Formats evdev events for one gamepad
#[derive(Debug)]
pub struct EventFormatter {
    joystick_id: u32,
    motion_cooldown: Duration,
    next_motion_at: Option<Instant>,
}

impl EventFormatter {
    pub fn new(joystick_id: u32, motion_cooldown: Duration) -> Self {
        Self {
            joystick_id,
            motion_cooldown,
            next_motion_at: None,
        }
    }

    pub fn joystick_id(&self) -> u32 {
        self.joystick_id
    }

    /// Description logged when the gamepad is opened
    pub fn added(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => format!("Joystick #{} ('{}') added", self.joystick_id, name),
            None => format!("Joystick #{} added", self.joystick_id),
        }
    }

    /// Description logged when the gamepad goes away
    pub fn removed(&self) -> String {
        format!("Joystick #{} removed", self.joystick_id)
    }

    /// Describe one event received at `now`
    ///
    /// Returns `None` for ignored events: sync reports, key auto-repeat,
    /// unrelated event types and axis motion inside the cooldown window.
    pub fn describe(&mut self, event: &InputEvent, now: Instant) -> Option<String> {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => {
                if let Some(next) = self.next_motion_at {
                    if now < next {
                        return None;
                    }
                }
                self.next_motion_at = Some(now + self.motion_cooldown);
                Some(format!(
                    "Joystick #{} axis {} -> {}",
                    self.joystick_id,
                    axis.0,
                    event.value()
                ))
            }
            InputEventKind::Key(key) => {
                let state = match event.value() {
                    KEY_PRESSED => "PRESSED",
                    KEY_RELEASED => "RELEASED",
                    _ => return None,
                };
                Some(format!(
                    "Joystick #{} button {} -> {}",
                    self.joystick_id,
                    key.code(),
                    state
                ))
            }
            _ => None,
        }
    }
}
