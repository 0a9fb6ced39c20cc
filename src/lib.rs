//! # Sensor Logger Library
//!
//! Record sensor-board readings from a serial port into numbered CSV
//! sessions, log gamepad events alongside them, and compare the two offline.
//!
//! The live side is the session logger (serial loop plus `s`/`e`/`q` key
//! commands) and the gamepad event logger. The batch side trims sensor
//! sessions to the span of an event log and charts each channel against
//! event activity.

pub mod analysis;
pub mod config;
pub mod controller;
pub mod error;
pub mod keyboard;
pub mod logging;
pub mod serial;
pub mod session;
pub mod timestamp;
