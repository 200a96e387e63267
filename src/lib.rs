#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

//! USB HID keyboard and mouse to PS/2 translator
//!
//! Lets USB keyboards and mice drive machines that only have PS/2 ports.
//! The crate emulates a PS/2 keyboard and a PS/2 mouse (including the
//! IntelliMouse wheel extensions), fed by HID reports from a USB host stack.
//!
//! # Layers
//!
//! - [`hid`] - HID report decoding: boot layouts, report descriptor parsing,
//!   key state tracking
//! - [`ps2`] - PS/2 device emulation: frame codec, half-duplex transceiver,
//!   keyboard and mouse protocol engines
//! - [`bridge`] - routes USB events to the two PS/2 ports and LED state back
//!
//! # Core Components
//!
//! - [`config`] - capacities, timing defaults, board pins
//! - [`timer`] - deadline timers serviced from the poll loop
//! - [`stats`] - per-port diagnostic counters
//! - [`error`] - error types
//!
//! # Integration
//!
//! The USB host stack and the PS/2 waveform generator stay outside this crate.
//! The host stack implements [`hid::UsbHostStack`] and feeds
//! [`hid::HostEvent`]s to [`bridge::Bridge::handle_event`]. The waveform
//! generator (a PIO program, a timer interrupt) talks to a
//! [`ps2::SharedLink`] per port. The main loop calls
//! [`bridge::Bridge::poll`] with a microsecond timestamp.

#[cfg(test)]
extern crate std;

#[cfg(feature = "defmt")]
use defmt as _;

pub mod bridge;
pub mod config;
pub mod error;
pub mod hid;
pub mod ps2;
pub mod stats;
pub mod timer;

pub use bridge::Bridge;
pub use error::{Error, Result};
