//! PS/2 device emulation
//!
//! The stack, from the wire up:
//!
//! - [`frame`]: 11-bit frame codec (start, data, odd parity, stop)
//! - [`phy`]: boundary to the frame serializer, plus [`SharedLink`]
//! - [`transceiver`]: half-duplex arbitration, packet queue, resends
//! - [`keyboard`] / [`mouse`]: device protocol engines
//! - [`port`]: a transceiver and an engine polled together
//!
//! # Example
//!
//! ```
//! use hid2ps2::ps2::{KeyboardEngine, Ps2Port, SharedLink};
//! use hid2ps2::timer::Instant;
//!
//! static KEYBOARD_LINK: SharedLink = SharedLink::new();
//!
//! let mut port = Ps2Port::new(&KEYBOARD_LINK, KeyboardEngine::new());
//! port.split().0.power_on(Instant::from_ticks(0));
//!
//! // From the main loop, with a microsecond timestamp:
//! port.poll(Instant::from_ticks(1_000));
//! ```

pub mod frame;
pub mod keyboard;
pub mod mouse;
pub mod phy;
pub mod port;
pub mod scancode;
pub mod transceiver;

pub use frame::{decode_capture, decode_frame, encode_frame, Decoded, Frame};
pub use keyboard::KeyboardEngine;
pub use mouse::{MouseEngine, ProtocolLevel};
pub use phy::{Ps2Phy, SharedLink};
pub use port::{Ps2Device, Ps2Port};
pub use transceiver::{HostByteHandler, Packet, PacketQueue, Transceiver};

/// Acknowledge
pub const ACK: u8 = 0xFA;

/// Resend request (either direction)
pub const RESEND: u8 = 0xFE;

/// Basic Assurance Test passed
pub const SELF_TEST_PASSED: u8 = 0xAA;

/// Echo reply
pub const ECHO: u8 = 0xEE;
