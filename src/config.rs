//! Build-time configuration
//!
//! Capacities of every fixed-size table in the crate, protocol timing
//! defaults, and the board pin assignment. Nothing here is persisted; the
//! PS/2 host reconfigures rate and delay at runtime.

use crate::timer::Duration;

/// Maximum number of HID interfaces tracked at once (keyboards, mice, composite halves)
pub const MAX_HID_INSTANCES: usize = 8;

/// Maximum number of logical reports kept per HID interface
pub const MAX_REPORTS: usize = 8;

/// Maximum number of fields kept per logical report
pub const MAX_REPORT_FIELDS: usize = 32;

/// Maximum number of usages queued between two main items
pub const MAX_QUEUED_USAGES: usize = 16;

/// Depth of the global item stack (Push/Pop)
pub const MAX_GLOBAL_STACK: usize = 4;

/// Largest PS/2 packet (the Pause make sequence)
pub const MAX_PACKET_LEN: usize = 8;

/// Outbound packets buffered per PS/2 port
pub const PACKET_QUEUE_DEPTH: usize = 32;

/// Frames received from the host buffered between two polls
pub const RX_FRAME_DEPTH: usize = 4;

/// Polls to wait for the host to clock in a byte before sending the next one
pub const TX_BACKOFF_POLLS: u8 = 100;

/// Keyboard typematic delay after power-on, reset and set-defaults
pub const KEYBOARD_DEFAULT_DELAY: Duration = Duration::millis(500);

/// Keyboard typematic interval after power-on, reset and set-defaults (10.9 cps)
pub const KEYBOARD_DEFAULT_INTERVAL: Duration = Duration::micros(91_743);

/// Keyboard Basic Assurance Test duration
pub const KEYBOARD_SELF_TEST_DELAY: Duration = Duration::millis(500);

/// Mouse sample rate after power-on, reset and set-defaults
pub const MOUSE_DEFAULT_SAMPLE_RATE: u8 = 100;

/// Mouse resolution reported by Status Request (4 counts/mm)
pub const MOUSE_RESOLUTION: u8 = 0x02;

/// Delay before the mouse answers a reset
pub const MOUSE_RESET_DELAY: Duration = Duration::millis(100);

/// Delay between Enable Data Reporting and the first movement packet
pub const MOUSE_STREAM_START_DELAY: Duration = Duration::millis(100);

/// GPIO assignment for one PS/2 port (clock is normally data + 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortPins {
    /// DATA line GPIO
    pub data: u8,
    /// CLOCK line GPIO
    pub clock: u8,
}

impl PortPins {
    /// Pins for a port whose clock sits right after its data line
    pub const fn adjacent(data: u8) -> Self {
        Self {
            data,
            clock: data + 1,
        }
    }
}

/// Board pin assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoardConfig {
    /// Keyboard port pins
    pub keyboard: PortPins,
    /// Mouse port pins
    pub mouse: PortPins,
    /// First USB D+ GPIO for the software USB host (D- is D+ + 1)
    pub usb_dp: u8,
}

impl BoardConfig {
    /// Default wiring: keyboard on GPIO 11/12, mouse on GPIO 14/15, USB on GPIO 2/3
    pub const DEFAULT: Self = Self {
        keyboard: PortPins::adjacent(11),
        mouse: PortPins::adjacent(14),
        usb_dp: 2,
    };
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Runtime options for the USB side of the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BridgeConfig {
    /// Decode boot-interface keyboards and mice with the fixed boot layout
    /// instead of their report descriptor. The USB host stack puts boot
    /// interfaces into boot protocol by default.
    pub prefer_boot_protocol: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            prefer_boot_protocol: true,
        }
    }
}
