//! USB host stack events
//!
//! What the USB side hands the bridge. Slices borrow the host stack's
//! transfer buffers and are only valid for the duration of the call.

use super::constants::HidProtocol;
use super::keyboard::KeyboardLeds;

/// Events delivered by the USB host stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent<'a> {
    /// HID interface enumerated
    Mounted {
        /// Device address assigned
        address: u8,
        /// HID interface index
        instance: u8,
        /// Boot interface protocol
        protocol: HidProtocol,
        /// Raw report descriptor
        descriptor: &'a [u8],
    },
    /// Input report received
    Report {
        /// Device address
        address: u8,
        /// HID interface index
        instance: u8,
        /// Report bytes, including the Report ID prefix if the device uses IDs
        data: &'a [u8],
    },
    /// HID interface gone (device unplugged or hub port disabled)
    Unmounted {
        /// Device address
        address: u8,
        /// HID interface index
        instance: u8,
    },
}

impl HostEvent<'_> {
    /// Device address the event concerns
    pub fn address(&self) -> u8 {
        match *self {
            Self::Mounted { address, .. }
            | Self::Report { address, .. }
            | Self::Unmounted { address, .. } => address,
        }
    }

    /// HID interface the event concerns
    pub fn instance(&self) -> u8 {
        match *self {
            Self::Mounted { instance, .. }
            | Self::Report { instance, .. }
            | Self::Unmounted { instance, .. } => instance,
        }
    }
}

/// Calls back into the USB host stack
///
/// Both requests are fire-and-forget: `false` means the host stack could
/// not queue the transfer right now.
pub trait UsbHostStack {
    /// Ask for the next Input report of an interface
    fn request_report(&mut self, address: u8, instance: u8) -> bool;

    /// Send the keyboard LED Output report
    ///
    /// `leds.bits()` is the one-byte report payload; `report_id` 0 means no
    /// ID prefix.
    fn set_led_report(&mut self, address: u8, instance: u8, report_id: u8, leds: KeyboardLeds) -> bool;
}
