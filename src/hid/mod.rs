//! HID (Human Interface Device) input side
//!
//! Turns the raw reports the USB host stack delivers into key transitions
//! and mouse motion.
//!
//! # Boot Protocol vs Report Protocol
//!
//! ## Boot Protocol
//! - Fixed report format (8 bytes for keyboard, 3-4 bytes for mouse)
//! - No report descriptor parsing needed
//! - Used for boot-interface devices unless [`BridgeConfig`] says otherwise
//!
//! ## Report Protocol
//! - Layout defined by the device's report descriptor
//! - Needed for NKRO keyboards, high-resolution mice and composite receivers
//! - Decoded through [`report_descriptor`]
//!
//! # Example
//!
//! ```
//! use hid2ps2::hid::{KeySnapshot, KeyState, KeyboardReport};
//!
//! let mut state = KeyState::new();
//! let report = KeyboardReport::parse(&[0x00, 0x00, 0x04, 0, 0, 0, 0, 0])?;
//!
//! state.update(KeySnapshot::from_boot(&report), |usage, pressed| {
//!     assert_eq!((usage, pressed), (0x04, true));
//! });
//! # Ok::<(), hid2ps2::Error>(())
//! ```
//!
//! # Reference
//!
//! - USB HID Specification 1.11: <https://www.usb.org/document-library/device-class-definition-hid-111>
//! - HID Usage Tables 1.12: <https://usb.org/document-library/hid-usage-tables-15>
//!
//! [`BridgeConfig`]: crate::config::BridgeConfig

pub mod constants;
pub mod device;
pub mod events;
pub mod keyboard;
pub mod mouse;
pub mod report_descriptor;

pub use constants::HidProtocol;
pub use device::{DeviceHidState, HidInstanceTable};
pub use events::{HostEvent, UsbHostStack};
pub use keyboard::{KeyCode, KeyModifiers, KeySnapshot, KeyState, KeyboardLeds, KeyboardReport};
pub use mouse::{MouseButtons, MouseReport};
pub use report_descriptor::{extract_field, ReportDescriptor, ReportField};
