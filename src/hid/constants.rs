//! HID protocol constants
//!
//! Standard constants from USB HID Specification 1.11 and HID Usage Tables 1.12

/// HID interface protocol codes (boot interface subclass)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HidProtocol {
    /// No boot protocol
    None = 0x00,
    /// Boot keyboard
    Keyboard = 0x01,
    /// Boot mouse
    Mouse = 0x02,
}

/// Usage pages (HID Usage Tables 1.12, Section 3)
pub mod usage_page {
    /// Generic Desktop
    pub const GENERIC_DESKTOP: u16 = 0x01;
    /// Keyboard/Keypad
    pub const KEYBOARD: u16 = 0x07;
    /// LEDs
    pub const LED: u16 = 0x08;
    /// Buttons
    pub const BUTTON: u16 = 0x09;
}

/// Generic Desktop usages (HID Usage Tables 1.12, Section 4)
pub mod usage {
    /// Pointer
    pub const POINTER: u16 = 0x01;
    /// Mouse
    pub const MOUSE: u16 = 0x02;
    /// Keyboard
    pub const KEYBOARD: u16 = 0x06;
    /// Keypad
    pub const KEYPAD: u16 = 0x07;
    /// X axis
    pub const X: u16 = 0x30;
    /// Y axis
    pub const Y: u16 = 0x31;
    /// Wheel
    pub const WHEEL: u16 = 0x38;
}

/// Report descriptor item types (bits 2-3 of the item prefix)
pub mod item_type {
    /// Main item
    pub const MAIN: u8 = 0;
    /// Global item
    pub const GLOBAL: u8 = 1;
    /// Local item
    pub const LOCAL: u8 = 2;
}

/// Main item tags
pub mod main_tag {
    /// Input
    pub const INPUT: u8 = 0x8;
    /// Output
    pub const OUTPUT: u8 = 0x9;
    /// Feature
    pub const FEATURE: u8 = 0xB;
    /// Collection
    pub const COLLECTION: u8 = 0xA;
    /// End Collection
    pub const END_COLLECTION: u8 = 0xC;
}

/// Global item tags
pub mod global_tag {
    /// Usage Page
    pub const USAGE_PAGE: u8 = 0x0;
    /// Logical Minimum
    pub const LOGICAL_MINIMUM: u8 = 0x1;
    /// Logical Maximum
    pub const LOGICAL_MAXIMUM: u8 = 0x2;
    /// Report Size
    pub const REPORT_SIZE: u8 = 0x7;
    /// Report ID
    pub const REPORT_ID: u8 = 0x8;
    /// Report Count
    pub const REPORT_COUNT: u8 = 0x9;
    /// Push
    pub const PUSH: u8 = 0xA;
    /// Pop
    pub const POP: u8 = 0xB;
}

/// Local item tags
pub mod local_tag {
    /// Usage
    pub const USAGE: u8 = 0x0;
    /// Usage Minimum
    pub const USAGE_MINIMUM: u8 = 0x1;
    /// Usage Maximum
    pub const USAGE_MAXIMUM: u8 = 0x2;
}

/// Long item prefix (never used by keyboards and mice, skipped whole)
pub const LONG_ITEM_PREFIX: u8 = 0xFE;
