//! Scan Code Set 2 tables
//!
//! Translation from HID keyboard usages (Usage Page 0x07) to PS/2 Scan Code
//! Set 2 make codes, plus the typematic rate/delay tables selected by the
//! host's Set Typematic Rate/Delay (0xF3) command.

use crate::hid::keyboard::{KeyCode, KeyboardLeds};

/// Prefix for extended keys
pub const EXTENDED_PREFIX: u8 = 0xE0;

/// Prefix for break (release) codes
pub const BREAK_PREFIX: u8 = 0xF0;

/// Make sequence for Pause
pub const PAUSE_SEQUENCE: [u8; 8] = [0xE1, 0x14, 0x77, 0xE1, 0xF0, 0x14, 0xF0, 0x77];

/// Make sequence for Ctrl+Pause (Break)
pub const BREAK_SEQUENCE: [u8; 5] = [0xE0, 0x7E, 0xE0, 0xF0, 0x7E];

/// Make codes for the eight modifier keys, in HID modifier bit order
pub const MODIFIER_CODES: [u8; 8] = [0x14, 0x12, 0x11, 0x1F, 0x14, 0x59, 0x11, 0x27];

/// Make codes indexed by HID usage, `0x00..=0x73` (through F24)
#[rustfmt::skip]
pub const KEY_CODES: [u8; 0x74] = [
    0x00, 0x00, 0xFC, 0x00, 0x1C, 0x32, 0x21, 0x23, 0x24, 0x2B, 0x34, 0x33, 0x43, 0x3B, 0x42, 0x4B,
    0x3A, 0x31, 0x44, 0x4D, 0x15, 0x2D, 0x1B, 0x2C, 0x3C, 0x2A, 0x1D, 0x22, 0x35, 0x1A, 0x16, 0x1E,
    0x26, 0x25, 0x2E, 0x36, 0x3D, 0x3E, 0x46, 0x45, 0x5A, 0x76, 0x66, 0x0D, 0x29, 0x4E, 0x55, 0x54,
    0x5B, 0x5D, 0x5D, 0x4C, 0x52, 0x0E, 0x41, 0x49, 0x4A, 0x58, 0x05, 0x06, 0x04, 0x0C, 0x03, 0x0B,
    0x83, 0x0A, 0x01, 0x09, 0x78, 0x07, 0x7C, 0x7E, 0x7E, 0x70, 0x6C, 0x7D, 0x71, 0x69, 0x7A, 0x74,
    0x6B, 0x72, 0x75, 0x77, 0x4A, 0x7C, 0x7B, 0x79, 0x5A, 0x69, 0x72, 0x7A, 0x6B, 0x73, 0x74, 0x6C,
    0x75, 0x7D, 0x70, 0x71, 0x61, 0x2F, 0x37, 0x0F, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38, 0x40,
    0x48, 0x50, 0x57, 0x5F,
];

/// Typematic repeat intervals in microseconds, selected by bits 0-4 of the
/// 0xF3 parameter (30.0 cps down to 2.0 cps)
#[rustfmt::skip]
pub const REPEAT_INTERVALS_US: [u32; 32] = [
     33_333,  37_453,  41_667,  45_872,  48_309,  54_054,  58_480,  62_500,
     66_667,  75_188,  83_333,  91_743, 100_000, 108_696, 116_279, 125_000,
    133_333, 149_254, 166_667, 181_818, 200_000, 217_391, 232_558, 250_000,
    270_270, 303_030, 333_333, 370_370, 400_000, 434_783, 476_190, 500_000,
];

/// Typematic delays in milliseconds, selected by bits 5-6 of the 0xF3 parameter
pub const REPEAT_DELAYS_MS: [u32; 4] = [250, 500, 750, 1000];

/// PS/2 LED bits (bit 0 Scroll, 1 Num, 2 Caps) to HID LED bits
/// (bit 0 Num, 1 Caps, 2 Scroll)
pub const LED_TO_HID: [u8; 8] = [0, 4, 1, 5, 2, 6, 3, 7];

/// Check if `key` is one of the eight HID modifier usages
pub const fn is_modifier(key: u8) -> bool {
    key >= KeyCode::LEFT_CTRL.0 && key <= KeyCode::RIGHT_GUI.0
}

/// Check if `key` has a translation in Scan Code Set 2
pub const fn is_translatable(key: u8) -> bool {
    is_modifier(key) || (key >= KeyCode::A.0 && key <= KeyCode::F24.0)
}

/// Check if `key` is sent with the 0xE0 prefix
pub const fn is_extended(key: u8) -> bool {
    key == KeyCode::PRINT_SCREEN.0
        || (key >= KeyCode::INSERT.0 && key <= KeyCode::UP_ARROW.0)
        || key == KeyCode::KEYPAD_DIVIDE.0
        || key == KeyCode::KEYPAD_ENTER.0
        || key == KeyCode::APPLICATION.0
        || key == KeyCode::POWER.0
        || (key >= KeyCode::LEFT_GUI.0 && key != KeyCode::RIGHT_SHIFT.0)
}

/// Make code for `key` without any prefix
///
/// Returns `None` for usages outside the translatable range.
pub const fn make_code(key: u8) -> Option<u8> {
    if is_modifier(key) {
        Some(MODIFIER_CODES[(key - KeyCode::LEFT_CTRL.0) as usize])
    } else if is_translatable(key) {
        Some(KEY_CODES[key as usize])
    } else {
        None
    }
}

/// Decode the 0xF3 parameter into (delay in ms, interval in µs)
pub const fn typematic(param: u8) -> (u32, u32) {
    let interval = REPEAT_INTERVALS_US[(param & 0x1F) as usize];
    let delay = REPEAT_DELAYS_MS[((param & 0x60) >> 5) as usize];
    (delay, interval)
}

/// Map a PS/2 Set LEDs parameter to HID LEDs (unknown bits clear all LEDs)
pub const fn leds_to_hid(param: u8) -> KeyboardLeds {
    if param > 7 {
        KeyboardLeds::empty()
    } else {
        KeyboardLeds::from_bits_truncate(LED_TO_HID[param as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_codes() {
        assert_eq!(make_code(KeyCode::A.0), Some(0x1C));
        assert_eq!(make_code(KeyCode::Z.0), Some(0x1A));
        assert_eq!(make_code(KeyCode::ENTER.0), Some(0x5A));
        assert_eq!(make_code(KeyCode::F7.0), Some(0x83));
    }

    #[test]
    fn test_modifier_codes() {
        assert_eq!(make_code(KeyCode::LEFT_SHIFT.0), Some(0x12));
        assert_eq!(make_code(KeyCode::RIGHT_SHIFT.0), Some(0x59));
        assert_eq!(make_code(KeyCode::RIGHT_CTRL.0), Some(0x14));
        assert!(is_extended(KeyCode::RIGHT_CTRL.0));
        assert!(!is_extended(KeyCode::LEFT_CTRL.0));
        assert!(!is_extended(KeyCode::RIGHT_SHIFT.0));
        assert!(is_extended(KeyCode::LEFT_GUI.0));
    }

    #[test]
    fn test_extended_navigation_keys() {
        for key in KeyCode::INSERT.0..=KeyCode::UP_ARROW.0 {
            assert!(is_extended(key), "usage {:#04x}", key);
        }
        assert!(is_extended(KeyCode::KEYPAD_ENTER.0));
        assert!(!is_extended(KeyCode::ENTER.0));
        assert!(!is_extended(KeyCode::PAUSE.0));
    }

    #[test]
    fn test_untranslatable_keys() {
        assert_eq!(make_code(0x00), None);
        assert_eq!(make_code(0x03), None);
        assert_eq!(make_code(0x74), None);
        assert_eq!(make_code(0xE8), None);
    }

    #[test]
    fn test_typematic_decode() {
        assert_eq!(typematic(0x00), (250, 33_333));
        assert_eq!(typematic(0x2B), (500, 91_743));
        assert_eq!(typematic(0x7F), (1000, 500_000));
    }

    #[test]
    fn test_led_mapping() {
        // Caps Lock only: PS/2 bit 2 -> HID bit 1
        assert_eq!(leds_to_hid(0x04), KeyboardLeds::CAPS_LOCK);
        // Scroll Lock only: PS/2 bit 0 -> HID bit 2
        assert_eq!(leds_to_hid(0x01), KeyboardLeds::SCROLL_LOCK);
        assert_eq!(leds_to_hid(0x02).bits(), 0x01);
        assert_eq!(leds_to_hid(0x07), KeyboardLeds::all());
        assert_eq!(leds_to_hid(0x08), KeyboardLeds::empty());
    }
}
