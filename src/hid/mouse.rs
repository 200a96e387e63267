//! HID mouse support
//!
//! Boot protocol layout (USB HID Spec 1.11, Appendix B.2) plus decoding of
//! descriptor-defined mouse reports into the same shape.

use bitflags::bitflags;

use super::constants::{usage, usage_page};
use super::report_descriptor::{extract_field, ReportDescriptor};
use crate::error::{Error, Result};

/// One mouse report, whatever layout it arrived in
///
/// Boot reports are 3 bytes (buttons, X, Y), often with a fourth wheel byte.
/// Descriptor-defined mice may use wider axes, hence `i16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseReport {
    /// Button states
    pub buttons: MouseButtons,
    /// X displacement (relative movement)
    pub x: i16,
    /// Y displacement (relative movement, positive = down)
    pub y: i16,
    /// Scroll wheel displacement (positive = away from the user)
    pub wheel: i8,
}

impl MouseReport {
    /// Minimum boot report length
    pub const BOOT_LEN: usize = 3;

    /// Parse a boot protocol report
    ///
    /// # Example
    ///
    /// ```
    /// use hid2ps2::hid::MouseReport;
    ///
    /// let report = MouseReport::parse(&[0x01, 0x05, 0xFB, 0x00])?;
    /// // Left button pressed, moved right 5 and up 5
    /// assert!(report.buttons.left());
    /// assert_eq!((report.x, report.y), (5, -5));
    /// # Ok::<(), hid2ps2::Error>(())
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::BOOT_LEN {
            return Err(Error::ReportTooShort);
        }

        Ok(Self {
            buttons: MouseButtons::from_bits_truncate(data[0]),
            x: data[1] as i8 as i16,
            y: data[2] as i8 as i16,
            wheel: data.get(3).map_or(0, |&w| w as i8),
        })
    }

    /// Decode a report laid out by a report descriptor
    ///
    /// `payload` excludes the Report ID prefix. Buttons 1 to 8 come from the
    /// Button page; axes wider than the report type saturate.
    pub fn from_descriptor(report: &ReportDescriptor, payload: &[u8]) -> Self {
        let mut decoded = Self::default();

        for field in report.input_fields().filter(|f| f.is_variable()) {
            let value = extract_field(field, payload);
            match (field.usage_page, field.usage) {
                (usage_page::BUTTON, button @ 1..=8) => {
                    if value != 0 {
                        decoded.buttons |= MouseButtons::from_bits_truncate(1u8 << (button - 1));
                    }
                }
                (usage_page::GENERIC_DESKTOP, usage::X) => decoded.x = saturate_i16(value),
                (usage_page::GENERIC_DESKTOP, usage::Y) => decoded.y = saturate_i16(value),
                (usage_page::GENERIC_DESKTOP, usage::WHEEL) => {
                    decoded.wheel = value.clamp(i8::MIN as i32, i8::MAX as i32) as i8
                }
                _ => {}
            }
        }

        decoded
    }

    /// Check if mouse moved
    pub fn has_movement(&self) -> bool {
        self.x != 0 || self.y != 0 || self.wheel != 0
    }

    /// Check if any button is pressed
    pub fn has_button_press(&self) -> bool {
        !self.buttons.is_empty()
    }
}

fn saturate_i16(value: i32) -> i16 {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

bitflags! {
    /// Mouse button states
    ///
    /// Standard buttons 1-3 are defined by the boot protocol.
    /// Buttons 4-5 reach the PS/2 host only in Explorer mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        /// Button 1 (left button)
        const LEFT   = 0b00000001;
        /// Button 2 (right button)
        const RIGHT  = 0b00000010;
        /// Button 3 (middle button / wheel click)
        const MIDDLE = 0b00000100;
        /// Button 4 (side button)
        const BUTTON_4 = 0b00001000;
        /// Button 5 (side button)
        const BUTTON_5 = 0b00010000;
        /// Button 6 (extra button)
        const BUTTON_6 = 0b00100000;
        /// Button 7 (extra button)
        const BUTTON_7 = 0b01000000;
        /// Button 8 (extra button)
        const BUTTON_8 = 0b10000000;
    }
}

impl MouseButtons {
    /// Check if left button is pressed
    pub fn left(&self) -> bool {
        self.contains(Self::LEFT)
    }

    /// Check if right button is pressed
    pub fn right(&self) -> bool {
        self.contains(Self::RIGHT)
    }

    /// Check if middle button is pressed
    pub fn middle(&self) -> bool {
        self.contains(Self::MIDDLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::report_descriptor::parse;

    #[test]
    fn test_boot_report() {
        let report = MouseReport::parse(&[0x03, 0x80, 0x7F]).unwrap();
        assert!(report.buttons.left() && report.buttons.right());
        assert!(!report.buttons.middle());
        assert_eq!((report.x, report.y, report.wheel), (-128, 127, 0));

        let report = MouseReport::parse(&[0x00, 0x00, 0x00, 0xFF]).unwrap();
        assert_eq!(report.wheel, -1);
        assert!(report.has_movement());
        assert!(!report.has_button_press());
    }

    #[test]
    fn test_short_report() {
        assert_eq!(MouseReport::parse(&[0x01, 0x02]), Err(Error::ReportTooShort));
    }

    #[test]
    fn test_descriptor_report() {
        // Five buttons, 16-bit X/Y, 8-bit wheel
        let descriptor = [
            0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0x05, 0x09, 0x19, 0x01, 0x29, 0x05, 0x15, 0x00,
            0x25, 0x01, 0x75, 0x01, 0x95, 0x05, 0x81, 0x02, 0x75, 0x03, 0x95, 0x01, 0x81, 0x03,
            0x05, 0x01, 0x09, 0x30, 0x09, 0x31, 0x16, 0x01, 0x80, 0x26, 0xFF, 0x7F, 0x75, 0x10,
            0x95, 0x02, 0x81, 0x06, 0x09, 0x38, 0x15, 0x81, 0x25, 0x7F, 0x75, 0x08, 0x95, 0x01,
            0x81, 0x06, 0xC0,
        ];
        let reports = parse(&descriptor).unwrap();

        let report =
            MouseReport::from_descriptor(&reports[0], &[0b1_0001, 0x2C, 0x01, 0xF6, 0xFF, 0x01]);
        assert_eq!(report.buttons, MouseButtons::LEFT | MouseButtons::BUTTON_5);
        assert_eq!((report.x, report.y, report.wheel), (300, -10, 1));
    }
}
