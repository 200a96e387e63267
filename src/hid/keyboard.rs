//! HID keyboard support
//!
//! Boot Protocol keyboard reports (USB HID Spec 1.11, Appendix B.1) and the
//! key-state tracking that turns successive reports into key transitions.

use bitflags::bitflags;

use super::constants::usage_page;
use super::report_descriptor::{extract_field, ReportDescriptor};
use crate::error::{Error, Result};

/// HID keyboard report (boot protocol)
///
/// Standard 8-byte keyboard report format:
/// - Byte 0: Modifier keys (Ctrl, Alt, Shift, GUI)
/// - Byte 1: Reserved (OEM use)
/// - Bytes 2-7: Up to 6 simultaneous key presses
///
/// See USB HID Specification 1.11, Appendix B.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardReport {
    /// Modifier key states
    pub modifiers: KeyModifiers,
    /// Active keycodes (up to 6, 0 = empty slot)
    keycodes: [u8; 6],
}

impl KeyboardReport {
    /// Boot keyboard report length
    pub const LEN: usize = 8;

    /// Parse report from raw data
    ///
    /// # Example
    ///
    /// ```
    /// use hid2ps2::hid::{KeyCode, KeyboardReport};
    ///
    /// let data: [u8; 8] = [0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00];
    /// let report = KeyboardReport::parse(&data)?;
    /// assert!(report.modifiers.shift());
    /// assert!(report.is_key_pressed(KeyCode::A));
    /// # Ok::<(), hid2ps2::Error>(())
    /// ```
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LEN {
            return Err(Error::ReportTooShort);
        }

        Ok(Self {
            modifiers: KeyModifiers::from_bits_truncate(data[0]),
            keycodes: [data[2], data[3], data[4], data[5], data[6], data[7]],
        })
    }

    /// Raw keycode slots
    pub fn keycodes(&self) -> &[u8; 6] {
        &self.keycodes
    }

    /// Get iterator over pressed keys
    pub fn keys_pressed(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.keycodes
            .iter()
            .filter(|&&code| code != 0) // 0x00 = no key
            .map(|&code| KeyCode(code))
    }

    /// Check if specific key is pressed
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keycodes.contains(&key.0)
    }

    /// Check if the keyboard reported too many keys at once (phantom state)
    pub fn is_rollover(&self) -> bool {
        self.keycodes.contains(&KeyCode::ERROR_ROLL_OVER.0)
    }
}

bitflags! {
    /// Keyboard modifier keys
    ///
    /// Bit `n` corresponds to HID usage `0xE0 + n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyModifiers: u8 {
        /// Left Control
        const LEFT_CTRL  = 0b00000001;
        /// Left Shift
        const LEFT_SHIFT = 0b00000010;
        /// Left Alt
        const LEFT_ALT   = 0b00000100;
        /// Left GUI (Windows/Command key)
        const LEFT_GUI   = 0b00001000;
        /// Right Control
        const RIGHT_CTRL  = 0b00010000;
        /// Right Shift
        const RIGHT_SHIFT = 0b00100000;
        /// Right Alt
        const RIGHT_ALT   = 0b01000000;
        /// Right GUI (Windows/Command key)
        const RIGHT_GUI   = 0b10000000;
    }
}

impl KeyModifiers {
    /// Check if any Ctrl key is pressed
    pub fn ctrl(&self) -> bool {
        self.intersects(Self::LEFT_CTRL | Self::RIGHT_CTRL)
    }

    /// Check if any Shift key is pressed
    pub fn shift(&self) -> bool {
        self.intersects(Self::LEFT_SHIFT | Self::RIGHT_SHIFT)
    }

    /// Check if any Alt key is pressed
    pub fn alt(&self) -> bool {
        self.intersects(Self::LEFT_ALT | Self::RIGHT_ALT)
    }

    /// Check if any GUI key is pressed
    pub fn gui(&self) -> bool {
        self.intersects(Self::LEFT_GUI | Self::RIGHT_GUI)
    }
}

bitflags! {
    /// Keyboard LED Output report bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyboardLeds: u8 {
        /// Num Lock
        const NUM_LOCK    = 0b00000001;
        /// Caps Lock
        const CAPS_LOCK   = 0b00000010;
        /// Scroll Lock
        const SCROLL_LOCK = 0b00000100;
    }
}

/// HID keyboard keycode
///
/// Standard USB HID keyboard scancodes (Usage Page 0x07).
/// See HID Usage Tables 1.12, Section 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyCode(pub u8);

impl KeyCode {
    /// Too many keys held for the report to describe
    pub const ERROR_ROLL_OVER: Self = Self(0x01);

    // Keys the translation tables and their tests single out. Any other
    // usage is just `KeyCode(usage)`.
    pub const A: Self = Self(0x04);
    pub const B: Self = Self(0x05);
    pub const C: Self = Self(0x06);
    pub const Z: Self = Self(0x1D);
    pub const ENTER: Self = Self(0x28);
    pub const F7: Self = Self(0x40);
    pub const F12: Self = Self(0x45);
    pub const F24: Self = Self(0x73);
    pub const PRINT_SCREEN: Self = Self(0x46);
    pub const PAUSE: Self = Self(0x48);
    pub const INSERT: Self = Self(0x49);
    pub const LEFT_ARROW: Self = Self(0x50);
    pub const UP_ARROW: Self = Self(0x52);
    pub const KEYPAD_DIVIDE: Self = Self(0x54);
    pub const KEYPAD_ENTER: Self = Self(0x58);
    pub const APPLICATION: Self = Self(0x65);
    pub const POWER: Self = Self(0x66);

    // Modifiers (0xE0-0xE7)
    pub const LEFT_CTRL: Self = Self(0xE0);
    pub const LEFT_SHIFT: Self = Self(0xE1);
    pub const LEFT_ALT: Self = Self(0xE2);
    pub const LEFT_GUI: Self = Self(0xE3);
    pub const RIGHT_CTRL: Self = Self(0xE4);
    pub const RIGHT_SHIFT: Self = Self(0xE5);
    pub const RIGHT_ALT: Self = Self(0xE6);
    pub const RIGHT_GUI: Self = Self(0xE7);

    /// Check if this is one of the eight modifier usages
    pub fn is_modifier(&self) -> bool {
        (Self::LEFT_CTRL.0..=Self::RIGHT_GUI.0).contains(&self.0)
    }
}

/// Number of usages an NKRO bitmap covers
pub const NKRO_KEYS: usize = 128;

/// Keys held according to one report
///
/// Boot keyboards fill `modifiers` and `keys`; NKRO keyboards report a bit per
/// usage, which lands in `bitmap`. Descriptor-driven keyboards may use any
/// mix of the three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeySnapshot {
    /// Modifier byte (bit `n` = usage `0xE0 + n`)
    pub modifiers: u8,
    /// Array-reported keys, 0 = empty slot
    pub keys: [u8; 6],
    /// Bitmap-reported keys, bit `n` = usage `n`
    pub bitmap: [u8; NKRO_KEYS / 8],
}

impl KeySnapshot {
    /// Snapshot of a boot protocol report
    pub fn from_boot(report: &KeyboardReport) -> Self {
        Self {
            modifiers: report.modifiers.bits(),
            keys: report.keycodes,
            bitmap: [0; NKRO_KEYS / 8],
        }
    }

    /// Record an array-reported key; ignored once all six slots are used
    pub fn press_array(&mut self, usage: u8) {
        if usage == 0 || self.keys.contains(&usage) {
            return;
        }
        if let Some(slot) = self.keys.iter_mut().find(|slot| **slot == 0) {
            *slot = usage;
        }
    }

    /// Record a bitmap-reported key (or a modifier, whichever it is)
    pub fn press_bitmap(&mut self, usage: u8) {
        if KeyCode(usage).is_modifier() {
            self.modifiers |= 1 << (usage - KeyCode::LEFT_CTRL.0);
        } else if (usage as usize) < NKRO_KEYS {
            self.bitmap[usage as usize / 8] |= 1 << (usage % 8);
        }
    }

    /// Snapshot of a report laid out by a report descriptor
    ///
    /// `payload` excludes the Report ID prefix. Variable fields on the
    /// keyboard page are bitmap keys; array fields carry usage indices.
    pub fn from_descriptor(report: &ReportDescriptor, payload: &[u8]) -> Self {
        let mut snapshot = Self::default();

        for field in report
            .input_fields()
            .filter(|f| f.usage_page == usage_page::KEYBOARD)
        {
            if field.is_variable() {
                for usage in field.bitmap_usages(payload) {
                    if let Ok(usage @ 1..=0xFF) = u8::try_from(usage) {
                        snapshot.press_bitmap(usage);
                    }
                }
                continue;
            }

            match field.array_usage(extract_field(field, payload)) {
                Some(usage @ 1..=0xFF) if KeyCode(usage as u8).is_modifier() => {
                    snapshot.press_bitmap(usage as u8)
                }
                Some(usage @ 1..=0xFF) => snapshot.press_array(usage as u8),
                _ => {}
            }
        }

        snapshot
    }

    fn in_bitmap(&self, usage: u8) -> bool {
        (usage as usize) < NKRO_KEYS && self.bitmap[usage as usize / 8] & (1 << (usage % 8)) != 0
    }

    /// Check if a non-modifier key is held
    pub fn is_held(&self, usage: u8) -> bool {
        usage != 0 && (self.keys.contains(&usage) || self.in_bitmap(usage))
    }

    fn bitmap_keys(&self) -> impl Iterator<Item = u8> + '_ {
        (0..NKRO_KEYS as u8).filter(move |&usage| self.in_bitmap(usage))
    }

    fn has_rollover(&self) -> bool {
        self.keys.contains(&KeyCode::ERROR_ROLL_OVER.0)
    }
}

/// Last reported key state of one keyboard interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    held: KeySnapshot,
}

impl KeyState {
    /// Create with nothing held
    pub const fn new() -> Self {
        Self {
            held: KeySnapshot {
                modifiers: 0,
                keys: [0; 6],
                bitmap: [0; NKRO_KEYS / 8],
            },
        }
    }

    /// Currently held keys
    pub fn held(&self) -> &KeySnapshot {
        &self.held
    }

    /// Diff `next` against the held keys and report every transition
    ///
    /// Order: modifier changes (bit 0 to 7), then releases, then presses.
    /// Identical snapshots report nothing. A rollover report (all slots
    /// 0x01) only updates the modifiers; the keys stay as last seen.
    pub fn update(&mut self, mut next: KeySnapshot, mut emit: impl FnMut(u8, bool)) {
        if next.has_rollover() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Keyboard rollover, key state kept");
            next.keys = self.held.keys;
            next.bitmap = self.held.bitmap;
        }

        let prev = self.held;

        let changed = prev.modifiers ^ next.modifiers;
        for bit in 0..8u8 {
            if changed & (1 << bit) != 0 {
                emit(KeyCode::LEFT_CTRL.0 + bit, next.modifiers & (1 << bit) != 0);
            }
        }

        for &key in prev.keys.iter() {
            if key != 0 && !next.is_held(key) {
                emit(key, false);
            }
        }
        for key in prev.bitmap_keys() {
            if !prev.keys.contains(&key) && !next.is_held(key) {
                emit(key, false);
            }
        }

        for &key in next.keys.iter() {
            if key != 0 && !prev.is_held(key) {
                emit(key, true);
            }
        }
        for key in next.bitmap_keys() {
            if !next.keys.contains(&key) && !prev.is_held(key) {
                emit(key, true);
            }
        }

        self.held = next;
    }

    /// Release everything held (the keyboard went away)
    pub fn release_all(&mut self, emit: impl FnMut(u8, bool)) {
        self.update(KeySnapshot::default(), emit);
    }
}
