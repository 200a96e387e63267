//! PS/2 keyboard protocol engine
//!
//! Turns HID key transitions into Scan Code Set 2 make/break sequences and
//! answers the host's keyboard command set. All output goes into the port's
//! [`PacketQueue`]; delayed work (typematic repeat, the self-test reply after
//! a reset) is driven by [`KeyboardEngine::service`].
//!
//! # States
//!
//! ```text
//!            0xF5              0xFF
//! Scanning ---------> Disabled ----> Self-test (500 ms) --0xAA--> Scanning
//!     ^                   |
//!     +------ 0xF4 -------+
//! ```

use crate::config::{KEYBOARD_DEFAULT_DELAY, KEYBOARD_DEFAULT_INTERVAL, KEYBOARD_SELF_TEST_DELAY};
use crate::hid::keyboard::{KeyCode, KeyModifiers, KeyboardLeds};
use crate::ps2::port::Ps2Device;
use crate::ps2::scancode::{self, BREAK_PREFIX, BREAK_SEQUENCE, EXTENDED_PREFIX, PAUSE_SEQUENCE};
use crate::ps2::transceiver::{Packet, PacketQueue};
use crate::ps2::{ACK, ECHO, SELF_TEST_PASSED};
use crate::timer::{Duration, Instant, Timer};

/// Keyboard host commands
pub mod command {
    /// Set LEDs, followed by an LED bitmap
    pub const SET_LEDS: u8 = 0xED;
    /// Echo
    pub const ECHO: u8 = 0xEE;
    /// Get/set scan code set, followed by a set number (0 = get)
    pub const SCAN_CODE_SET: u8 = 0xF0;
    /// Identify keyboard
    pub const IDENTIFY: u8 = 0xF2;
    /// Set typematic rate and delay, followed by the encoded parameter
    pub const SET_TYPEMATIC: u8 = 0xF3;
    /// Enable scanning
    pub const ENABLE: u8 = 0xF4;
    /// Disable scanning and restore defaults
    pub const DISABLE: u8 = 0xF5;
    /// Restore defaults
    pub const SET_DEFAULTS: u8 = 0xF6;
    /// Reset and run the self test
    pub const RESET: u8 = 0xFF;
}

/// Reply to Identify: ACK then the MF2 keyboard ID
pub const IDENTIFY_REPLY: [u8; 3] = [ACK, 0xAB, 0x83];

/// PS/2 keyboard state machine
#[derive(Debug)]
pub struct KeyboardEngine {
    enabled: bool,
    modifiers: KeyModifiers,
    /// Key currently auto-repeating (0 = none)
    repeat_key: u8,
    delay: Duration,
    interval: Duration,
    repeat_timer: Timer,
    self_test_timer: Timer,
    leds: KeyboardLeds,
    led_update: bool,
}

impl KeyboardEngine {
    /// Create an engine in its power-on state
    pub const fn new() -> Self {
        Self {
            enabled: true,
            modifiers: KeyModifiers::empty(),
            repeat_key: 0,
            delay: KEYBOARD_DEFAULT_DELAY,
            interval: KEYBOARD_DEFAULT_INTERVAL,
            repeat_timer: Timer::new(),
            self_test_timer: Timer::new(),
            leds: KeyboardLeds::empty(),
            led_update: false,
        }
    }

    /// Start the power-on self test; 0xAA follows after the test delay
    pub fn power_on(&mut self, now: Instant) {
        self.self_test_timer.start(now, KEYBOARD_SELF_TEST_DELAY);
    }

    /// Check if scanning is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get currently held modifiers
    pub fn modifiers(&self) -> KeyModifiers {
        self.modifiers
    }

    /// Get the auto-repeating key, if any
    pub fn repeat_key(&self) -> Option<u8> {
        (self.repeat_key != 0).then_some(self.repeat_key)
    }

    /// Get typematic delay
    pub fn typematic_delay(&self) -> Duration {
        self.delay
    }

    /// Get typematic interval
    pub fn typematic_interval(&self) -> Duration {
        self.interval
    }

    /// Get LED state
    pub fn leds(&self) -> KeyboardLeds {
        self.leds
    }

    /// Take the LED state if it changed since the last call
    ///
    /// The bridge forwards this to USB keyboards as an Output report.
    pub fn take_led_update(&mut self) -> Option<KeyboardLeds> {
        core::mem::replace(&mut self.led_update, false).then_some(self.leds)
    }

    fn set_leds(&mut self, ps2_leds: u8) {
        self.leds = scancode::leds_to_hid(ps2_leds);
        self.led_update = true;
    }

    fn restore_defaults(&mut self) {
        self.delay = KEYBOARD_DEFAULT_DELAY;
        self.interval = KEYBOARD_DEFAULT_INTERVAL;
    }

    fn stop_repeat(&mut self) {
        self.repeat_key = 0;
        self.repeat_timer.cancel();
    }

    /// Translate one HID key transition
    ///
    /// Modifier state is tracked even while scanning is disabled so that a
    /// later Ctrl+Pause is recognized correctly.
    pub fn key_transition(&mut self, key: u8, pressed: bool, now: Instant, tx: &mut PacketQueue) {
        if scancode::is_modifier(key) {
            let bit = KeyModifiers::from_bits_truncate(1 << (key - KeyCode::LEFT_CTRL.0));
            self.modifiers.set(bit, pressed);
        } else if !scancode::is_translatable(key) {
            return;
        }

        if !self.enabled {
            #[cfg(feature = "defmt")]
            defmt::debug!("Keyboard disabled, key {=u8:#x} ignored", key);
            return;
        }

        if key == KeyCode::PAUSE.0 {
            self.stop_repeat();
            if pressed {
                if self.modifiers.ctrl() {
                    tx.enqueue(&BREAK_SEQUENCE);
                } else {
                    tx.enqueue(&PAUSE_SEQUENCE);
                }
            }
            return;
        }

        let Some(code) = scancode::make_code(key) else {
            return;
        };

        let mut packet = Packet::new();
        if scancode::is_extended(key) {
            let _ = packet.push(EXTENDED_PREFIX);
        }

        if pressed {
            self.repeat_key = key;
            self.repeat_timer.start(now, self.delay);
        } else {
            if key == self.repeat_key {
                self.stop_repeat();
            }
            let _ = packet.push(BREAK_PREFIX);
        }
        let _ = packet.push(code);

        #[cfg(feature = "defmt")]
        defmt::debug!("Key {=u8:#x} pressed={}: {=[u8]:#x}", key, pressed, packet.as_slice());
        tx.enqueue(&packet);
    }

    /// Handle a byte from the host
    pub fn host_byte(&mut self, byte: u8, previous: u8, now: Instant, tx: &mut PacketQueue) {
        match previous {
            command::SET_LEDS => {
                self.set_leds(byte);
            }
            // Hardwired to set 2; the parameter is only acknowledged
            command::SCAN_CODE_SET => {}
            command::SET_TYPEMATIC => {
                let (delay_ms, interval_us) = scancode::typematic(byte);
                self.delay = Duration::millis(delay_ms as u64);
                self.interval = Duration::micros(interval_us as u64);
                #[cfg(feature = "defmt")]
                defmt::debug!("Typematic delay {} ms, interval {} us", delay_ms, interval_us);
            }
            _ => match byte {
                command::RESET => {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Keyboard reset");
                    self.enabled = false;
                    self.stop_repeat();
                    self.restore_defaults();
                    self.set_leds(0x07);
                    self.self_test_timer.start(now, KEYBOARD_SELF_TEST_DELAY);
                }
                command::ECHO => {
                    tx.enqueue(&[ECHO]);
                    return;
                }
                command::IDENTIFY => {
                    tx.enqueue(&IDENTIFY_REPLY);
                    return;
                }
                command::ENABLE => {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Keyboard scanning enabled");
                    self.enabled = true;
                }
                command::DISABLE => {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Keyboard scanning disabled");
                    self.enabled = false;
                    self.stop_repeat();
                    self.restore_defaults();
                    self.set_leds(0);
                }
                command::SET_DEFAULTS => {
                    self.restore_defaults();
                    self.set_leds(0);
                }
                // SET_LEDS, SCAN_CODE_SET, SET_TYPEMATIC and anything unknown
                _ => {}
            },
        }

        tx.enqueue(&[ACK]);
    }

    /// Run timed work: the self-test reply and typematic repeat
    pub fn service(&mut self, now: Instant, tx: &mut PacketQueue) {
        if self.self_test_timer.expired(now) {
            self.set_leds(0);
            tx.enqueue(&[SELF_TEST_PASSED]);
            self.enabled = true;
            #[cfg(feature = "defmt")]
            defmt::info!("Keyboard self test passed");
        }

        if self.repeat_timer.expired_periodic(now, self.interval) {
            if self.repeat_key == 0 {
                self.repeat_timer.cancel();
            } else if self.enabled {
                if let Some(code) = scancode::make_code(self.repeat_key) {
                    if scancode::is_extended(self.repeat_key) {
                        tx.enqueue(&[EXTENDED_PREFIX, code]);
                    } else {
                        tx.enqueue(&[code]);
                    }
                }
            }
        }
    }
}

impl Default for KeyboardEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Ps2Device for KeyboardEngine {
    fn host_byte(&mut self, byte: u8, previous: u8, now: Instant, tx: &mut PacketQueue) {
        KeyboardEngine::host_byte(self, byte, previous, now, tx)
    }

    fn service(&mut self, now: Instant, tx: &mut PacketQueue, _link_busy: bool) {
        KeyboardEngine::service(self, now, tx)
    }
}
