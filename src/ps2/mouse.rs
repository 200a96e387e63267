//! PS/2 mouse protocol engine
//!
//! USB movement is accumulated between samples and emitted as PS/2 movement
//! packets at the host-selected sample rate while streaming is enabled. The
//! wheel extensions are negotiated the usual way: the host sends magic Set
//! Sample Rate sequences and then asks for the device ID.
//!
//! | Sequence      | Upgrade                          | Packet |
//! |---------------|----------------------------------|--------|
//! | 200, 100, 80  | Standard -> IntelliMouse (ID 3)  | 4 bytes, wheel |
//! | 200, 200, 80  | IntelliMouse -> Explorer (ID 4)  | 4 bytes, wheel + buttons 4/5 |

use crate::config::{
    MOUSE_DEFAULT_SAMPLE_RATE, MOUSE_RESET_DELAY, MOUSE_RESOLUTION, MOUSE_STREAM_START_DELAY,
};
use crate::ps2::port::Ps2Device;
use crate::ps2::transceiver::{Packet, PacketQueue};
use crate::ps2::{ACK, SELF_TEST_PASSED};
use crate::timer::{Duration, Instant, Timer};

/// Mouse host commands
pub mod command {
    /// Status request
    pub const STATUS_REQUEST: u8 = 0xE9;
    /// Read data
    pub const READ_DATA: u8 = 0xEB;
    /// Get device ID
    pub const GET_DEVICE_ID: u8 = 0xF2;
    /// Set sample rate, followed by the rate in Hz
    pub const SET_SAMPLE_RATE: u8 = 0xF3;
    /// Enable data reporting
    pub const ENABLE: u8 = 0xF4;
    /// Disable data reporting
    pub const DISABLE: u8 = 0xF5;
    /// Restore defaults
    pub const SET_DEFAULTS: u8 = 0xF6;
    /// Reset and run the self test
    pub const RESET: u8 = 0xFF;
}

/// Sample rate sequence that unlocks the IntelliMouse wheel (200, 100, 80)
pub const INTELLIMOUSE_MAGIC: u32 = 0xC8_64_50;

/// Sample rate sequence that unlocks the Explorer buttons (200, 200, 80)
pub const EXPLORER_MAGIC: u32 = 0xC8_C8_50;

/// Largest movement magnitude one packet carries
const MAX_DELTA: i16 = 255;

/// Mouse protocol extension level, numerically equal to the device ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProtocolLevel {
    /// Three buttons, X/Y
    Standard = 0x00,
    /// Adds the wheel
    IntelliMouse = 0x03,
    /// Adds buttons 4 and 5
    Explorer = 0x04,
}

impl ProtocolLevel {
    /// Device ID reported to the host
    pub const fn device_id(self) -> u8 {
        self as u8
    }

    /// Check if packets carry a fourth byte
    pub const fn has_wheel(self) -> bool {
        !matches!(self, Self::Standard)
    }
}

/// Clamp an accumulated delta to what one packet can carry
fn clamp_delta(value: i16) -> i16 {
    value.clamp(-MAX_DELTA, MAX_DELTA)
}

/// Movement left over after emitting a clamped delta
fn residual_delta(value: i16) -> i16 {
    value - clamp_delta(value)
}

/// PS/2 mouse state machine
#[derive(Debug)]
pub struct MouseEngine {
    streaming: bool,
    /// Set while movement is in progress so the first all-zero packet after
    /// motion is still sent
    moving: bool,
    magic: u32,
    level: ProtocolLevel,
    rate: u8,
    buttons: u8,
    dx: i16,
    dy: i16,
    dz: i8,
    reset_timer: Timer,
    sample_timer: Timer,
}

impl MouseEngine {
    /// Create an engine in its power-on state
    pub const fn new() -> Self {
        Self {
            streaming: false,
            moving: false,
            magic: 0,
            level: ProtocolLevel::Standard,
            rate: MOUSE_DEFAULT_SAMPLE_RATE,
            buttons: 0,
            dx: 0,
            dy: 0,
            dz: 0,
            reset_timer: Timer::new(),
            sample_timer: Timer::new(),
        }
    }

    /// Announce the device: self-test passed followed by the device ID
    pub fn power_on(&mut self, tx: &mut PacketQueue) {
        tx.enqueue(&[SELF_TEST_PASSED, self.level.device_id()]);
    }

    /// Check if data reporting is enabled
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Get negotiated protocol level
    pub fn level(&self) -> ProtocolLevel {
        self.level
    }

    /// Get sample rate in Hz as last set by the host
    pub fn sample_rate(&self) -> u8 {
        self.rate
    }

    /// Get pending (dx, dy, wheel) not yet emitted
    pub fn pending(&self) -> (i16, i16, i8) {
        (self.dx, self.dy, self.dz)
    }

    /// Interval between movement packets
    pub fn sample_period(&self) -> Duration {
        // A rate of 0 is nonsense from the host; treat it as 1 Hz
        Duration::micros(1_000_000 / self.rate.max(1) as u64)
    }

    /// Accumulate one USB movement report
    ///
    /// `dx` grows to the right and `dy` grows downwards, as in HID. Buttons
    /// are the HID button bitmap (bit 0 left, 1 right, 2 middle, 3 and 4 the
    /// side buttons).
    pub fn movement(&mut self, buttons: u8, dx: i16, dy: i16, wheel: i8) {
        self.buttons = buttons;
        self.dx = self.dx.saturating_add(dx);
        self.dy = self.dy.saturating_add(dy);
        self.dz = self.dz.saturating_add(wheel);
    }

    /// Let go of every button, as when the USB mouse holding them is
    /// unplugged. Pending movement is kept; the next sample reports the
    /// release.
    pub fn release_buttons(&mut self) {
        self.buttons = 0;
    }

    fn clear_motion(&mut self) {
        self.moving = false;
        self.buttons = 0;
        self.dx = 0;
        self.dy = 0;
        self.dz = 0;
    }

    /// Handle a byte from the host
    pub fn host_byte(&mut self, byte: u8, previous: u8, now: Instant, tx: &mut PacketQueue) {
        if previous == command::SET_SAMPLE_RATE {
            self.set_sample_rate(byte);
            self.clear_motion();
            tx.enqueue(&[ACK]);
            return;
        }

        match byte {
            command::RESET | command::SET_DEFAULTS | command::DISABLE => {
                if byte == command::RESET {
                    #[cfg(feature = "defmt")]
                    defmt::info!("Mouse reset");
                    self.level = ProtocolLevel::Standard;
                    self.reset_timer.start(now, MOUSE_RESET_DELAY);
                }
                if byte != command::DISABLE {
                    self.rate = MOUSE_DEFAULT_SAMPLE_RATE;
                }
                self.streaming = false;
                self.sample_timer.cancel();
                self.clear_motion();
            }
            command::ENABLE => {
                #[cfg(feature = "defmt")]
                defmt::info!("Mouse streaming enabled");
                self.streaming = true;
                self.clear_motion();
                self.sample_timer.start(now, MOUSE_STREAM_START_DELAY);
            }
            command::GET_DEVICE_ID => {
                tx.enqueue(&[ACK, self.level.device_id()]);
                self.clear_motion();
                return;
            }
            command::READ_DATA => {
                self.moving = true;
            }
            command::STATUS_REQUEST => {
                tx.enqueue(&[
                    ACK,
                    (self.streaming as u8) << 5,
                    MOUSE_RESOLUTION,
                    self.rate,
                ]);
                return;
            }
            _ => {
                self.clear_motion();
            }
        }

        tx.enqueue(&[ACK]);
    }

    fn set_sample_rate(&mut self, rate: u8) {
        self.rate = rate;
        self.magic = ((self.magic << 8) | rate as u32) & 0x00FF_FFFF;

        let upgrade = match (self.level, self.magic) {
            (ProtocolLevel::Standard, INTELLIMOUSE_MAGIC) => Some(ProtocolLevel::IntelliMouse),
            (ProtocolLevel::IntelliMouse, EXPLORER_MAGIC) => Some(ProtocolLevel::Explorer),
            _ => None,
        };

        if let Some(level) = upgrade {
            #[cfg(feature = "defmt")]
            defmt::info!("Mouse protocol upgraded to {}", level);
            self.level = level;
        }
    }

    /// Run timed work: the reset reply and the sample clock
    ///
    /// `link_busy` skips a sample while the port is still clocking out the
    /// previous one; movement keeps accumulating meanwhile.
    pub fn service(&mut self, now: Instant, tx: &mut PacketQueue, link_busy: bool) {
        if self.reset_timer.expired(now) {
            tx.enqueue(&[SELF_TEST_PASSED, self.level.device_id()]);
        }

        let period = self.sample_period();
        if !self.sample_timer.expired_periodic(now, period) {
            return;
        }
        if !self.streaming {
            self.sample_timer.cancel();
            return;
        }
        if link_busy {
            return;
        }

        if let Some(packet) = self.next_packet() {
            tx.enqueue(&packet);
        }
    }

    /// Build the next movement packet, consuming what it carries
    ///
    /// Returns `None` while the mouse is at rest.
    fn next_packet(&mut self) -> Option<Packet> {
        if self.buttons == 0 && self.dx == 0 && self.dy == 0 && self.dz == 0 {
            if !self.moving {
                return None;
            }
            self.moving = false;
        } else {
            self.moving = true;
        }

        let x = clamp_delta(self.dx);
        let y = clamp_delta(self.dy);

        let mut status = 0x08 | (self.buttons & 0x07);
        if self.dx < 0 {
            status |= 0x10;
        }
        // PS/2 Y grows upwards
        if self.dy > 0 {
            status |= 0x20;
        }

        let mut packet = Packet::new();
        let _ = packet.push(status);
        let _ = packet.push(avoid_self_test_byte(x as u8));
        let _ = packet.push(avoid_self_test_byte((-y) as u8));

        if self.level.has_wheel() {
            let mut wheel = (-(self.dz as i16)).clamp(-8, 7) as u8;
            if self.level == ProtocolLevel::Explorer {
                wheel = (wheel & 0x0F) | ((self.buttons << 1) & 0x30);
            }
            let _ = packet.push(wheel);
        }

        self.dx = residual_delta(self.dx);
        self.dy = residual_delta(self.dy);
        self.dz = 0;

        Some(packet)
    }
}

/// A movement byte of 0xAA right after a reset is indistinguishable from the
/// self-test reply, so it is nudged by one count
fn avoid_self_test_byte(byte: u8) -> u8 {
    if byte == SELF_TEST_PASSED {
        0xAB
    } else {
        byte
    }
}

impl Default for MouseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Ps2Device for MouseEngine {
    fn host_byte(&mut self, byte: u8, previous: u8, now: Instant, tx: &mut PacketQueue) {
        MouseEngine::host_byte(self, byte, previous, now, tx)
    }

    fn service(&mut self, now: Instant, tx: &mut PacketQueue, link_busy: bool) {
        MouseEngine::service(self, now, tx, link_busy)
    }
}
