//! Shared test utilities for hid2ps2 tests
//!
//! [`Wire`] stands in for the PS/2 waveform generator: it clocks out one
//! frame per step (taking one step to finish it) and injects host frames.

#![allow(dead_code)]

use hid2ps2::ps2::frame::{decode_frame, encode_frame, strip_framing, Frame};
use hid2ps2::ps2::SharedLink;
use hid2ps2::timer::Instant;

/// Poll loop period used by the helpers, in microseconds
pub const STEP_US: u64 = 100;

/// Scripted serializer attached to one [`SharedLink`]
pub struct Wire<'a> {
    link: &'a SharedLink,
    in_flight: bool,
    sent: Vec<u8>,
}

impl<'a> Wire<'a> {
    pub fn new(link: &'a SharedLink) -> Self {
        Self {
            link,
            in_flight: false,
            sent: Vec::new(),
        }
    }

    /// Advance the serializer by one poll period
    pub fn step(&mut self) {
        if self.in_flight {
            self.link.tx_complete();
            self.in_flight = false;
        } else if let Some(frame) = self.link.take_outgoing() {
            let decoded = decode_frame(frame);
            assert!(decoded.parity_ok, "device sent a frame with bad parity");
            self.sent.push(decoded.byte);
            self.in_flight = true;
        }
    }

    /// Abort the frame currently being clocked out, as a host inhibit would
    pub fn abort(&mut self) {
        if self.in_flight {
            self.link.tx_aborted();
            self.in_flight = false;
        }
    }

    /// Host clocks in one byte
    pub fn host_send(&self, byte: u8) {
        assert!(self.link.push_received(strip_framing(encode_frame(byte))));
    }

    /// Host clocks in one byte with the parity bit flipped
    pub fn host_send_corrupted(&self, byte: u8) {
        let frame = strip_framing(encode_frame(byte));
        assert!(self.link.push_received(Frame(frame.bits() ^ 0x100)));
    }

    /// Bytes the device has sent so far, draining them
    pub fn take(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.sent)
    }
}

/// Microsecond instant
pub fn at(us: u64) -> Instant {
    Instant::from_ticks(us)
}

/// Run `poll` then one serializer step every [`STEP_US`] from `start_us`
/// for `ms` milliseconds; returns the time reached
pub fn run(start_us: u64, ms: u64, wires: &mut [&mut Wire<'_>], mut poll: impl FnMut(Instant)) -> u64 {
    let mut now = start_us;
    for _ in 0..ms * 1_000 / STEP_US {
        poll(at(now));
        for wire in wires.iter_mut() {
            wire.step();
        }
        now += STEP_US;
    }
    now
}
