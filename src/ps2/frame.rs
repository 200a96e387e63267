//! PS/2 bit frame codec
//!
//! A PS/2 frame is 11 bits, transmitted LSB first:
//!
//! | Bit  | Meaning                                  |
//! |------|------------------------------------------|
//! | 0    | Start bit (always 0)                     |
//! | 1-8  | Data byte, LSB first                     |
//! | 9    | Odd parity over the data bits            |
//! | 10   | Stop bit (always 1)                      |
//!
//! [`decode_frame`] takes a whole 11-bit frame. Host-to-device frames are
//! captured by the physical layer without the start bit and stop bit; those
//! 9-bit captures (data in bits 0-7, parity in bit 8) go through
//! [`decode_capture`].

/// Raw PS/2 frame word as exchanged with the physical layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame(pub u16);

impl Frame {
    /// Get raw frame bits
    pub const fn bits(self) -> u16 {
        self.0
    }
}

/// Data byte and parity check result of a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decoded {
    /// Data byte
    pub byte: u8,
    /// Whether the parity bit matched the data
    pub parity_ok: bool,
}

const STOP_BIT: u16 = 1 << 10;

/// Odd parity bit for `byte`: 1 when the data has an even number of set bits
#[inline]
pub const fn odd_parity(byte: u8) -> u8 {
    ((byte.count_ones() & 1) ^ 1) as u8
}

/// Build the 11-bit transmit frame for `byte`
pub const fn encode_frame(byte: u8) -> Frame {
    Frame(STOP_BIT | (odd_parity(byte) as u16) << 9 | (byte as u16) << 1)
}

/// Split an 11-bit frame into its data byte and parity check
///
/// Start and stop bits are not checked; the serializer owns line timing.
pub const fn decode_frame(frame: Frame) -> Decoded {
    decode_capture(strip_framing(frame))
}

/// Split a received 9-bit capture (data in bits 0-7, parity in bit 8)
pub const fn decode_capture(capture: Frame) -> Decoded {
    let byte = (capture.0 & 0xFF) as u8;
    let parity = ((capture.0 >> 8) & 1) as u8;
    Decoded {
        byte,
        parity_ok: parity == odd_parity(byte),
    }
}

/// Strip start and stop bits from a full 11-bit frame, yielding the 9-bit
/// capture format [`decode_capture`] expects
pub const fn strip_framing(frame: Frame) -> Frame {
    Frame((frame.0 >> 1) & 0x1FF)
}
