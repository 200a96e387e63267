//! PS/2 physical layer boundary
//!
//! The waveform generator that clocks frames onto the wire lives outside this
//! crate (a PIO program on the RP2040). It talks to the transceiver through
//! [`Ps2Phy`]. [`SharedLink`] is the usual implementation: a small block of
//! state shared between the poll loop and the serializer's interrupt handler,
//! every access wrapped in a short critical section so the interrupt side
//! never blocks.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

use crate::config::RX_FRAME_DEPTH;
use crate::ps2::frame::Frame;

/// Transceiver view of one PS/2 port's physical layer
pub trait Ps2Phy {
    /// Check if a frame is waiting to be clocked out or is on the wire
    fn is_busy(&self) -> bool;

    /// Check if both CLOCK and DATA read high (bus idle, host not inhibiting)
    fn lines_idle(&self) -> bool;

    /// Hand one 11-bit frame to the serializer
    fn put_frame(&mut self, frame: Frame);

    /// Take back a frame the serializer has not started shifting yet
    fn withdraw_frame(&mut self) -> Option<Frame>;

    /// Read and clear the transmit-failure latch
    fn take_tx_failure(&mut self) -> bool;

    /// Pop a frame captured from the host (9 bits: data, then parity)
    fn take_rx_frame(&mut self) -> Option<Frame>;
}

/// Physical layer state shared with the serializer interrupt
#[derive(Debug)]
struct LinkState {
    outgoing: Option<Frame>,
    transmitting: bool,
    tx_failed: bool,
    clock_high: bool,
    data_high: bool,
    received: Deque<Frame, RX_FRAME_DEPTH>,
    rx_overruns: u32,
}

impl LinkState {
    const fn new() -> Self {
        Self {
            outgoing: None,
            transmitting: false,
            tx_failed: false,
            clock_high: true,
            data_high: true,
            received: Deque::new(),
            rx_overruns: 0,
        }
    }
}

/// Interrupt-shareable PS/2 link
///
/// The poll loop uses it through [`Ps2Phy`] (implemented for `&SharedLink`);
/// the serializer interrupt uses the inherent methods below. A `static`
/// instance per port is the intended use:
///
/// ```
/// use hid2ps2::ps2::SharedLink;
///
/// static KEYBOARD_LINK: SharedLink = SharedLink::new();
/// ```
pub struct SharedLink {
    state: Mutex<RefCell<LinkState>>,
}

impl SharedLink {
    /// Create an idle link
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(LinkState::new())),
        }
    }

    /// Serializer side: take the frame the transceiver wants clocked out
    ///
    /// The link stays busy until [`SharedLink::tx_complete`] or
    /// [`SharedLink::tx_aborted`] is called.
    pub fn take_outgoing(&self) -> Option<Frame> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            let frame = state.outgoing.take();
            if frame.is_some() {
                state.transmitting = true;
            }
            frame
        })
    }

    /// Serializer side: the host clocked in the whole frame
    pub fn tx_complete(&self) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).transmitting = false;
        });
    }

    /// Serializer side: the host pulled CLOCK low mid-frame
    pub fn tx_aborted(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.transmitting = false;
            state.tx_failed = true;
        });
    }

    /// Deserializer side: a host-to-device frame was captured
    ///
    /// Returns false (and counts an overrun) if the poll loop has fallen
    /// behind and the capture buffer is full.
    pub fn push_received(&self, frame: Frame) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.received.push_back(frame).is_err() {
                state.rx_overruns = state.rx_overruns.wrapping_add(1);
                return false;
            }
            true
        })
    }

    /// Record the current CLOCK and DATA line levels
    pub fn set_lines(&self, clock_high: bool, data_high: bool) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.clock_high = clock_high;
            state.data_high = data_high;
        });
    }

    /// Get number of host frames lost to a full capture buffer
    pub fn rx_overruns(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).rx_overruns)
    }
}

impl Default for SharedLink {
    fn default() -> Self {
        Self::new()
    }
}

impl Ps2Phy for &SharedLink {
    fn is_busy(&self) -> bool {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            state.outgoing.is_some() || state.transmitting
        })
    }

    fn lines_idle(&self) -> bool {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            state.clock_high && state.data_high
        })
    }

    fn put_frame(&mut self, frame: Frame) {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).outgoing = Some(frame);
        });
    }

    fn withdraw_frame(&mut self) -> Option<Frame> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).outgoing.take())
    }

    fn take_tx_failure(&mut self) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            core::mem::replace(&mut state.tx_failed, false)
        })
    }

    fn take_rx_frame(&mut self) -> Option<Frame> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).received.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ps2::frame::encode_frame;

    #[test]
    fn test_outgoing_frame_handoff() {
        let link = SharedLink::new();
        let mut phy = &link;
        assert!(!phy.is_busy());

        phy.put_frame(encode_frame(0xFA));
        assert!(phy.is_busy());

        assert_eq!(link.take_outgoing(), Some(encode_frame(0xFA)));
        assert!(phy.is_busy());
        link.tx_complete();
        assert!(!phy.is_busy());
        assert_eq!(link.take_outgoing(), None);
    }

    #[test]
    fn test_withdraw_only_before_pickup() {
        let link = SharedLink::new();
        let mut phy = &link;

        phy.put_frame(encode_frame(0x12));
        assert_eq!(phy.withdraw_frame(), Some(encode_frame(0x12)));
        assert!(!phy.is_busy());

        phy.put_frame(encode_frame(0x34));
        assert_eq!(link.take_outgoing(), Some(encode_frame(0x34)));
        assert_eq!(phy.withdraw_frame(), None);
        assert!(phy.is_busy());
    }

    #[test]
    fn test_tx_failure_latch_clears_on_read() {
        let link = SharedLink::new();
        let mut phy = &link;
        link.tx_aborted();
        assert!(phy.take_tx_failure());
        assert!(!phy.take_tx_failure());
    }

    #[test]
    fn test_line_levels() {
        let link = SharedLink::new();
        let phy = &link;
        assert!(phy.lines_idle());
        link.set_lines(false, true);
        assert!(!phy.lines_idle());
    }

    #[test]
    fn test_rx_overrun_counted() {
        let link = SharedLink::new();
        for _ in 0..RX_FRAME_DEPTH {
            assert!(link.push_received(Frame(0x1ED)));
        }
        assert!(!link.push_received(Frame(0x1ED)));
        assert_eq!(link.rx_overruns(), 1);

        let mut phy = &link;
        assert_eq!(phy.take_rx_frame(), Some(Frame(0x1ED)));
    }
}
