//! PS/2 port: one transceiver driving one emulated device

use crate::ps2::phy::Ps2Phy;
use crate::ps2::transceiver::{PacketQueue, Transceiver};
use crate::stats::PortSnapshot;
use crate::timer::Instant;

/// Device-side protocol engine attached to a PS/2 port
pub trait Ps2Device {
    /// Handle one good host byte; `previous` is the host byte before it
    fn host_byte(&mut self, byte: u8, previous: u8, now: Instant, tx: &mut PacketQueue);

    /// Run deadline-driven work
    ///
    /// `link_busy` is true while the physical layer is still shifting a
    /// frame.
    fn service(&mut self, now: Instant, tx: &mut PacketQueue, link_busy: bool);
}

/// One PS/2 port
pub struct Ps2Port<P: Ps2Phy, D: Ps2Device> {
    transceiver: Transceiver<P>,
    device: D,
}

impl<P: Ps2Phy, D: Ps2Device> Ps2Port<P, D> {
    /// Attach `device` to the link behind `phy`
    pub fn new(phy: P, device: D) -> Self {
        Self {
            transceiver: Transceiver::new(phy),
            device,
        }
    }

    /// Run one port cycle: line handling first, then timed device work
    pub fn poll(&mut self, now: Instant) {
        let device = &mut self.device;
        self.transceiver
            .poll(&mut |byte: u8, previous: u8, tx: &mut PacketQueue| {
                device.host_byte(byte, previous, now, tx)
            });

        let busy = self.transceiver.is_busy();
        self.device
            .service(now, self.transceiver.queue_mut(), busy);
    }

    /// Get the emulated device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get the emulated device together with the outbound queue
    ///
    /// This is how USB-side events reach the engine between polls.
    pub fn split(&mut self) -> (&mut D, &mut PacketQueue) {
        (&mut self.device, self.transceiver.queue_mut())
    }

    /// Get the transceiver
    pub fn transceiver(&self) -> &Transceiver<P> {
        &self.transceiver
    }

    /// Get diagnostic counters
    pub fn snapshot(&mut self) -> PortSnapshot {
        self.transceiver.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ps2::frame::{decode_frame, encode_frame, strip_framing};
    use crate::ps2::keyboard::KeyboardEngine;
    use crate::ps2::SharedLink;
    use std::vec::Vec;

    /// Poll for `ms` milliseconds at 100 µs steps, acting as a serializer
    /// that needs one step to shift a frame
    fn run(
        port: &mut Ps2Port<&SharedLink, KeyboardEngine>,
        link: &SharedLink,
        from_ms: u64,
        ms: u64,
    ) -> Vec<u8> {
        let mut out = Vec::new();
        let mut in_flight = false;
        for step in 0..ms * 10 {
            port.poll(Instant::from_ticks(from_ms * 1_000 + step * 100));
            if in_flight {
                link.tx_complete();
                in_flight = false;
            } else if let Some(frame) = link.take_outgoing() {
                out.push(decode_frame(frame).byte);
                in_flight = true;
            }
        }
        out
    }

    #[test]
    fn test_keyboard_port_power_on() {
        let link = SharedLink::new();
        let mut port = Ps2Port::new(&link, KeyboardEngine::new());
        port.split().0.power_on(Instant::from_ticks(0));

        assert_eq!(run(&mut port, &link, 0, 600), [0xAA]);
    }

    #[test]
    fn test_host_command_reaches_device() {
        let link = SharedLink::new();
        let mut port = Ps2Port::new(&link, KeyboardEngine::new());

        link.push_received(strip_framing(encode_frame(0xF2)));
        assert_eq!(run(&mut port, &link, 0, 10), [0xFA, 0xAB, 0x83]);
    }
}
