//! Half-duplex PS/2 transceiver
//!
//! One instance per port. Device-to-host traffic is queued as whole packets
//! (a scancode sequence, a mouse movement packet, a command reply) and clocked
//! out one byte per frame. Host-to-device bytes always win: a good host byte
//! flushes everything still queued before the protocol engine sees it.
//!
//! Nothing here blocks. [`Transceiver::poll`] does a bounded amount of work and
//! must be called at sub-millisecond cadence.

use heapless::{Deque, Vec};

use crate::config::{MAX_PACKET_LEN, PACKET_QUEUE_DEPTH, TX_BACKOFF_POLLS};
use crate::error::{Error, Result};
use crate::ps2::frame::{decode_capture, encode_frame, Decoded};
use crate::ps2::phy::Ps2Phy;
use crate::ps2::RESEND;
use crate::stats::{PortSnapshot, PortStats};

/// One device-to-host packet
pub type Packet = Vec<u8, MAX_PACKET_LEN>;

/// Bounded FIFO of outbound packets
///
/// Enqueueing never blocks; a full queue drops the new packet.
#[derive(Debug)]
pub struct PacketQueue {
    packets: Deque<Packet, PACKET_QUEUE_DEPTH>,
    dropped: u32,
}

impl PacketQueue {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            packets: Deque::new(),
            dropped: 0,
        }
    }

    /// Queue `bytes` as one packet
    ///
    /// Returns `Ok(false)` if the queue is full; the packet is dropped and
    /// counted. Packets longer than [`MAX_PACKET_LEN`] are refused with
    /// [`Error::PacketTooLong`] and never queued.
    pub fn try_enqueue(&mut self, bytes: &[u8]) -> Result<bool> {
        let packet = Packet::from_slice(bytes).map_err(|_| Error::PacketTooLong)?;

        if self.packets.push_back(packet).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("PS/2 queue full, packet dropped");
            self.dropped = self.dropped.wrapping_add(1);
            return Ok(false);
        }
        Ok(true)
    }

    /// Queue `bytes` as one packet, dropping it if it does not fit
    ///
    /// The protocol engines use this for their fixed-size replies. Returns
    /// false if the packet was dropped.
    pub fn enqueue(&mut self, bytes: &[u8]) -> bool {
        match self.try_enqueue(bytes) {
            Ok(queued) => queued,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("PS/2 packet of {} bytes dropped: too long", bytes.len());
                self.dropped = self.dropped.wrapping_add(1);
                false
            }
        }
    }

    /// Get number of queued packets
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Check if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Check if the next enqueue would be dropped
    pub fn is_full(&self) -> bool {
        self.packets.is_full()
    }

    /// Iterate over queued packets, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.packets.iter().map(|packet| packet.as_slice())
    }

    fn front(&self) -> Option<&Packet> {
        self.packets.front()
    }

    fn pop(&mut self) {
        self.packets.pop_front();
    }

    /// Discard everything, returning the number of packets discarded
    pub fn clear(&mut self) -> usize {
        let count = self.packets.len();
        self.packets.clear();
        count
    }

    fn take_dropped(&mut self) -> u32 {
        core::mem::replace(&mut self.dropped, 0)
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver of host-to-device bytes
///
/// `previous` is the last good byte received before this one, which is how
/// two-byte commands (command, then parameter) are recognized. Replies go into
/// `tx`, which has just been flushed.
pub trait HostByteHandler {
    /// Handle one good host byte
    fn on_host_byte(&mut self, byte: u8, previous: u8, tx: &mut PacketQueue);
}

impl<F> HostByteHandler for F
where
    F: FnMut(u8, u8, &mut PacketQueue),
{
    fn on_host_byte(&mut self, byte: u8, previous: u8, tx: &mut PacketQueue) {
        self(byte, previous, tx)
    }
}

/// Half-duplex transceiver for one PS/2 port
pub struct Transceiver<P: Ps2Phy> {
    phy: P,
    queue: PacketQueue,
    last_rx: u8,
    last_tx: u8,
    /// `last_tx` before the most recent queue byte
    prev_tx: u8,
    /// The frame last handed to the physical layer came from the queue
    /// (rather than being a resend reply)
    queue_frame_out: bool,
    /// Bytes of the head packet handed to the physical layer
    sent: u8,
    /// Polls left before the next byte may go out
    backoff: u8,
    stats: PortStats,
}

impl<P: Ps2Phy> Transceiver<P> {
    /// Create a transceiver on top of `phy`
    pub fn new(phy: P) -> Self {
        Self {
            phy,
            queue: PacketQueue::new(),
            last_rx: 0,
            last_tx: 0,
            prev_tx: 0,
            queue_frame_out: false,
            sent: 0,
            backoff: 0,
            stats: PortStats::new(),
        }
    }

    /// Queue a packet for transmission (see [`PacketQueue::try_enqueue`])
    pub fn send(&mut self, bytes: &[u8]) -> Result<bool> {
        self.queue.try_enqueue(bytes)
    }

    /// Get the outbound queue
    pub fn queue(&self) -> &PacketQueue {
        &self.queue
    }

    /// Get the outbound queue for producers
    pub fn queue_mut(&mut self) -> &mut PacketQueue {
        &mut self.queue
    }

    /// Check if the physical layer is still shifting a frame
    pub fn is_busy(&self) -> bool {
        self.phy.is_busy()
    }

    /// Last byte handed to the physical layer (what a host resend repeats)
    pub fn last_tx(&self) -> u8 {
        self.last_tx
    }

    /// Last good byte received from the host
    pub fn last_rx(&self) -> u8 {
        self.last_rx
    }

    /// Get diagnostic counters
    pub fn stats(&self) -> &PortStats {
        &self.stats
    }

    /// Get a diagnostic snapshot including drops not yet collected by a poll
    pub fn snapshot(&mut self) -> PortSnapshot {
        self.collect_drops();
        self.stats.snapshot()
    }

    /// Get the physical layer
    pub fn phy(&self) -> &P {
        &self.phy
    }

    fn collect_drops(&mut self) {
        let drops = self.queue.take_dropped();
        if drops > 0 {
            self.stats.record_queue_drops(drops);
        }
    }

    /// Run one transceiver step
    ///
    /// In order: take back a byte the host aborted, move the queue forward by
    /// one byte if the line allows it, then process at most one host frame.
    pub fn poll<H: HostByteHandler + ?Sized>(&mut self, handler: &mut H) {
        self.collect_drops();

        if self.phy.take_tx_failure() {
            #[cfg(feature = "defmt")]
            defmt::warn!("PS/2 transmit aborted by host, retrying byte {}", self.sent);
            self.stats.record_tx_failure();
            if core::mem::replace(&mut self.queue_frame_out, false) {
                self.sent = self.sent.saturating_sub(1);
            }
            self.backoff = 0;
        }

        let phy_busy = self.phy.is_busy();
        if self.backoff > 0 {
            self.backoff -= 1;
            // The serializer picked the frame up; it gates us from here on
            if phy_busy {
                self.backoff = 0;
            }
        }

        if self.backoff == 0 && !phy_busy && self.phy.lines_idle() {
            self.advance_queue();
        }

        if let Some(frame) = self.phy.take_rx_frame() {
            let Decoded { byte, parity_ok } = decode_capture(frame);

            if !parity_ok {
                #[cfg(feature = "defmt")]
                defmt::warn!("PS/2 parity error on host byte {=u8:#x}", byte);
                self.stats.record_parity_error();
                self.take_back_queue_frame();
                self.phy.put_frame(encode_frame(RESEND));
                return;
            }

            if byte == RESEND {
                self.take_back_queue_frame();
                #[cfg(feature = "defmt")]
                defmt::debug!("PS/2 host resend, repeating {=u8:#x}", self.last_tx);
                self.stats.record_host_resend();
                self.phy.put_frame(encode_frame(self.last_tx));
                return;
            }

            self.stats.record_host_byte();

            let flushed = self.queue.clear();
            if flushed > 0 {
                self.stats.record_flush(flushed);
            }
            self.sent = 0;

            #[cfg(feature = "defmt")]
            defmt::debug!("PS/2 host byte {=u8:#x} after {=u8:#x}", byte, self.last_rx);
            handler.on_host_byte(byte, self.last_rx, &mut self.queue);
            self.last_rx = byte;
        }
    }

    /// Pull back a queue byte the serializer never started, so a reply
    /// frame cannot overwrite it. The byte goes out again from the queue.
    fn take_back_queue_frame(&mut self) {
        let withdrawn = self.phy.withdraw_frame().is_some();
        if core::mem::replace(&mut self.queue_frame_out, false) && withdrawn {
            self.sent = self.sent.saturating_sub(1);
            self.last_tx = self.prev_tx;
        }
    }

    fn advance_queue(&mut self) {
        let Some(packet) = self.queue.front() else {
            return;
        };

        let sent = self.sent as usize;
        if sent >= packet.len() {
            self.queue.pop();
            self.sent = 0;
            return;
        }

        let byte = packet[sent];
        self.sent += 1;
        self.prev_tx = self.last_tx;
        self.last_tx = byte;
        self.queue_frame_out = true;
        self.backoff = TX_BACKOFF_POLLS;
        self.phy.put_frame(encode_frame(byte));
        self.stats.record_frame_sent();
    }
}
