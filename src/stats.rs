//! Line diagnostics
//!
//! Every PS/2 fault is recovered silently (resend, retransmit or drop), so
//! these counters are the only way to tell a marginal link from a healthy one.

use core::sync::atomic::{AtomicU32, Ordering};

/// Diagnostic counters for one PS/2 port
pub struct PortStats {
    /// Frames handed to the physical layer (including retransmissions)
    pub frames_sent: AtomicU32,

    /// Bytes received from the host with good parity
    pub host_bytes: AtomicU32,

    /// Host frames rejected for bad parity
    pub parity_errors: AtomicU32,

    /// 0xFE resend requests received from the host
    pub host_resends: AtomicU32,

    /// Transmissions aborted by the host pulling the clock low
    pub tx_failures: AtomicU32,

    /// Outbound packets dropped because the queue was full
    pub queue_drops: AtomicU32,

    /// Queued packets discarded because a host command pre-empted them
    pub flushed_packets: AtomicU32,
}

impl PortStats {
    /// Create zeroed counters
    pub const fn new() -> Self {
        Self {
            frames_sent: AtomicU32::new(0),
            host_bytes: AtomicU32::new(0),
            parity_errors: AtomicU32::new(0),
            host_resends: AtomicU32::new(0),
            tx_failures: AtomicU32::new(0),
            queue_drops: AtomicU32::new(0),
            flushed_packets: AtomicU32::new(0),
        }
    }

    #[inline(always)]
    pub(crate) fn record_frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_host_byte(&self) {
        self.host_bytes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_parity_error(&self) {
        self.parity_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_host_resend(&self) {
        self.host_resends.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_tx_failure(&self) {
        self.tx_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_queue_drops(&self, packets: u32) {
        self.queue_drops.fetch_add(packets, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn record_flush(&self, packets: usize) {
        self.flushed_packets
            .fetch_add(packets as u32, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> PortSnapshot {
        PortSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            host_bytes: self.host_bytes.load(Ordering::Relaxed),
            parity_errors: self.parity_errors.load(Ordering::Relaxed),
            host_resends: self.host_resends.load(Ordering::Relaxed),
            tx_failures: self.tx_failures.load(Ordering::Relaxed),
            queue_drops: self.queue_drops.load(Ordering::Relaxed),
            flushed_packets: self.flushed_packets.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.frames_sent.store(0, Ordering::Relaxed);
        self.host_bytes.store(0, Ordering::Relaxed);
        self.parity_errors.store(0, Ordering::Relaxed);
        self.host_resends.store(0, Ordering::Relaxed);
        self.tx_failures.store(0, Ordering::Relaxed);
        self.queue_drops.store(0, Ordering::Relaxed);
        self.flushed_packets.store(0, Ordering::Relaxed);
    }
}

impl Default for PortStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`PortStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortSnapshot {
    /// Frames handed to the physical layer
    pub frames_sent: u32,
    /// Good bytes received from the host
    pub host_bytes: u32,
    /// Host frames with bad parity
    pub parity_errors: u32,
    /// Host resend requests
    pub host_resends: u32,
    /// Aborted transmissions
    pub tx_failures: u32,
    /// Packets dropped on a full queue
    pub queue_drops: u32,
    /// Packets discarded by host commands
    pub flushed_packets: u32,
}

impl PortSnapshot {
    /// Fraction of received host frames that failed parity, in percent
    pub fn parity_error_percent(&self) -> u8 {
        let total = self.host_bytes as u64 + self.parity_errors as u64;
        if total == 0 {
            return 0;
        }
        ((self.parity_errors as u64 * 100) / total) as u8
    }

    /// Check if the link shows any fault at all
    pub fn is_clean(&self) -> bool {
        self.parity_errors == 0
            && self.host_resends == 0
            && self.tx_failures == 0
            && self.queue_drops == 0
    }
}
