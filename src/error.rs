//! Translator error types

use core::fmt;

/// Translator operation result type
pub type Result<T> = core::result::Result<T, Error>;

/// Translator error types
///
/// These only surface on the USB side of the bridge. PS/2 line faults are
/// retried or dropped in place and show up in [`crate::stats`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Report shorter than the layout requires
    ReportTooShort,
    /// Report descriptor item runs past the end of the descriptor
    TruncatedDescriptor,
    /// Report descriptor contains no usable report
    InvalidDescriptor,
    /// No HID instance mounted at this address/interface
    UnknownDevice,
    /// Every HID instance slot is in use
    InstanceTableFull,
    /// Packet exceeds the PS/2 packet size limit
    PacketTooLong,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReportTooShort => write!(f, "Report too short"),
            Self::TruncatedDescriptor => write!(f, "Truncated report descriptor"),
            Self::InvalidDescriptor => write!(f, "Invalid report descriptor"),
            Self::UnknownDevice => write!(f, "Unknown HID instance"),
            Self::InstanceTableFull => write!(f, "HID instance table full"),
            Self::PacketTooLong => write!(f, "Packet too long"),
        }
    }
}
