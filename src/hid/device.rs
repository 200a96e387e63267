//! Mounted HID interfaces
//!
//! One [`DeviceHidState`] per HID interface the USB host stack reports,
//! kept in a fixed-size [`HidInstanceTable`].

use super::constants::HidProtocol;
use super::keyboard::KeyState;
use super::report_descriptor::{self, ReportDescriptor, ReportTable};
use crate::config::MAX_HID_INSTANCES;
use crate::error::{Error, Result};

/// State of one mounted HID interface
#[derive(Debug, Clone)]
pub struct DeviceHidState {
    address: u8,
    instance: u8,
    protocol: HidProtocol,
    reports: ReportTable,
    /// Keys held according to this interface's last report
    pub key_state: KeyState,
    is_keyboard: bool,
    is_mouse: bool,
    leds_owned: bool,
    led_report_id: u8,
}

impl DeviceHidState {
    /// Build the state for a freshly mounted interface
    ///
    /// A descriptor that fails to parse leaves the report table empty; boot
    /// interfaces still work through the fixed layout.
    pub fn new(address: u8, instance: u8, protocol: HidProtocol, descriptor: &[u8]) -> Self {
        let reports = match report_descriptor::parse(descriptor) {
            Ok(reports) => reports,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("HID {}:{} descriptor rejected: {}", address, instance, _e);
                ReportTable::new()
            }
        };

        let is_keyboard =
            protocol == HidProtocol::Keyboard || reports.iter().any(|r| r.is_keyboard());
        let is_mouse = protocol == HidProtocol::Mouse || reports.iter().any(|r| r.is_mouse());

        let led_report = reports.iter().find(|r| r.has_led_output());
        let leds_owned = led_report.is_some() || protocol == HidProtocol::Keyboard;
        let led_report_id = led_report.map_or(0, |r| r.report_id);

        Self {
            address,
            instance,
            protocol,
            reports,
            key_state: KeyState::new(),
            is_keyboard,
            is_mouse,
            leds_owned,
            led_report_id,
        }
    }

    /// USB device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// HID interface index on the device
    pub fn instance(&self) -> u8 {
        self.instance
    }

    /// Boot interface protocol
    pub fn protocol(&self) -> HidProtocol {
        self.protocol
    }

    /// Parsed reports
    pub fn reports(&self) -> &[ReportDescriptor] {
        &self.reports
    }

    /// Check if this interface produces key input
    pub fn is_keyboard(&self) -> bool {
        self.is_keyboard
    }

    /// Check if this interface produces pointer input
    pub fn is_mouse(&self) -> bool {
        self.is_mouse
    }

    /// Check if this interface accepts the keyboard LED Output report
    pub fn leds_owned(&self) -> bool {
        self.leds_owned
    }

    /// Report ID of the LED Output report (0 = none)
    pub fn led_report_id(&self) -> u8 {
        self.led_report_id
    }

    /// Find the report an input payload belongs to
    ///
    /// Returns the report and the payload with its Report ID byte removed.
    /// Devices that declare no Report IDs send bare payloads.
    pub fn match_report<'a>(&self, data: &'a [u8]) -> Option<(&ReportDescriptor, &'a [u8])> {
        if self.reports.iter().all(|r| r.report_id == 0) {
            return self.reports.first().map(|r| (r, data));
        }

        let (&id, payload) = data.split_first()?;
        self.reports
            .iter()
            .find(|r| r.report_id == id)
            .map(|r| (r, payload))
    }
}

/// Fixed-capacity table of mounted HID interfaces
#[derive(Debug)]
pub struct HidInstanceTable {
    slots: [Option<DeviceHidState>; MAX_HID_INSTANCES],
}

impl HidInstanceTable {
    /// Create an empty table
    pub const fn new() -> Self {
        const NONE: Option<DeviceHidState> = None;
        Self {
            slots: [NONE; MAX_HID_INSTANCES],
        }
    }

    fn position(&self, address: u8, instance: u8) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|s| s.address == address && s.instance == instance)
        })
    }

    /// Insert a mounted interface
    ///
    /// Re-mounting the same address/interface replaces the old state.
    pub fn mount(&mut self, state: DeviceHidState) -> Result<&mut DeviceHidState> {
        let index = match self.position(state.address, state.instance) {
            Some(index) => index,
            None => self
                .slots
                .iter()
                .position(Option::is_none)
                .ok_or(Error::InstanceTableFull)?,
        };
        Ok(self.slots[index].insert(state))
    }

    /// Get a mounted interface
    pub fn get(&self, address: u8, instance: u8) -> Result<&DeviceHidState> {
        self.position(address, instance)
            .and_then(|i| self.slots[i].as_ref())
            .ok_or(Error::UnknownDevice)
    }

    /// Get a mounted interface mutably
    pub fn get_mut(&mut self, address: u8, instance: u8) -> Result<&mut DeviceHidState> {
        let index = self.position(address, instance).ok_or(Error::UnknownDevice)?;
        self.slots[index].as_mut().ok_or(Error::UnknownDevice)
    }

    /// Remove an interface, returning its last state
    pub fn remove(&mut self, address: u8, instance: u8) -> Result<DeviceHidState> {
        let index = self.position(address, instance).ok_or(Error::UnknownDevice)?;
        self.slots[index].take().ok_or(Error::UnknownDevice)
    }

    /// Iterate over mounted interfaces
    pub fn iter(&self) -> impl Iterator<Item = &DeviceHidState> + '_ {
        self.slots.iter().flatten()
    }

    /// Number of mounted interfaces
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check if nothing is mounted
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HidInstanceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUSE_WITH_IDS: &[u8] = &[
        0x05, 0x01, 0x09, 0x02, 0xA1, 0x01, 0x85, 0x02, 0x05, 0x09, 0x19, 0x01, 0x29, 0x03,
        0x15, 0x00, 0x25, 0x01, 0x75, 0x01, 0x95, 0x03, 0x81, 0x02, 0x75, 0x05, 0x95, 0x01,
        0x81, 0x01, 0xC0,
    ];

    #[test]
    fn test_boot_keyboard_without_descriptor() {
        let state = DeviceHidState::new(1, 0, HidProtocol::Keyboard, &[]);
        assert!(state.is_keyboard());
        assert!(!state.is_mouse());
        assert!(state.leds_owned());
        assert!(state.reports().is_empty());
        assert_eq!(state.match_report(&[0; 8]).map(|(r, _)| r.report_id), None);
    }

    #[test]
    fn test_report_id_matching() {
        let state = DeviceHidState::new(3, 1, HidProtocol::None, MOUSE_WITH_IDS);
        assert!(state.is_mouse());
        assert!(!state.leds_owned());

        let (report, payload) = state.match_report(&[0x02, 0x05]).unwrap();
        assert_eq!(report.report_id, 2);
        assert_eq!(payload, &[0x05]);
        assert!(state.match_report(&[0x07, 0x05]).is_none());
        assert!(state.match_report(&[]).is_none());
    }

    #[test]
    fn test_table_lifecycle() {
        let mut table = HidInstanceTable::new();
        assert!(table.is_empty());

        table.mount(DeviceHidState::new(1, 0, HidProtocol::Keyboard, &[])).unwrap();
        table.mount(DeviceHidState::new(1, 1, HidProtocol::Mouse, &[])).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.get(1, 1).unwrap().is_mouse());

        // Same interface again replaces, not duplicates
        table.mount(DeviceHidState::new(1, 1, HidProtocol::Mouse, &[])).unwrap();
        assert_eq!(table.len(), 2);

        assert_eq!(table.remove(1, 0).unwrap().address(), 1);
        assert_eq!(table.get(1, 0).err(), Some(Error::UnknownDevice));
        assert_eq!(table.remove(1, 0).err(), Some(Error::UnknownDevice));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_full() {
        let mut table = HidInstanceTable::new();
        for address in 0..MAX_HID_INSTANCES as u8 {
            table.mount(DeviceHidState::new(address, 0, HidProtocol::Mouse, &[])).unwrap();
        }
        assert_eq!(
            table.mount(DeviceHidState::new(99, 0, HidProtocol::Mouse, &[])).err(),
            Some(Error::InstanceTableFull)
        );
    }
}
