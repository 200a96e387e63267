//! USB to PS/2 dispatch
//!
//! The [`Bridge`] bundles the two emulated PS/2 ports with the table of
//! mounted HID interfaces. USB events go in through [`Bridge::handle_event`];
//! the main loop calls [`Bridge::poll`] at sub-millisecond cadence.
//!
//! # Example
//!
//! ```
//! use hid2ps2::bridge::Bridge;
//! use hid2ps2::config::BridgeConfig;
//! use hid2ps2::hid::{HidProtocol, HostEvent, KeyboardLeds, UsbHostStack};
//! use hid2ps2::ps2::SharedLink;
//! use hid2ps2::timer::Instant;
//!
//! static KEYBOARD_LINK: SharedLink = SharedLink::new();
//! static MOUSE_LINK: SharedLink = SharedLink::new();
//!
//! struct Host;
//!
//! impl UsbHostStack for Host {
//!     fn request_report(&mut self, _address: u8, _instance: u8) -> bool {
//!         true
//!     }
//!     fn set_led_report(&mut self, _address: u8, _instance: u8, _id: u8, _leds: KeyboardLeds) -> bool {
//!         true
//!     }
//! }
//!
//! let mut bridge = Bridge::new(&KEYBOARD_LINK, &MOUSE_LINK, BridgeConfig::default());
//! let mut host = Host;
//! bridge.power_on(Instant::from_ticks(0));
//!
//! let mounted = HostEvent::Mounted {
//!     address: 1,
//!     instance: 0,
//!     protocol: HidProtocol::Keyboard,
//!     descriptor: &[],
//! };
//! bridge.handle_event(mounted, Instant::from_ticks(10), &mut host)?;
//! bridge.poll(Instant::from_ticks(20), &mut host);
//! # Ok::<(), hid2ps2::Error>(())
//! ```

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::hid::{
    DeviceHidState, HidInstanceTable, HidProtocol, HostEvent, KeySnapshot, KeyState,
    KeyboardLeds, KeyboardReport, MouseReport, UsbHostStack,
};
use crate::ps2::{KeyboardEngine, MouseEngine, Ps2Phy, Ps2Port};
use crate::timer::Instant;

/// USB HID to PS/2 translator
pub struct Bridge<K: Ps2Phy, M: Ps2Phy> {
    keyboard: Ps2Port<K, KeyboardEngine>,
    mouse: Ps2Port<M, MouseEngine>,
    devices: HidInstanceTable,
    config: BridgeConfig,
}

impl<K: Ps2Phy, M: Ps2Phy> Bridge<K, M> {
    /// Create a bridge driving the keyboard and mouse links
    pub fn new(keyboard_phy: K, mouse_phy: M, config: BridgeConfig) -> Self {
        Self {
            keyboard: Ps2Port::new(keyboard_phy, KeyboardEngine::new()),
            mouse: Ps2Port::new(mouse_phy, MouseEngine::new()),
            devices: HidInstanceTable::new(),
            config,
        }
    }

    /// Power-on sequence of both emulated devices
    ///
    /// The mouse announces itself right away; the keyboard after its
    /// self-test delay.
    pub fn power_on(&mut self, now: Instant) {
        #[cfg(feature = "defmt")]
        defmt::info!("PS/2 power on");

        self.keyboard.split().0.power_on(now);
        let (mouse, tx) = self.mouse.split();
        mouse.power_on(tx);
    }

    /// Run both ports and forward keyboard LED changes to USB
    pub fn poll<U: UsbHostStack>(&mut self, now: Instant, usb: &mut U) {
        self.keyboard.poll(now);
        self.mouse.poll(now);

        if let Some(leds) = self.keyboard.split().0.take_led_update() {
            #[cfg(feature = "defmt")]
            defmt::debug!("Keyboard LEDs {=u8:#x}", leds.bits());

            for device in self.devices.iter().filter(|d| d.leds_owned()) {
                send_leds(usb, device, leds);
            }
        }
    }

    /// Handle one USB host event
    pub fn handle_event<U: UsbHostStack>(
        &mut self,
        event: HostEvent<'_>,
        now: Instant,
        usb: &mut U,
    ) -> Result<()> {
        match event {
            HostEvent::Mounted {
                address,
                instance,
                protocol,
                descriptor,
            } => self.mount(address, instance, protocol, descriptor, usb),
            HostEvent::Report {
                address,
                instance,
                data,
            } => self.report(address, instance, data, now, usb),
            HostEvent::Unmounted { address, instance } => self.unmount(address, instance, now),
        }
    }

    /// A HID interface was enumerated
    ///
    /// Interfaces that are neither keyboards nor mice are ignored.
    pub fn mount<U: UsbHostStack>(
        &mut self,
        address: u8,
        instance: u8,
        protocol: HidProtocol,
        descriptor: &[u8],
        usb: &mut U,
    ) -> Result<()> {
        let state = DeviceHidState::new(address, instance, protocol, descriptor);
        if !state.is_keyboard() && !state.is_mouse() {
            #[cfg(feature = "defmt")]
            defmt::info!("HID {}:{} is not a keyboard or mouse, ignored", address, instance);
            return Ok(());
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "HID {}:{} mounted: {} keyboard={} mouse={} reports={}",
            address,
            instance,
            protocol,
            state.is_keyboard(),
            state.is_mouse(),
            state.reports().len()
        );

        let device = self.devices.mount(state)?;
        if device.leds_owned() {
            send_leds(usb, device, self.keyboard.device().leds());
        }

        if !usb.request_report(address, instance) {
            #[cfg(feature = "defmt")]
            defmt::warn!("HID {}:{} report request failed", address, instance);
        }
        Ok(())
    }

    /// An Input report arrived
    ///
    /// The next report is requested even if this one could not be decoded.
    pub fn report<U: UsbHostStack>(
        &mut self,
        address: u8,
        instance: u8,
        data: &[u8],
        now: Instant,
        usb: &mut U,
    ) -> Result<()> {
        let result = self.dispatch(address, instance, data, now);
        usb.request_report(address, instance);
        result
    }

    fn dispatch(&mut self, address: u8, instance: u8, data: &[u8], now: Instant) -> Result<()> {
        let device = self.devices.get_mut(address, instance)?;
        let boot = self.config.prefer_boot_protocol || device.reports().is_empty();

        match device.protocol() {
            HidProtocol::Keyboard if boot => {
                let report = KeyboardReport::parse(data)?;
                apply_keys(&mut self.keyboard, &mut device.key_state, KeySnapshot::from_boot(&report), now);
            }
            HidProtocol::Mouse if boot => {
                let report = MouseReport::parse(data)?;
                apply_mouse(&mut self.mouse, &report);
            }
            _ => {
                let Some((report, payload)) = device.match_report(data) else {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("HID {}:{} report matches no descriptor", address, instance);
                    return Ok(());
                };

                if report.is_keyboard() {
                    let next = KeySnapshot::from_descriptor(report, payload);
                    apply_keys(&mut self.keyboard, &mut device.key_state, next, now);
                } else if report.is_mouse() {
                    apply_mouse(&mut self.mouse, &MouseReport::from_descriptor(report, payload));
                }
            }
        }
        Ok(())
    }

    /// A HID interface went away
    ///
    /// Keys it still held are released on the PS/2 side.
    pub fn unmount(&mut self, address: u8, instance: u8, now: Instant) -> Result<()> {
        let mut state = self.devices.remove(address, instance)?;

        #[cfg(feature = "defmt")]
        defmt::info!("HID {}:{} unmounted", address, instance);

        let (engine, tx) = self.keyboard.split();
        state
            .key_state
            .release_all(|key, pressed| engine.key_transition(key, pressed, now, tx));

        if state.is_mouse() {
            self.mouse.split().0.release_buttons();
        }
        Ok(())
    }

    /// Get the keyboard port
    pub fn keyboard(&mut self) -> &mut Ps2Port<K, KeyboardEngine> {
        &mut self.keyboard
    }

    /// Get the mouse port
    pub fn mouse(&mut self) -> &mut Ps2Port<M, MouseEngine> {
        &mut self.mouse
    }

    /// Get the mounted HID interfaces
    pub fn devices(&self) -> &HidInstanceTable {
        &self.devices
    }

    /// Get the bridge options
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

fn apply_keys<K: Ps2Phy>(
    port: &mut Ps2Port<K, KeyboardEngine>,
    state: &mut KeyState,
    next: KeySnapshot,
    now: Instant,
) {
    let (engine, tx) = port.split();
    state.update(next, |key, pressed| engine.key_transition(key, pressed, now, tx));
}

fn apply_mouse<M: Ps2Phy>(port: &mut Ps2Port<M, MouseEngine>, report: &MouseReport) {
    port.split()
        .0
        .movement(report.buttons.bits(), report.x, report.y, report.wheel);
}

fn send_leds<U: UsbHostStack>(usb: &mut U, device: &DeviceHidState, leds: KeyboardLeds) {
    if !usb.set_led_report(device.address(), device.instance(), device.led_report_id(), leds) {
        #[cfg(feature = "defmt")]
        defmt::warn!("HID {}:{} LED report failed", device.address(), device.instance());
    }
}
