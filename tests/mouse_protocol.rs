//! Mouse emulation over a scripted PS/2 link

mod common;

use common::{run, Wire};
use hid2ps2::ps2::{MouseEngine, ProtocolLevel, Ps2Port, SharedLink};

type MousePort<'a> = Ps2Port<&'a SharedLink, MouseEngine>;

fn host_command(port: &mut MousePort<'_>, wire: &mut Wire<'_>, start_us: u64, bytes: &[u8]) -> u64 {
    let mut now = start_us;
    for &byte in bytes {
        wire.host_send(byte);
        now = run(now, 5, &mut [&mut *wire], |t| port.poll(t));
    }
    now
}

#[test]
fn test_power_on_announces_standard_mouse() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    let (mouse, tx) = port.split();
    mouse.power_on(tx);
    run(0, 5, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xAA, 0x00]);
}

#[test]
fn test_wheel_negotiation() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xF3, 200, 0xF3, 100, 0xF3, 80, 0xF2]);
    assert_eq!(wire.take(), [0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0x03]);
    assert_eq!(port.device().level(), ProtocolLevel::IntelliMouse);

    let now = host_command(&mut port, &mut wire, now, &[0xF3, 200, 0xF3, 200, 0xF3, 80, 0xF2]);
    assert_eq!(wire.take(), [0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0xFA, 0x04]);
    assert_eq!(port.device().level(), ProtocolLevel::Explorer);

    // Only a reset goes back to the standard protocol
    let now = host_command(&mut port, &mut wire, now, &[0xF6, 0xF2]);
    assert_eq!(wire.take(), [0xFA, 0xFA, 0x04]);

    let now = host_command(&mut port, &mut wire, now, &[0xFF]);
    run(now, 150, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xFA, 0xAA, 0x00]);
    assert_eq!(port.device().level(), ProtocolLevel::Standard);
}

#[test]
fn test_explorer_sequence_needs_intellimouse_first() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    host_command(&mut port, &mut wire, 0, &[0xF3, 200, 0xF3, 200, 0xF3, 80, 0xF2]);
    assert_eq!(wire.take().last(), Some(&0x00));
    assert_eq!(port.device().level(), ProtocolLevel::Standard);
}

#[test]
fn test_status_request() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xF3, 40, 0xE9]);
    assert_eq!(wire.take(), [0xFA, 0xFA, 0xFA, 0x00, 0x02, 40]);

    host_command(&mut port, &mut wire, now, &[0xF4, 0xE9]);
    assert_eq!(wire.take(), [0xFA, 0xFA, 0x20, 0x02, 40]);
}

#[test]
fn test_streaming_with_wheel() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xF3, 200, 0xF3, 100, 0xF3, 80]);
    wire.take();

    // Enabled at `start`; first sample 100 ms later, then every 12.5 ms (80 Hz)
    let start = now;
    let now = host_command(&mut port, &mut wire, start, &[0xF4]);
    assert_eq!(wire.take(), [0xFA]);

    // Left button, 5 right, 3 up, one wheel notch away from the user
    port.split().0.movement(0x01, 5, -3, 1);
    let now = run(now, 100, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0x09, 0x05, 0x03, 0xFF]);

    // Button released: one at-rest packet, then silence
    port.split().0.movement(0x00, 0, 0, 0);
    run(now, 60, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0x08, 0x00, 0x00, 0x00]);
}

#[test]
fn test_large_motion_is_spread_over_samples() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xF4]);
    assert_eq!(wire.take(), [0xFA]);

    port.split().0.movement(0x00, 300, 0, 0);
    // Samples at 100, 110 and 120 ms after enabling
    run(now, 130, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(
        wire.take(),
        [0x08, 0xFF, 0x00, 0x08, 0x2D, 0x00, 0x08, 0x00, 0x00]
    );
}

#[test]
fn test_set_defaults_stops_stream_and_restores_settings() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xF3, 40, 0xF4]);
    assert_eq!(wire.take(), [0xFA, 0xFA, 0xFA]);
    assert!(port.device().is_streaming());
    assert_eq!(port.device().sample_rate(), 40);

    let now = host_command(&mut port, &mut wire, now, &[0xF6]);
    assert_eq!(wire.take(), [0xFA]);
    assert!(!port.device().is_streaming());
    assert_eq!(port.device().sample_rate(), 100);

    port.split().0.movement(0x01, 10, 10, 0);
    let now = run(now, 300, &mut [&mut wire], |t| port.poll(t));
    assert!(wire.take().is_empty());

    // Stream off, default resolution and rate
    host_command(&mut port, &mut wire, now, &[0xE9]);
    assert_eq!(wire.take(), [0xFA, 0x00, 0x02, 100]);
}

#[test]
fn test_disable_stops_stream() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, MouseEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xF4]);
    let now = host_command(&mut port, &mut wire, now, &[0xF5]);
    assert_eq!(wire.take(), [0xFA, 0xFA]);
    assert!(!port.device().is_streaming());

    port.split().0.movement(0x01, 10, 10, 0);
    run(now, 200, &mut [&mut wire], |t| port.poll(t));
    assert!(wire.take().is_empty());
}
