//! Keyboard emulation over a scripted PS/2 link
//!
//! Drives a keyboard port the way a PC would: host commands clocked in,
//! device replies and scan codes clocked out.

mod common;

use common::{at, run, Wire};
use hid2ps2::hid::{KeyCode, KeyboardLeds};
use hid2ps2::ps2::{KeyboardEngine, Ps2Port, SharedLink};

type KeyboardPort<'a> = Ps2Port<&'a SharedLink, KeyboardEngine>;

fn host_command(port: &mut KeyboardPort<'_>, wire: &mut Wire<'_>, start_us: u64, bytes: &[u8]) -> u64 {
    let mut now = start_us;
    for &byte in bytes {
        wire.host_send(byte);
        now = run(now, 5, &mut [&mut *wire], |t| port.poll(t));
    }
    now
}

#[test]
fn test_power_on_self_test() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());
    port.split().0.power_on(at(0));

    run(0, 450, &mut [&mut wire], |t| port.poll(t));
    assert!(wire.take().is_empty());

    run(450_000, 100, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xAA]);
}

#[test]
fn test_reset_flashes_leds_then_self_test() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xFF]);
    assert_eq!(wire.take(), [0xFA]);
    assert!(!port.device().is_enabled());
    assert_eq!(port.split().0.take_led_update(), Some(KeyboardLeds::all()));

    // Keys are ignored until the self test completes
    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::A.0, true, at(now), tx);
    engine.key_transition(KeyCode::A.0, false, at(now), tx);

    run(now, 600, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xAA]);
    assert!(port.device().is_enabled());
    assert_eq!(port.split().0.take_led_update(), Some(KeyboardLeds::empty()));
}

#[test]
fn test_identify_echo_and_scan_code_set() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    let now = host_command(&mut port, &mut wire, 0, &[0xF2]);
    assert_eq!(wire.take(), [0xFA, 0xAB, 0x83]);

    let now = host_command(&mut port, &mut wire, now, &[0xEE]);
    assert_eq!(wire.take(), [0xEE]);

    // Both the query and a set change are only acknowledged
    let now = host_command(&mut port, &mut wire, now, &[0xF0, 0x00]);
    assert_eq!(wire.take(), [0xFA, 0xFA]);

    let now = host_command(&mut port, &mut wire, now, &[0xF0, 0x03]);
    assert_eq!(wire.take(), [0xFA, 0xFA]);

    // Still speaking set 2
    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::A.0, true, at(now), tx);
    run(now, 5, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0x1C]);
}

#[test]
fn test_set_leds() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    // Num Lock + Caps Lock
    host_command(&mut port, &mut wire, 0, &[0xED, 0x06]);
    assert_eq!(wire.take(), [0xFA, 0xFA]);
    assert_eq!(
        port.split().0.take_led_update(),
        Some(KeyboardLeds::NUM_LOCK | KeyboardLeds::CAPS_LOCK)
    );
    assert_eq!(port.split().0.take_led_update(), None);
}

#[test]
fn test_typematic_repeat_at_configured_rate() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    // 250 ms delay, 30 characters per second
    let start = host_command(&mut port, &mut wire, 0, &[0xF3, 0x00]);
    assert_eq!(wire.take(), [0xFA, 0xFA]);

    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::A.0, true, at(start), tx);

    // Repeats at 250, 283, 317, 350 and 383 ms
    let now = run(start, 400, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0x1C; 6]);

    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::A.0, false, at(now), tx);
    run(now, 200, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xF0, 0x1C]);
}

#[test]
fn test_extended_key_repeats_with_prefix() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::LEFT_ARROW.0, true, at(0), tx);

    // Default 500 ms delay: one repeat by 550 ms
    run(0, 550, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xE0, 0x6B, 0xE0, 0x6B]);
}

#[test]
fn test_disable_stops_scanning_and_repeat() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::B.0, true, at(0), tx);
    let now = run(0, 10, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0x32]);

    let now = host_command(&mut port, &mut wire, now, &[0xF5]);
    assert_eq!(wire.take(), [0xFA]);
    assert_eq!(port.device().repeat_key(), None);

    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::C.0, true, at(now), tx);
    let now = run(now, 700, &mut [&mut wire], |t| port.poll(t));
    assert!(wire.take().is_empty());

    let now = host_command(&mut port, &mut wire, now, &[0xF4]);
    assert_eq!(wire.take(), [0xFA]);

    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::C.0, false, at(now), tx);
    run(now, 10, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xF0, 0x21]);
}

#[test]
fn test_parity_error_and_host_resend() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    wire.host_send_corrupted(0xF2);
    let now = run(0, 5, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xFE]);

    let now = host_command(&mut port, &mut wire, now, &[0xEE]);
    assert_eq!(wire.take(), [0xEE]);

    // Host missed the echo and asks again
    host_command(&mut port, &mut wire, now, &[0xFE]);
    assert_eq!(wire.take(), [0xEE]);

    let stats = port.snapshot();
    assert_eq!(stats.parity_errors, 1);
    assert_eq!(stats.host_resends, 1);
}

#[test]
fn test_inhibited_frame_is_retransmitted() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    let (engine, tx) = port.split();
    engine.key_transition(KeyCode::LEFT_ARROW.0, false, at(0), tx);

    // First frame goes out, then the host inhibits mid-frame
    port.poll(at(0));
    wire.step();
    wire.abort();

    run(100, 10, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xE0, 0xE0, 0xF0, 0x6B]);
    assert_eq!(port.snapshot().tx_failures, 1);
}

#[test]
fn test_host_command_discards_pending_scan_codes() {
    let link = SharedLink::new();
    let mut wire = Wire::new(&link);
    let mut port = Ps2Port::new(&link, KeyboardEngine::new());

    // Host holds CLOCK low: nothing can be sent
    link.set_lines(false, true);
    let (engine, tx) = port.split();
    for key in [KeyCode::A, KeyCode::B, KeyCode::C] {
        engine.key_transition(key.0, true, at(0), tx);
    }
    let now = run(0, 5, &mut [&mut wire], |t| port.poll(t));
    assert!(wire.take().is_empty());

    wire.host_send(0xF2);
    let now = run(now, 1, &mut [&mut wire], |t| port.poll(t));
    assert!(wire.take().is_empty());

    link.set_lines(true, true);
    run(now, 5, &mut [&mut wire], |t| port.poll(t));
    assert_eq!(wire.take(), [0xFA, 0xAB, 0x83]);
    assert_eq!(port.snapshot().flushed_packets, 3);
}
