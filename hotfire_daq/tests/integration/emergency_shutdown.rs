//! Integration test: over-pressure interlock inside the acquisition loop.
//!
//! Validates that three consecutive frames above threshold close the
//! shutdown actuator exactly once, that pressure staying high does not
//! re-trigger, and that a passing frame re-arms the interlock.

use super::{frame_at, Rig, PASSWORD};
use hotfire_common::consts::SKIPPED_SAMPLE;
use hotfire_common::types::Frame;

fn open_main_valve(rig: &Rig) {
    let cmd = format!(r#"{{"type":"Actuate","driver_id":0,"value":1,"password":"{PASSWORD}"}}"#);
    assert_eq!(rig.command(&cmd), None);
    assert_eq!(rig.sim.registers().value("EIO0"), Some(true));
}

fn shutdown_writes(rig: &Rig) -> usize {
    rig.writes_after_start()
        .iter()
        .filter(|w| *w == &("EIO0".to_string(), false))
        .count()
}

#[test]
fn three_strikes_close_valve_once() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    open_main_valve(&rig);

    rig.sim.queue_frames(vec![frame_at(120.0)], 2);
    rig.sim.queue_frames(vec![frame_at(120.0)], 1);
    rig.sim.queue_frames(vec![frame_at(120.0)], 0);
    let report = rig.core.run_cycle();
    assert_eq!(report.frames, 3);

    assert_eq!(shutdown_writes(&rig), 1);
    assert_eq!(rig.sim.registers().value("EIO0"), Some(false));
    assert!(!rig.actuators.snapshot().get(0).unwrap());

    let notes = rig.drain_notifications();
    assert_eq!(
        notes.iter().filter(|n| n.contains("Emergency shutdown executed")).count(),
        1
    );
}

#[test]
fn two_strikes_do_not_trip() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    open_main_valve(&rig);

    for pressure in [120.0, 130.0, 90.0, 150.0, 150.0] {
        rig.sim.queue_frames(vec![frame_at(pressure)], 0);
        rig.core.run_cycle();
    }
    assert_eq!(shutdown_writes(&rig), 0);
    assert_eq!(rig.sim.registers().value("EIO0"), Some(true));
}

#[test]
fn sustained_overpressure_stays_latched_until_pass() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    open_main_valve(&rig);

    for _ in 0..8 {
        rig.sim.queue_frames(vec![frame_at(140.0)], 0);
        rig.core.run_cycle();
    }
    assert_eq!(shutdown_writes(&rig), 1);

    // Operator reopens; the interlock only re-arms after a passing frame.
    open_main_valve(&rig);
    rig.sim.queue_frames(vec![frame_at(140.0)], 0);
    rig.core.run_cycle();
    assert_eq!(rig.sim.registers().value("EIO0"), Some(true));

    rig.sim.queue_frames(vec![frame_at(100.0)], 0);
    rig.core.run_cycle();
    for _ in 0..3 {
        rig.sim.queue_frames(vec![frame_at(140.0)], 0);
        rig.core.run_cycle();
    }
    assert_eq!(shutdown_writes(&rig), 2);
    assert_eq!(rig.sim.registers().value("EIO0"), Some(false));
}

#[test]
fn skipped_samples_neither_strike_nor_reset() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    open_main_valve(&rig);
    rig.drain_notifications();

    let lost = Frame::new(vec![0.1, SKIPPED_SAMPLE, 0.1]);
    rig.sim.queue_frames(
        vec![frame_at(120.0), frame_at(120.0), lost, frame_at(120.0)],
        0,
    );
    let report = rig.core.run_cycle();
    assert_eq!(report.skipped_samples, 1);
    assert_eq!(shutdown_writes(&rig), 1);

    let notes = rig.drain_notifications();
    assert!(notes.iter().any(|n| n == "1 samples got skipped"));
}

#[test]
fn failed_shutdown_write_is_reported() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    open_main_valve(&rig);
    rig.drain_notifications();
    rig.sim.registers().fail("EIO0");

    rig.sim.queue_frames(vec![frame_at(120.0); 3], 0);
    let report = rig.core.run_cycle();
    assert!(report.published);

    let notes = rig.drain_notifications();
    assert!(notes
        .iter()
        .any(|n| n.starts_with("[E] Emergency shutdown actuation failed")));
}
