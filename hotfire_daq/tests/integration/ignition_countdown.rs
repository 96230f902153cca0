//! Integration test: ignition countdown, cancellation and the fire step.

use super::{Rig, PASSWORD};
use hotfire_common::types::IgnitionState;
use hotfire_daq::ignition::{IgnitionSequence, TickOutcome};
use std::time::{Duration, Instant};

fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    done()
}

#[test]
fn countdown_fires_ignition_actuator() {
    let mut rig = Rig::with_tick_ms(2);
    rig.core.start().unwrap();
    rig.drain_notifications();

    let start = format!(r#"{{"type":"Ignition","password":"{PASSWORD}"}}"#);
    assert_eq!(rig.command(&start), None);
    assert!(wait_for(Duration::from_secs(5), || rig.ignition.fired() == 1));

    assert_eq!(rig.writes_after_start(), vec![("EIO1".to_string(), true)]);
    assert_eq!(rig.ignition.state(), IgnitionState::Idle);

    let notes = rig.drain_notifications();
    let countdown: Vec<&String> = notes.iter().filter(|n| n.starts_with("Ignition in ")).collect();
    assert_eq!(countdown.len(), 11);
    assert_eq!(countdown[0], "Ignition in 10...");
    assert_eq!(countdown[10], "Ignition in progress");
}

#[test]
fn second_start_during_countdown_is_ignored() {
    let rig = Rig::with_tick_ms(50);
    let start = format!(r#"{{"type":"Ignition","password":"{PASSWORD}"}}"#);
    assert_eq!(rig.command(&start), None);
    assert_eq!(rig.command(&start), None);
    assert!(matches!(rig.ignition.state(), IgnitionState::Countdown(_)));

    assert_eq!(rig.command(r#"{"type":"CancelIgnition"}"#), None);
    assert!(wait_for(Duration::from_secs(5), || rig.ignition.state() == IgnitionState::Idle));
    assert_eq!(rig.ignition.fired(), 0);
}

#[test]
fn cancel_after_third_tick_never_energizes() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    rig.drain_notifications();

    let (notifier, mut rx) = hotfire_daq::notify::Notifier::channel();
    let mut sequence = IgnitionSequence::new(&rig.config.ignition, rig.actuators.clone(), notifier);
    assert!(sequence.start());
    for expected in [10, 9, 8] {
        assert_eq!(sequence.tick(false), TickOutcome::Counting(expected));
    }
    assert!(sequence.cancel());
    assert_eq!(sequence.tick(false), TickOutcome::Canceled);

    let notes: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        notes,
        vec!["Ignition in 10...", "Ignition in 9...", "Ignition in 8...", "Ignition canceled"]
    );
    assert!(rig.writes_after_start().is_empty());
    assert_eq!(rig.sim.registers().value("EIO1"), Some(false));
}

#[test]
fn shutdown_aborts_running_countdown() {
    let mut rig = Rig::with_tick_ms(20);
    rig.core.start().unwrap();

    let start = format!(r#"{{"type":"Ignition","password":"{PASSWORD}"}}"#);
    assert_eq!(rig.command(&start), None);
    assert_eq!(rig.command(r#"{"type":"close"}"#), None);

    assert!(wait_for(Duration::from_secs(5), || rig.ignition.state() == IgnitionState::Idle));
    assert_eq!(rig.ignition.fired(), 0);
    rig.core.run().unwrap();
    assert_eq!(rig.sim.registers().value("EIO1"), Some(false));
}
