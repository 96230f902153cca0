//! Integration test: operator link loss fail-safe.
//!
//! With the grace window at five minutes, a link that stays down for the
//! whole window trips the shutdown flag; the acquisition loop then drives
//! every actuator off. A reconnect inside the window resets the timer.

use super::{frame_at, Rig, PASSWORD};
use hotfire_daq::notify::Notifier;
use hotfire_daq::telemetry::{
    DeliveryError, LinkStatus, Observer, ObserverRegistry, TelemetryBroadcaster, TelemetryLayout,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

const GRACE: Duration = Duration::from_secs(300);

#[derive(Default)]
struct Console {
    id: u64,
    lines: Mutex<Vec<String>>,
}

impl Observer for Console {
    fn id(&self) -> u64 {
        self.id
    }

    fn deliver(&self, line: &str) -> Result<(), DeliveryError> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}

fn broadcaster(rig: &Rig, observers: &Arc<ObserverRegistry>) -> TelemetryBroadcaster {
    let (_notifier, rx) = Notifier::channel();
    TelemetryBroadcaster::new(
        &rig.config.telemetry,
        TelemetryLayout::from_channels(&rig.config.channels),
        Arc::clone(&rig.shared),
        Arc::clone(observers),
        rx,
    )
}

fn connect(observers: &ObserverRegistry) -> Arc<Console> {
    let console = Arc::new(Console {
        id: observers.next_id(),
        ..Console::default()
    });
    observers.register(console.clone());
    console
}

fn prime(rig: &mut Rig) {
    rig.core.start().unwrap();
    let open = format!(r#"{{"type":"Actuate","driver_id":2,"value":true,"password":"{PASSWORD}"}}"#);
    assert_eq!(rig.command(&open), None);
    rig.sim.queue_frames(vec![frame_at(50.0)], 0);
    assert!(rig.core.run_cycle().published);
}

#[test]
fn telemetry_reaches_connected_operator() {
    let mut rig = Rig::new();
    prime(&mut rig);
    let observers = Arc::new(ObserverRegistry::new());
    let mut telemetry = broadcaster(&rig, &observers);
    let console = connect(&observers);

    assert_eq!(telemetry.tick(Instant::now()), LinkStatus::Up);
    let lines = console.lines.lock().clone();
    // Thermocouples, pressure transducers, load cells, then driver states.
    assert_eq!(lines.len(), 4);
    assert!(lines[1].contains(r#""group_id":1"#));
    assert!(lines[1].contains(r#""reading":50.0"#));
    assert!(lines[3].contains(r#""type":"DriverValue""#));
    assert!(lines[3].contains("[false,false,true]"));
}

#[test]
fn link_down_for_grace_window_forces_shutdown() {
    let mut rig = Rig::new();
    prime(&mut rig);
    let observers = Arc::new(ObserverRegistry::new());
    let mut telemetry = broadcaster(&rig, &observers);
    let console = connect(&observers);

    let t0 = Instant::now();
    assert_eq!(telemetry.tick(t0), LinkStatus::Up);
    observers.remove(console.id);

    assert_eq!(telemetry.tick(t0), LinkStatus::Down { remaining: GRACE });
    assert_eq!(
        telemetry.tick(t0 + Duration::from_secs(299)),
        LinkStatus::Down {
            remaining: Duration::from_secs(1)
        }
    );
    assert!(!rig.shared.should_stop());

    assert_eq!(telemetry.tick(t0 + GRACE), LinkStatus::Expired);
    assert!(rig.shared.should_stop());

    rig.core.run().unwrap();
    assert!(rig.actuators.snapshot().all_off());
    assert_eq!(rig.sim.registers().value("EIO2"), Some(false));
}

#[test]
fn reconnect_inside_window_keeps_running() {
    let mut rig = Rig::new();
    prime(&mut rig);
    let observers = Arc::new(ObserverRegistry::new());
    let mut telemetry = broadcaster(&rig, &observers);
    let first = connect(&observers);

    let t0 = Instant::now();
    telemetry.tick(t0);
    observers.remove(first.id);
    telemetry.tick(t0 + Duration::from_secs(1));

    connect(&observers);
    assert_eq!(
        telemetry.tick(t0 + Duration::from_secs(250)),
        LinkStatus::Up
    );
    assert_eq!(
        telemetry.tick(t0 + Duration::from_secs(600)),
        LinkStatus::Up
    );
    assert!(!rig.shared.should_stop());
    assert_eq!(rig.sim.registers().value("EIO2"), Some(true));
}

#[test]
fn no_operator_ever_connected_does_not_trip() {
    let mut rig = Rig::new();
    prime(&mut rig);
    let observers = Arc::new(ObserverRegistry::new());
    let mut telemetry = broadcaster(&rig, &observers);

    let t0 = Instant::now();
    assert_eq!(telemetry.tick(t0), LinkStatus::NeverConnected);
    assert_eq!(
        telemetry.tick(t0 + GRACE * 2),
        LinkStatus::NeverConnected
    );
    assert!(!rig.shared.should_stop());
}
