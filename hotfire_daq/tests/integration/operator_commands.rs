//! Integration test: operator command handling.
//!
//! Every command is validated on its own; a rejected command leaves the
//! actuators untouched and is answered to the sender only.

use super::{Rig, PASSWORD};
use hotfire_common::device::DeviceError;
use hotfire_common::types::IgnitionState;
use hotfire_daq::command::{parse_command, Applied, Command, CommandError};

#[test]
fn wrong_password_changes_nothing() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    rig.drain_notifications();

    let reply = rig.command(r#"{"type":"Actuate","driver_id":2,"value":true,"password":"guess"}"#);
    assert_eq!(reply.as_deref(), Some("[W] Invalid password"));
    let reply = rig.command(r#"{"type":"Ignition","password":""}"#);
    assert_eq!(reply.as_deref(), Some("[W] Invalid password"));

    assert!(rig.writes_after_start().is_empty());
    assert_eq!(rig.ignition.state(), IgnitionState::Idle);
    assert!(rig.drain_notifications().is_empty());
}

#[test]
fn accepted_actuation_is_broadcast() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();
    rig.drain_notifications();

    let on = format!(r#"{{"type":"Actuate","driver_id":2,"value":true,"password":"{PASSWORD}"}}"#);
    let off = format!(r#"{{"type":"Actuate","driver_id":2,"value":0,"password":"{PASSWORD}"}}"#);
    assert_eq!(rig.command(&on), None);
    assert_eq!(rig.command(&off), None);

    assert_eq!(
        rig.writes_after_start(),
        vec![("EIO2".to_string(), true), ("EIO2".to_string(), false)]
    );
    assert_eq!(
        rig.drain_notifications(),
        vec!["Driver 2 set to true", "Driver 2 set to false"]
    );
}

#[test]
fn malformed_and_unknown_commands_are_rejected() {
    let rig = Rig::new();

    let reply = rig.command("not json").unwrap();
    assert!(reply.starts_with("[W] Invalid command syntax received"));

    let reply = rig.command(r#"{"type":"Detonate"}"#).unwrap();
    assert_eq!(reply, "[W] Unknown command type: Detonate");

    let reply = rig
        .command(&format!(r#"{{"type":"Actuate","driver_id":9,"value":true,"password":"{PASSWORD}"}}"#))
        .unwrap();
    assert_eq!(reply, "[W] Unknown driver id 9");

    let reply = rig
        .command(&format!(r#"{{"type":"Actuate","driver_id":0,"value":7,"password":"{PASSWORD}"}}"#))
        .unwrap();
    assert!(reply.contains("value must be 0 or 1"));
}

#[test]
fn cancel_and_close_need_no_password() {
    assert_eq!(parse_command(r#"{"type":"CancelIgnition"}"#), Ok(Command::CancelIgnition));
    assert_eq!(parse_command(r#"{"type":"close"}"#), Ok(Command::Close));
    assert_eq!(parse_command(r#"{"type":"Close"}"#), Ok(Command::Close));
}

#[test]
fn close_stops_everything_and_blocks_actuation() {
    let mut rig = Rig::new();
    rig.core.start().unwrap();

    assert_eq!(
        rig.dispatcher.dispatch(Command::Close),
        Ok(Applied::ShutdownRequested)
    );
    assert!(rig.shared.should_stop());

    let late = Command::Actuate {
        driver_id: 0,
        value: true,
        password: PASSWORD.to_string(),
    };
    assert_eq!(rig.dispatcher.dispatch(late), Err(CommandError::ShuttingDown));

    // The loop sees the flag immediately and takes the shutdown path.
    rig.core.run().unwrap();
    assert!(!rig.core.is_streaming());
    assert!(rig.actuators.snapshot().all_off());

    // A writer that got past its own shutdown check still cannot energize.
    let ignition = rig.actuators.ignition_index();
    assert!(matches!(
        rig.actuators.write_actuator(ignition, true),
        Err(DeviceError::OutputsLocked(_))
    ));
    assert_eq!(rig.sim.registers().value("EIO1"), Some(false));
}
