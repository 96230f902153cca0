//! Operator command decoding and dispatch.
//!
//! Commands arrive as JSON objects with a `type` discriminator:
//!
//! | `type`           | Fields                          | Password |
//! |------------------|---------------------------------|----------|
//! | `Actuate`        | `driver_id`, `value`, `password` | yes      |
//! | `Ignition`       | `password`                      | yes      |
//! | `CancelIgnition` |                                 | no       |
//! | `close`          |                                 | no       |
//!
//! Every message is handled on its own. A rejected command changes nothing
//! and produces a reply for the sending connection only; accepted commands
//! are confirmed to every observer through the [`Notifier`].

use crate::actuators::ActuatorBank;
use crate::ignition::IgnitionSequencer;
use crate::notify::Notifier;
use crate::shared::SharedState;
use hotfire_common::device::DeviceError;
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

const COMMAND_TYPES: [&str; 5] = ["Actuate", "Ignition", "CancelIgnition", "close", "Close"];

/// Decoded operator command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Drive one output.
    Actuate {
        /// Actuator id.
        driver_id: usize,
        /// Target level; `true`/`false` or `1`/`0`.
        #[serde(deserialize_with = "switch_value")]
        value: bool,
        /// Operator secret.
        password: String,
    },
    /// Start the ignition countdown.
    Ignition {
        /// Operator secret.
        password: String,
    },
    /// Abort an in-flight countdown.
    CancelIgnition,
    /// Stop the whole process.
    #[serde(rename = "close", alias = "Close")]
    Close,
}

/// Why a command was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// Password did not match the configured secret.
    #[error("Invalid password")]
    InvalidPassword,

    /// `type` names no known command.
    #[error("Unknown command type: {0}")]
    UnknownType(String),

    /// Not JSON, no `type`, or fields missing or mistyped.
    #[error("Invalid command syntax received: {0}")]
    Malformed(String),

    /// `driver_id` outside the configured actuators.
    #[error("Unknown driver id {0}")]
    UnknownDriver(usize),

    /// Shutdown already requested.
    #[error("Shutdown in progress; command ignored")]
    ShuttingDown,

    /// Device refused the write.
    #[error("Actuation failed: {0}")]
    Actuation(#[from] DeviceError),
}

impl CommandError {
    /// Console line sent back to the offending connection.
    pub fn reply(&self) -> String {
        match self {
            Self::Actuation(_) => format!("[E] {self}"),
            _ => format!("[W] {self}"),
        }
    }
}

/// Effect of an accepted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Actuator `id` driven to `value`.
    Actuated {
        /// Actuator id.
        id: usize,
        /// New level.
        value: bool,
    },
    /// Countdown started.
    IgnitionStarted,
    /// Start ignored; a sequence is already in flight.
    IgnitionBusy,
    /// Cancellation requested.
    CancelRequested,
    /// Shutdown flag set.
    ShutdownRequested,
}

/// Decode one raw message.
pub fn parse_command(raw: &str) -> Result<Command, CommandError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| CommandError::Malformed(e.to_string()))?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| CommandError::Malformed("missing \"type\" field".to_string()))?;
    if !COMMAND_TYPES.contains(&kind) {
        return Err(CommandError::UnknownType(kind.to_string()));
    }
    serde_json::from_value(value).map_err(|e| CommandError::Malformed(e.to_string()))
}

fn switch_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Switch {
        Bool(bool),
        Int(i64),
    }

    match Switch::deserialize(deserializer)? {
        Switch::Bool(b) => Ok(b),
        Switch::Int(0) => Ok(false),
        Switch::Int(1) => Ok(true),
        Switch::Int(n) => Err(D::Error::custom(format!("value must be 0 or 1, got {n}"))),
    }
}

fn password_matches(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Routes decoded commands to the actuators, the sequencer and the
/// shutdown flag.
pub struct CommandDispatcher {
    password: String,
    actuators: Arc<ActuatorBank>,
    ignition: IgnitionSequencer,
    shared: Arc<SharedState>,
    notifier: Notifier,
}

impl CommandDispatcher {
    /// Create a dispatcher guarding commands with `password`.
    pub fn new(
        password: impl Into<String>,
        actuators: Arc<ActuatorBank>,
        ignition: IgnitionSequencer,
        shared: Arc<SharedState>,
        notifier: Notifier,
    ) -> Self {
        Self {
            password: password.into(),
            actuators,
            ignition,
            shared,
            notifier,
        }
    }

    /// Handle one raw message.
    ///
    /// Returns the reply for the sending connection if the command was
    /// rejected.
    pub fn handle(&self, raw: &str) -> Option<String> {
        debug!("Received command: {}", raw.trim());
        match parse_command(raw).and_then(|cmd| self.dispatch(cmd)) {
            Ok(applied) => {
                debug!("Command applied: {:?}", applied);
                None
            }
            Err(e) => {
                warn!("Command rejected: {}", e);
                Some(e.reply())
            }
        }
    }

    /// Apply a decoded command.
    pub fn dispatch(&self, command: Command) -> Result<Applied, CommandError> {
        match command {
            Command::Actuate {
                driver_id,
                value,
                password,
            } => {
                self.authorize(&password)?;
                if driver_id >= self.actuators.len() {
                    return Err(CommandError::UnknownDriver(driver_id));
                }
                self.actuators.write_actuator(driver_id, value)?;
                info!("Driver {} set to {}", driver_id, value);
                self.notifier
                    .notify(format!("Driver {driver_id} set to {value}"));
                Ok(Applied::Actuated {
                    id: driver_id,
                    value,
                })
            }
            Command::Ignition { password } => {
                self.authorize(&password)?;
                match self.ignition.start() {
                    Some(_) => Ok(Applied::IgnitionStarted),
                    None => Ok(Applied::IgnitionBusy),
                }
            }
            Command::CancelIgnition => {
                self.notifier.notify("Canceling ignition...");
                self.ignition.cancel();
                Ok(Applied::CancelRequested)
            }
            Command::Close => {
                info!("Close command received");
                if self.shared.shutdown().trip("operator close command") {
                    self.notifier.notify("[I] Close command received; shutting down");
                }
                Ok(Applied::ShutdownRequested)
            }
        }
    }

    fn authorize(&self, password: &str) -> Result<(), CommandError> {
        if self.shared.should_stop() {
            return Err(CommandError::ShuttingDown);
        }
        if !password_matches(&self.password, password) {
            return Err(CommandError::InvalidPassword);
        }
        Ok(())
    }
}
