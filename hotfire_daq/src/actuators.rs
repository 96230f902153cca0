//! Serialized access to the output drivers.
//!
//! The [`ActuatorBank`] is the only path to the device's output registers.
//! Writes from the command dispatcher, the ignition sequencer, the emergency
//! monitor and the shutdown path are serialized by a short write lock held
//! only for the register write itself. Reads of the current state are
//! lock-free, so the acquisition loop can snapshot them every cycle.
//!
//! Once the shutdown flag is set the bank only accepts writes that drive an
//! output off.

use hotfire_common::config::ActuatorConfig;
use hotfire_common::device::{ActuatorPort, DeviceError};
use hotfire_common::shutdown::ShutdownFlag;
use hotfire_common::types::ActuatorState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Id-addressed actuator writes with state tracking.
pub struct ActuatorBank {
    port: Arc<dyn ActuatorPort>,
    registers: Vec<String>,
    states: Vec<AtomicBool>,
    ignition: usize,
    shutdown: ShutdownFlag,
    write_lock: Mutex<()>,
}

impl ActuatorBank {
    /// Create a bank over `port` with the configured actuators.
    ///
    /// Tracked states start off; call [`clear_all`](Self::clear_all) to
    /// force the hardware to match.
    pub fn new(
        port: Arc<dyn ActuatorPort>,
        actuators: &[ActuatorConfig],
        ignition: usize,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            port,
            registers: actuators.iter().map(|a| a.register.clone()).collect(),
            states: actuators.iter().map(|_| AtomicBool::new(false)).collect(),
            ignition,
            shutdown,
            write_lock: Mutex::new(()),
        }
    }

    /// Number of actuators.
    #[inline]
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Whether no actuators are configured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Index of the ignition actuator.
    #[inline]
    pub fn ignition_index(&self) -> usize {
        self.ignition
    }

    /// Drive actuator `id` to `value`.
    ///
    /// The tracked state only changes if the device accepted the write.
    /// Energizing writes are refused with `DeviceError::OutputsLocked` once
    /// shutdown has been requested.
    pub fn write_actuator(&self, id: usize, value: bool) -> Result<(), DeviceError> {
        let register = self
            .registers
            .get(id)
            .ok_or(DeviceError::UnknownActuator(id))?;

        let _guard = self.write_lock.lock();
        // Checked under the lock so no energizing write lands after a clear
        // that started once the flag was set.
        if value && self.shutdown.is_set() {
            warn!("Refusing to energize actuator {} ({}) during shutdown", id, register);
            return Err(DeviceError::OutputsLocked(register.clone()));
        }
        self.port.write_register(register, value)?;
        self.states[id].store(value, Ordering::Release);
        debug!("Actuator {} ({}) set to {}", id, register, value);
        Ok(())
    }

    /// Drive every actuator off.
    ///
    /// Attempts every register even if some fail; returns the first error.
    pub fn clear_all(&self) -> Result<(), DeviceError> {
        let mut first_err = None;
        for id in 0..self.len() {
            if let Err(e) = self.write_actuator(id, false) {
                warn!("Failed to clear actuator {}: {}", id, e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Current state of actuator `id`.
    pub fn state(&self, id: usize) -> Option<bool> {
        self.states.get(id).map(|s| s.load(Ordering::Acquire))
    }

    /// Snapshot of all tracked states.
    pub fn snapshot(&self) -> ActuatorState {
        ActuatorState::from_states(
            self.states.iter().map(|s| s.load(Ordering::Acquire)).collect(),
            self.ignition,
        )
    }
}
