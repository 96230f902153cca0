//! Simulated output registers.
//!
//! Every write is recorded so scenario tests can assert on the exact
//! sequence of actuations. A register can be told to fail to exercise the
//! error paths of its callers.

use hotfire_common::device::{ActuatorPort, DeviceError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Digital output bank of the simulated device.
#[derive(Debug, Default)]
pub struct SimulatedRegisters {
    inner: Mutex<RegisterState>,
}

#[derive(Debug, Default)]
struct RegisterState {
    values: BTreeMap<String, bool>,
    writes: Vec<(String, bool)>,
    failing: BTreeSet<String>,
}

impl SimulatedRegisters {
    /// Current level of `register`; `None` if it was never written.
    pub fn value(&self, register: &str) -> Option<bool> {
        self.inner.lock().values.get(register).copied()
    }

    /// Every accepted write, in order.
    pub fn writes(&self) -> Vec<(String, bool)> {
        self.inner.lock().writes.clone()
    }

    /// Make writes to `register` fail until [`heal`](Self::heal) is called.
    pub fn fail(&self, register: &str) {
        self.inner.lock().failing.insert(register.to_string());
    }

    /// Accept writes to `register` again.
    pub fn heal(&self, register: &str) {
        self.inner.lock().failing.remove(register);
    }
}

impl ActuatorPort for SimulatedRegisters {
    fn write_register(&self, register: &str, value: bool) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock();
        if inner.failing.contains(register) {
            return Err(DeviceError::Write {
                register: register.to_string(),
                reason: "simulated fault".to_string(),
            });
        }
        trace!("Simulated register {} <- {}", register, value);
        inner.values.insert(register.to_string(), value);
        inner.writes.push((register.to_string(), value));
        Ok(())
    }
}
