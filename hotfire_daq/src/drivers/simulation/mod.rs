//! Simulation driver module.
//!
//! This module provides a software acquisition device for development and
//! testing without the physical DAQ attached.

mod driver;
mod registers;

pub use driver::{SimulationConfig, SimulationDriver, SimulationHandle};
pub use registers::SimulatedRegisters;

use hotfire_common::device::DaqDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn DaqDriver> {
    Box::new(SimulationDriver::new())
}
