//! Acquisition driver implementations.
//!
//! - [`simulation`] - Software device for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `DaqDriver` trait from `hotfire_common::device`
//! 3. Register its factory in [`register_builtin`]

pub mod simulation;

use crate::driver_registry::DriverRegistry;
use hotfire_common::device::DeviceError;

/// Register all built-in drivers with `registry`.
pub fn register_builtin(registry: &mut DriverRegistry) -> Result<(), DeviceError> {
    registry.register("simulation", simulation::create_driver)
}
