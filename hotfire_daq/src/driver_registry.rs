//! Named acquisition drivers.
//!
//! `main` builds a [`DriverRegistry`] with the built-in drivers and picks
//! one by the name given in `[general] driver` or on the command line.

use hotfire_common::device::{DaqDriver, DeviceError};
use tracing::debug;

/// Constructor for a fresh, unconfigured driver.
pub type DriverFactory = fn() -> Box<dyn DaqDriver>;

/// Drivers selectable by name, in registration order.
#[derive(Default)]
pub struct DriverRegistry {
    entries: Vec<(&'static str, DriverFactory)>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in driver.
    ///
    /// # Errors
    /// Returns `DeviceError::DuplicateDriver` if two built-ins share a name.
    pub fn with_builtin() -> Result<Self, DeviceError> {
        let mut registry = Self::new();
        crate::drivers::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Add a driver under `name`.
    ///
    /// # Errors
    /// Returns `DeviceError::DuplicateDriver` if `name` is taken; the
    /// existing entry is kept.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: DriverFactory,
    ) -> Result<(), DeviceError> {
        if self.contains(name) {
            return Err(DeviceError::DuplicateDriver(name.to_string()));
        }
        self.entries.push((name, factory));
        Ok(())
    }

    /// Whether a driver is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| *n == name)
    }

    /// Instantiate the driver registered under `name`.
    ///
    /// # Errors
    /// Returns `DeviceError::DriverNotFound` if the name is unknown.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn DaqDriver>, DeviceError> {
        let (_, factory) = self
            .entries
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| DeviceError::DriverNotFound(name.to_string()))?;
        let driver = factory();
        debug!("Created driver {} v{}", driver.name(), driver.version());
        Ok(driver)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }
}
