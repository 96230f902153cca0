//! Hotfire Common Library
//!
//! Shared data model, configuration loading and device traits for the
//! hotfire test-stand workspace.
//!
//! # Module Structure
//!
//! - [`channel`] - Sensor channel classes and calibration
//! - [`config`] - `daq.toml` configuration types and the `ConfigLoader` trait
//! - [`consts`] - System-wide constants (precision, strike limit, backlog bound)
//! - [`device`] - Acquisition device and actuator port traits
//! - [`shutdown`] - Process-wide write-once shutdown flag
//! - [`types`] - Frames, samples, actuator and ignition state
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use hotfire_common::prelude::*;
//! ```

pub mod channel;
pub mod config;
pub mod consts;
pub mod device;
pub mod prelude;
pub mod shutdown;
pub mod types;
