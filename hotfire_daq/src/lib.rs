//! # Hotfire DAQ Library
//!
//! Real-time acquisition, safety interlock and operator link for the
//! hybrid engine test stand.
//!
//! # Module Structure
//!
//! - [`core`] - DaqCore struct, acquisition loop management
//! - [`convert`] - Voltage to engineering-unit conversion and timestamps
//! - [`emergency`] - Three-strike over-pressure interlock
//! - [`shared`] - Snapshot handoff between the loop and the operator link
//! - [`actuators`] - Serialized output register writes
//! - [`ignition`] - Countdown-then-fire sequencer
//! - [`command`] - Operator command decoding and dispatch
//! - [`telemetry`] - Outbound messages, broadcaster and link watchdog
//! - [`server`] - TCP front end of the operator link
//! - [`sample_log`] - Numbered CSV sample logs
//! - [`notify`] - Operator console notifications
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Acquisition driver implementations
//! - [`error`] - Startup and log error types
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          hotfire_daq                                 │
//! │  ┌──────────────┐   publish    ┌─────────────┐   latest  ┌─────────┐ │
//! │  │   DaqCore    │─────────────▶│ SharedState │──────────▶│Telemetry│ │
//! │  │ (RT thread)  │              └─────────────┘           │(tokio)  │ │
//! │  └──────┬───────┘                                        └────┬────┘ │
//! │         │ check_frame                                         │      │
//! │  ┌──────▼───────┐   write   ┌──────────────┐  observers  ┌────▼────┐ │
//! │  │  Emergency   │──────────▶│ ActuatorBank │◀────────────│ Server  │ │
//! │  │   Monitor    │           └──────▲───────┘  commands   │ (tokio) │ │
//! │  └──────────────┘                  │                     └─────────┘ │
//! │                            ┌───────┴──────┐                          │
//! │                            │  Ignition    │ (thread per sequence)    │
//! │                            └──────────────┘                          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod actuators;
pub mod command;
pub mod convert;
pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod emergency;
pub mod error;
pub mod ignition;
pub mod notify;
pub mod sample_log;
pub mod server;
pub mod shared;
pub mod telemetry;

// Re-export key types for convenience
pub use crate::core::DaqCore;
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::DaqError;
