//! Acquisition device traits and error types.
//!
//! This module defines:
//! - `DaqDriver` trait - Streamed analog acquisition from a device
//! - `ActuatorPort` trait - Named-register writes to output drivers
//! - `DeviceError` enum - Error types for device operations
//! - `StreamSpec` / `StreamBatch` - Stream configuration and read results

use crate::channel::ChannelConfig;
use crate::types::Frame;
use std::sync::Arc;
use thiserror::Error;

/// Error types for device operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    /// Stream could not be configured.
    #[error("Stream configuration failed: {0}")]
    StreamConfig(String),

    /// Device reported a sample rate other than the one requested.
    #[error("Failed to configure data stream: requested {requested} Hz, device reports {actual} Hz")]
    RateMismatch {
        /// Requested rate.
        requested: u32,
        /// Rate the device accepted.
        actual: u32,
    },

    /// A batched read failed.
    #[error("Stream read failed: {0}")]
    Read(String),

    /// A register write failed.
    #[error("Register write to {register} failed: {reason}")]
    Write {
        /// Register name.
        register: String,
        /// Device-reported reason.
        reason: String,
    },

    /// Operation requires an active stream.
    #[error("Stream not started")]
    NotStreaming,

    /// Outputs may only be driven off once shutdown has been requested.
    #[error("Outputs locked by shutdown, refusing to energize {0}")]
    OutputsLocked(String),

    /// Actuator id outside the configured list.
    #[error("Unknown actuator id {0}")]
    UnknownActuator(usize),

    /// No driver registered under the requested name.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// A driver name was registered twice.
    #[error("Driver '{0}' is already registered")]
    DuplicateDriver(String),
}

/// Parameters handed to [`DaqDriver::configure_stream`].
#[derive(Debug, Clone, Copy)]
pub struct StreamSpec<'a> {
    /// Channels in scan order.
    pub channels: &'a [ChannelConfig],
    /// Requested scan rate in Hz.
    pub sample_rate: u32,
    /// Scans returned per read call.
    pub scans_per_read: u32,
}

/// Result of one [`DaqDriver::read_batch`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamBatch {
    /// Scans retrieved by this read, in arrival order.
    pub frames: Vec<Frame>,
    /// Scans still buffered inside the device.
    pub backlog: usize,
}

/// Output side of the device: writes boolean driver registers.
///
/// Shared between the command dispatcher, the ignition sequencer, the
/// emergency monitor and the shutdown path. Implementations must be
/// callable from several threads.
pub trait ActuatorPort: Send + Sync {
    /// Drive `register` high (`true`) or low (`false`).
    fn write_register(&self, register: &str, value: bool) -> Result<(), DeviceError>;
}

/// Trait defining the interface for acquisition drivers.
///
/// # Lifecycle
///
/// 1. `configure_stream()` - Called once before the acquisition loop starts
/// 2. `read_batch()` - Called repeatedly from the acquisition loop
/// 3. `stop_stream()` - Called on the shutdown path
///
/// # Timing Contracts
///
/// | Operation | Max Duration | RT Constraint |
/// |-----------|--------------|---------------|
/// | `configure_stream()` | seconds | None (pre-RT) |
/// | `read_batch()` | one read period | **HARD** |
/// | `stop_stream()` | 1 second | None (post-RT) |
pub trait DaqDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Program the scan list and start streaming.
    ///
    /// Returns the sample rate the device actually accepted.
    fn configure_stream(&mut self, spec: &StreamSpec<'_>) -> Result<u32, DeviceError>;

    /// Retrieve the next batch of scans.
    ///
    /// May block for up to one read period while the device fills a batch.
    fn read_batch(&mut self) -> Result<StreamBatch, DeviceError>;

    /// Stop streaming. Idempotent.
    fn stop_stream(&mut self) -> Result<(), DeviceError>;

    /// Handle to the device's output registers.
    fn actuator_port(&self) -> Arc<dyn ActuatorPort>;
}
