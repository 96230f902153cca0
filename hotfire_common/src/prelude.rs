//! Prelude module for common re-exports.
//!
//! ```rust
//! use hotfire_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, DaqConfig, LogLevel, ThresholdUnits};

// ─── Channels ───────────────────────────────────────────────────────
pub use crate::channel::{Calibration, ChannelClass, ChannelConfig, SensorGroup};

// ─── Device ─────────────────────────────────────────────────────────
pub use crate::device::{ActuatorPort, DaqDriver, DeviceError, StreamBatch, StreamSpec};

// ─── Runtime data ───────────────────────────────────────────────────
pub use crate::shutdown::ShutdownFlag;
pub use crate::types::{ActuatorState, Frame, IgnitionState, Sample};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DISPLAY_PRECISION, STORAGE_PRECISION, STRIKE_LIMIT};
