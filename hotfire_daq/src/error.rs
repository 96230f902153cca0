//! Runtime error types for the acquisition unit.
//!
//! Only [`DaqError`] is allowed to end the process, and only during startup.
//! Everything raised after the stream starts is logged, reported to the
//! operator and recovered where it occurred.

use hotfire_common::config::ConfigError;
use hotfire_common::device::DeviceError;
use thiserror::Error;

/// Startup failure.
#[derive(Debug, Error)]
pub enum DaqError {
    /// Invalid or unreadable configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Device could not be opened or configured.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Sample log could not be created.
    #[error(transparent)]
    Log(#[from] LogError),

    /// Operator link could not be bound.
    #[error("Operator link error: {0}")]
    Link(#[from] std::io::Error),
}

/// Sample log failure.
#[derive(Debug, Error)]
pub enum LogError {
    /// Underlying file I/O failed.
    #[error("Sample log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failed.
    #[error("Sample log CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A row did not match the header width.
    #[error("Row has {got} values, log expects {expected}")]
    ColumnMismatch {
        /// Values per row the header declares.
        expected: usize,
        /// Values supplied.
        got: usize,
    },
}
