//! System-wide constants shared by the acquisition loop, safety interlock
//! and operator link.

use std::time::Duration;

/// Decimal places kept for values written to the sample log.
pub const STORAGE_PRECISION: u32 = 5;

/// Decimal places kept for values shown on the operator console.
pub const DISPLAY_PRECISION: u32 = 2;

/// Consecutive threshold violations that trip the emergency shutdown.
pub const STRIKE_LIMIT: u32 = 3;

/// Additional device reads allowed per acquisition cycle while the device
/// still reports backlog.
pub const MAX_BACKLOG_READS: usize = 15;

/// Upper bound on the acquisition loop's wait for the shared-state write lock.
pub const PUBLISH_TIMEOUT: Duration = Duration::from_millis(50);

/// Upper bound on a reader's wait for the shared-state read lock.
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_millis(10);

/// Value the device substitutes for samples lost to a buffer overflow.
pub const SKIPPED_SAMPLE: f64 = -9999.0;

/// Default ignition countdown length in ticks.
pub const DEFAULT_COUNTDOWN_TICKS: u32 = 10;

/// Default ignition tick period in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Default telemetry broadcast interval in milliseconds.
pub const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 250;

/// Default grace window before a lost operator link forces shutdown.
pub const DEFAULT_RESET_ACTUATORS_MIN: u64 = 5;

/// Column header for the log's time column.
pub const TIME_COLUMN: &str = "Time (s)";

/// Default service name used in logs.
pub const DAQ_SERVICE_NAME: &str = "hotfire_daq";
