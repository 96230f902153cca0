//! Configuration loading and the `daq.toml` schema.
//!
//! Any deserializable type can be read from a TOML file through the
//! [`ConfigLoader`] blanket trait. [`DaqConfig`] is the top-level schema of
//! the acquisition unit; it must pass [`DaqConfig::validate`] before any
//! stream is started.
//!
//! # TOML Example
//!
//! ```toml
//! [general]
//! sample_rate = 300
//! reads_per_sec = 30
//!
//! [[channels]]
//! name = "pres_1"
//! class = "pressure_transducer"
//! register = "AIN0"
//!
//! [calibration.pressure.pres_1]
//! offset = 0.5
//! scale = 0.004
//!
//! [[actuators]]
//! name = "main_valve"
//! register = "EIO0"
//!
//! [emergency]
//! sensor_name = "pres_1"
//! threshold = 750.0
//! shutdown_actuator = 0
//!
//! [ignition]
//! actuator = 0
//!
//! [operator]
//! password = "changeme"
//! ```

use crate::channel::{Calibration, CalibrationTable, ChannelConfig};
use crate::consts::{
    DAQ_SERVICE_NAME, DEFAULT_COUNTDOWN_TICKS, DEFAULT_RESET_ACTUATORS_MIN,
    DEFAULT_TELEMETRY_INTERVAL_MS, DEFAULT_TICK_MS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Development detail.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Potential problems.
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Fields common to every service in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance identifier used in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

/// Load a configuration type from a TOML file.
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax or shape is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load and deserialize `path`.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

fn default_service_name() -> String {
    DAQ_SERVICE_NAME.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_countdown() -> u32 {
    DEFAULT_COUNTDOWN_TICKS
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_interval_ms() -> u64 {
    DEFAULT_TELEMETRY_INTERVAL_MS
}

fn default_reset_min() -> u64 {
    DEFAULT_RESET_ACTUATORS_MIN
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// `[general]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Scan rate in Hz.
    pub sample_rate: u32,
    /// Device reads per second; `sample_rate / reads_per_sec` scans per read.
    pub reads_per_sec: u32,
    /// Directory receiving `test_data_NNN.csv` logs.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Driver name looked up in the driver registry.
    #[serde(default = "default_driver")]
    pub driver: String,
}

/// One `[[actuators]]` entry. The actuator id is its position in the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorConfig {
    /// Human-readable name.
    pub name: String,
    /// Device output register (e.g. `EIO0`).
    pub register: String,
}

/// Representation the emergency threshold is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnits {
    /// Compare the calibrated engineering-unit value.
    #[default]
    Engineering,
    /// Compare the raw channel voltage.
    Raw,
}

/// `[emergency]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// Name of the monitored channel.
    pub sensor_name: String,
    /// Values strictly above this count as a strike.
    pub threshold: f64,
    /// Representation `threshold` is expressed in.
    #[serde(default)]
    pub units: ThresholdUnits,
    /// Actuator driven off when the interlock trips.
    pub shutdown_actuator: usize,
}

/// `[ignition]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnitionConfig {
    /// Actuator energized at the end of the countdown.
    pub actuator: usize,
    /// Countdown length in ticks.
    #[serde(default = "default_countdown")]
    pub countdown_s: u32,
    /// Tick period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl IgnitionConfig {
    /// Tick period.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// `[telemetry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Listen address of the operator link.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Broadcast interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Minutes the operator link may be down before actuators are reset.
    #[serde(default = "default_reset_min")]
    pub reset_actuators_min: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            interval_ms: default_interval_ms(),
            reset_actuators_min: default_reset_min(),
        }
    }
}

impl TelemetryConfig {
    /// Broadcast interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Disconnect grace window.
    pub fn grace_window(&self) -> Duration {
        Duration::from_secs(self.reset_actuators_min * 60)
    }
}

/// `[operator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Shared secret required by actuate and ignition commands.
    pub password: String,
}

/// Top-level configuration loaded from `daq.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaqConfig {
    /// Common service fields.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Stream parameters.
    pub general: GeneralConfig,
    /// Analog inputs in scan order.
    pub channels: Vec<ChannelConfig>,
    /// Calibration pairs.
    #[serde(default)]
    pub calibration: CalibrationTable,
    /// Output drivers in id order.
    pub actuators: Vec<ActuatorConfig>,
    /// Safety interlock.
    pub emergency: EmergencyConfig,
    /// Ignition sequencer.
    pub ignition: IgnitionConfig,
    /// Operator link.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Operator authentication.
    pub operator: OperatorConfig,
}

impl DaqConfig {
    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// 1. `sample_rate` > 0, `reads_per_sec` > 0, and `reads_per_sec` divides `sample_rate`
    /// 2. At least one channel, channel names unique
    /// 3. Every channel has a usable calibration pair
    /// 4. At least one actuator, actuator names unique
    /// 5. Emergency sensor names a configured channel; shutdown actuator exists
    /// 6. Ignition actuator exists; countdown and tick > 0
    /// 7. Telemetry interval and grace window > 0
    /// 8. Operator password not empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let general = &self.general;
        if general.sample_rate == 0 || general.reads_per_sec == 0 {
            return Err(invalid("sample_rate and reads_per_sec must be greater than 0"));
        }
        if general.sample_rate % general.reads_per_sec != 0 {
            return Err(invalid(format!(
                "reads_per_sec ({}) must divide sample_rate ({})",
                general.reads_per_sec, general.sample_rate
            )));
        }

        if self.channels.is_empty() {
            return Err(invalid("at least one channel must be configured"));
        }
        let mut names = HashSet::new();
        for channel in &self.channels {
            if !names.insert(channel.name.as_str()) {
                return Err(invalid(format!("Duplicate channel name: {}", channel.name)));
            }
        }

        self.calibrations()?;

        if self.actuators.is_empty() {
            return Err(invalid("at least one actuator must be configured"));
        }
        let mut names = HashSet::new();
        for actuator in &self.actuators {
            if !names.insert(actuator.name.as_str()) {
                return Err(invalid(format!("Duplicate actuator name: {}", actuator.name)));
            }
        }

        self.emergency_channel_index()?;
        if !self.emergency.threshold.is_finite() {
            return Err(invalid("emergency threshold must be finite"));
        }
        if self.emergency.shutdown_actuator >= self.actuators.len() {
            return Err(invalid(format!(
                "emergency shutdown_actuator {} out of range (have {})",
                self.emergency.shutdown_actuator,
                self.actuators.len()
            )));
        }

        if self.ignition.actuator >= self.actuators.len() {
            return Err(invalid(format!(
                "ignition actuator {} out of range (have {})",
                self.ignition.actuator,
                self.actuators.len()
            )));
        }
        if self.ignition.countdown_s == 0 || self.ignition.tick_ms == 0 {
            return Err(invalid("ignition countdown_s and tick_ms must be greater than 0"));
        }

        if self.telemetry.interval_ms == 0 {
            return Err(invalid("telemetry interval_ms must be greater than 0"));
        }
        if self.telemetry.reset_actuators_min == 0 {
            return Err(invalid("telemetry reset_actuators_min must be greater than 0"));
        }

        if self.operator.password.is_empty() {
            return Err(invalid("operator password cannot be empty"));
        }

        Ok(())
    }

    /// Scans returned per device read.
    pub fn scans_per_read(&self) -> u32 {
        self.general.sample_rate / self.general.reads_per_sec.max(1)
    }

    /// Calibration pair for every channel, in scan order.
    pub fn calibrations(&self) -> Result<Vec<Calibration>, ConfigError> {
        self.channels
            .iter()
            .map(|channel| {
                let cal = self.calibration.lookup(channel).ok_or_else(|| {
                    invalid(format!(
                        "missing {:?} calibration for channel '{}'",
                        channel.class, channel.name
                    ))
                })?;
                if !cal.is_valid() {
                    return Err(invalid(format!(
                        "calibration for channel '{}' must have finite offset and non-zero scale",
                        channel.name
                    )));
                }
                Ok(cal)
            })
            .collect()
    }

    /// Index of the emergency-monitored channel in scan order.
    pub fn emergency_channel_index(&self) -> Result<usize, ConfigError> {
        self.channels
            .iter()
            .position(|c| c.name == self.emergency.sensor_name)
            .ok_or_else(|| {
                invalid(format!(
                    "emergency sensor_name '{}' not found in channel list",
                    self.emergency.sensor_name
                ))
            })
    }

    /// Log column headers: time followed by channel names.
    pub fn log_columns(&self) -> Vec<String> {
        std::iter::once(crate::consts::TIME_COLUMN.to_string())
            .chain(self.channels.iter().map(|c| c.name.clone()))
            .collect()
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}
