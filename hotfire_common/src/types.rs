//! Runtime data model.
//!
//! - [`Frame`] - one synchronized scan of raw channel voltages
//! - [`Sample`] - a frame converted to engineering units, with its timestamp
//! - [`ActuatorState`] - driver output states plus the ignition driver index
//! - [`IgnitionState`] - ignition sequencer state

use serde::{Deserialize, Serialize};

/// One scan of raw voltages, ordered like the configured channel list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    values: Vec<f64>,
}

impl Frame {
    /// Wrap a scan.
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Raw voltages.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Raw voltage at channel `index`, if present.
    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Number of channels in the scan.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the scan holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for Frame {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// A converted frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Zero-based position of this sample in the run's sample stream.
    pub sequence: u64,
    /// Seconds since stream start.
    pub time_s: f64,
    /// Engineering-unit values, one per channel.
    pub values: Vec<f64>,
}

/// Output driver states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    states: Vec<bool>,
    ignition: usize,
}

impl ActuatorState {
    /// All drivers off.
    pub fn new(count: usize, ignition: usize) -> Self {
        Self {
            states: vec![false; count],
            ignition,
        }
    }

    /// Build from explicit states.
    pub fn from_states(states: Vec<bool>, ignition: usize) -> Self {
        Self { states, ignition }
    }

    /// State of driver `id`, if it exists.
    #[inline]
    pub fn get(&self, id: usize) -> Option<bool> {
        self.states.get(id).copied()
    }

    /// All driver states in id order.
    #[inline]
    pub fn states(&self) -> &[bool] {
        &self.states
    }

    /// Index of the ignition driver.
    #[inline]
    pub fn ignition_index(&self) -> usize {
        self.ignition
    }

    /// Whether the ignition driver is energized.
    pub fn ignition_energized(&self) -> bool {
        self.get(self.ignition).unwrap_or(false)
    }

    /// Whether every driver is off.
    pub fn all_off(&self) -> bool {
        self.states.iter().all(|s| !s)
    }

    /// Number of drivers.
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no drivers are configured.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Ignition sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IgnitionState {
    /// No sequence in flight.
    #[default]
    Idle,
    /// Counting down; payload is the number of ticks left.
    Countdown(u32),
    /// Ignition driver being energized.
    Firing,
    /// Sequence aborted by the operator.
    Canceled,
}

impl IgnitionState {
    /// Whether a new sequence may start.
    #[inline]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
