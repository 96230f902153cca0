//! Inline over-pressure interlock.
//!
//! Evaluated once per frame inside the acquisition loop, before the frame's
//! data is published. Three consecutive frames above threshold trip the
//! interlock: the shutdown actuator is driven off once and the operator is
//! notified once. A passing frame resets the strike count and re-arms the
//! interlock; further violations without a pass do not re-trigger.

use crate::actuators::ActuatorBank;
use crate::notify::Notifier;
use hotfire_common::channel::Calibration;
use hotfire_common::config::{EmergencyConfig, ThresholdUnits};
use hotfire_common::consts::{SKIPPED_SAMPLE, STRIKE_LIMIT};
use hotfire_common::types::Frame;
use std::sync::Arc;
use tracing::{error, trace, warn};

/// Outcome of evaluating one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Value at or below threshold; strike count reset.
    Clear,
    /// Value above threshold; payload is the strike count so far.
    Strike(u32),
    /// This frame reached the strike limit; fail-safe actuation performed.
    Tripped,
    /// Still above threshold after tripping; no further action.
    Latched(u32),
    /// Frame did not contain a usable value for the monitored channel.
    Missing,
}

/// Strike counter and fail-safe actuator.
pub struct EmergencyMonitor {
    channel: usize,
    threshold: f64,
    units: ThresholdUnits,
    calibration: Calibration,
    shutdown_actuator: usize,
    strikes: u32,
    trips: u64,
    actuators: Arc<ActuatorBank>,
    notifier: Notifier,
}

impl EmergencyMonitor {
    /// Create a monitor for channel `channel` with its calibration pair.
    pub fn new(
        config: &EmergencyConfig,
        channel: usize,
        calibration: Calibration,
        actuators: Arc<ActuatorBank>,
        notifier: Notifier,
    ) -> Self {
        Self {
            channel,
            threshold: config.threshold,
            units: config.units,
            calibration,
            shutdown_actuator: config.shutdown_actuator,
            strikes: 0,
            trips: 0,
            actuators,
            notifier,
        }
    }

    /// Current consecutive-violation count.
    #[inline]
    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    /// Number of fail-safe actuations performed so far.
    #[inline]
    pub fn trips(&self) -> u64 {
        self.trips
    }

    /// Evaluate one frame and act on a trip.
    pub fn check_frame(&mut self, frame: &Frame) -> Evaluation {
        let Some(raw) = frame.get(self.channel) else {
            trace!("Frame of {} values lacks monitored channel {}", frame.len(), self.channel);
            return Evaluation::Missing;
        };
        if raw == SKIPPED_SAMPLE {
            return Evaluation::Missing;
        }

        let value = match self.units {
            ThresholdUnits::Engineering => self.calibration.to_engineering(raw),
            ThresholdUnits::Raw => raw,
        };

        if value <= self.threshold || value.is_nan() {
            self.strikes = 0;
            return Evaluation::Clear;
        }

        self.strikes = self.strikes.saturating_add(1);
        if self.strikes < STRIKE_LIMIT {
            trace!("Emergency strike {} ({} > {})", self.strikes, value, self.threshold);
            return Evaluation::Strike(self.strikes);
        }
        if self.strikes > STRIKE_LIMIT {
            return Evaluation::Latched(self.strikes);
        }

        self.trips += 1;
        warn!(
            "Emergency threshold exceeded {} times in a row ({} > {}); closing actuator {}",
            STRIKE_LIMIT, value, self.threshold, self.shutdown_actuator
        );
        match self.actuators.write_actuator(self.shutdown_actuator, false) {
            Ok(()) => self.notifier.notify("[W] Emergency shutdown executed!"),
            Err(e) => {
                error!("Emergency shutdown actuation failed: {}", e);
                self.notifier
                    .notify(format!("[E] Emergency shutdown actuation failed: {e}"));
            }
        }
        Evaluation::Tripped
    }
}
