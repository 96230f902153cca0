//! Voltage to engineering-unit conversion and batch timestamping.
//!
//! Pure functions; no I/O and no error states. Missing calibration is a
//! startup configuration error, so a [`UnitConverter`] always holds one
//! pair per channel.

use hotfire_common::channel::Calibration;
use hotfire_common::consts::SKIPPED_SAMPLE;
use hotfire_common::types::Frame;

/// Per-channel linear converter.
#[derive(Debug, Clone)]
pub struct UnitConverter {
    calibrations: Vec<Calibration>,
}

impl UnitConverter {
    /// Create a converter from calibration pairs in scan order.
    pub fn new(calibrations: Vec<Calibration>) -> Self {
        Self { calibrations }
    }

    /// Number of channels the converter expects.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.calibrations.len()
    }

    /// Calibration pair of channel `index`.
    #[inline]
    pub fn calibration(&self, index: usize) -> Option<Calibration> {
        self.calibrations.get(index).copied()
    }

    /// Convert one frame, rounding each value to `places` decimals.
    ///
    /// Values beyond the configured channel count and skipped-sample
    /// markers are passed through unconverted.
    pub fn convert_frame(&self, frame: &Frame, places: u32) -> Vec<f64> {
        frame
            .values()
            .iter()
            .enumerate()
            .map(|(i, &raw)| match self.calibrations.get(i) {
                Some(_) if raw == SKIPPED_SAMPLE => raw,
                Some(cal) => round_to(cal.to_engineering(raw), places),
                None => raw,
            })
            .collect()
    }

    /// Convert a batch (N x channels). Column semantics match
    /// [`convert_frame`](Self::convert_frame).
    pub fn convert_batch(&self, frames: &[Frame], places: u32) -> Vec<Vec<f64>> {
        frames
            .iter()
            .map(|frame| self.convert_frame(frame, places))
            .collect()
    }
}

/// Round half away from zero to `places` decimals.
#[inline]
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Timestamps for a batch of `count` frames ending at running total `total`.
///
/// The batch covers sample indices `total - count ..= total - 1`, so the
/// first stamp is `(total - count) / rate` and the last `(total - 1) / rate`,
/// linearly spaced and rounded to `places` decimals.
pub fn batch_timestamps(total: u64, count: usize, sample_rate: u32, places: u32) -> Vec<f64> {
    let count_u = count as u64;
    let first = total.saturating_sub(count_u);
    let rate = f64::from(sample_rate.max(1));
    (0..count_u)
        .map(|i| round_to((first + i) as f64 / rate, places))
        .collect()
}
