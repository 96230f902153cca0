//! Sensor channel classes and calibration.
//!
//! Every analog channel belongs to one [`ChannelClass`]. Conversion from
//! volts to engineering units is linear per class:
//!
//! ```text
//! value = (raw - offset) / scale
//! ```
//!
//! Pressure transducers are individually calibrated, so their pair is keyed
//! by channel name instead of by class.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Physical kind of sensor wired to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelClass {
    /// Thermocouple (degrees).
    Thermocouple,
    /// Large-range load cell (lbf).
    LoadCellLarge,
    /// Small-range load cell (lbf).
    LoadCellSmall,
    /// Strain gauge.
    StrainGauge,
    /// Pressure transducer (psi), calibrated per instance.
    PressureTransducer,
}

impl ChannelClass {
    /// Telemetry group this class is reported under.
    pub const fn group(self) -> SensorGroup {
        match self {
            Self::Thermocouple => SensorGroup::Thermocouples,
            Self::PressureTransducer => SensorGroup::PressureTransducers,
            Self::LoadCellLarge | Self::LoadCellSmall => SensorGroup::LoadCells,
            Self::StrainGauge => SensorGroup::StrainGauges,
        }
    }
}

/// Telemetry grouping of channels. The discriminant is the wire `group_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorGroup {
    /// Thermocouples.
    Thermocouples = 0,
    /// Pressure transducers.
    PressureTransducers = 1,
    /// Large and small load cells.
    LoadCells = 2,
    /// Strain gauges.
    StrainGauges = 3,
}

impl SensorGroup {
    /// All groups in wire order.
    pub const ALL: [SensorGroup; 4] = [
        SensorGroup::Thermocouples,
        SensorGroup::PressureTransducers,
        SensorGroup::LoadCells,
        SensorGroup::StrainGauges,
    ];

    /// Wire `group_id`.
    #[inline]
    pub const fn id(self) -> u32 {
        self as u32
    }
}

/// Linear calibration pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Voltage at zero engineering units.
    pub offset: f64,
    /// Volts per engineering unit.
    pub scale: f64,
}

impl Calibration {
    /// Convert a raw voltage to engineering units (unrounded).
    #[inline]
    pub fn to_engineering(&self, raw: f64) -> f64 {
        (raw - self.offset) / self.scale
    }

    /// Convert an engineering-unit value back to volts.
    #[inline]
    pub fn to_raw(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// A pair is usable when both terms are finite and scale is non-zero.
    pub fn is_valid(&self) -> bool {
        self.offset.is_finite() && self.scale.is_finite() && self.scale != 0.0
    }
}

/// One configured analog input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Human-readable name; also the log column header.
    pub name: String,
    /// Sensor class.
    pub class: ChannelClass,
    /// Device register the channel is sampled from (e.g. `AIN0`).
    pub register: String,
    /// Negative input for differential channels (load cells, strain gauges).
    #[serde(default)]
    pub negative_channel: Option<u8>,
}

impl ChannelConfig {
    /// Whether the channel is wired differentially.
    #[inline]
    pub fn is_differential(&self) -> bool {
        self.negative_channel.is_some()
    }
}

/// Calibration table from the `[calibration]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    /// Shared pair for all thermocouples.
    #[serde(default)]
    pub thermocouple: Option<Calibration>,
    /// Shared pair for large load cells.
    #[serde(default)]
    pub load_cell_large: Option<Calibration>,
    /// Shared pair for small load cells.
    #[serde(default)]
    pub load_cell_small: Option<Calibration>,
    /// Shared pair for strain gauges.
    #[serde(default)]
    pub strain_gauge: Option<Calibration>,
    /// Per-instance pressure transducer pairs, keyed by channel name.
    #[serde(default)]
    pub pressure: BTreeMap<String, Calibration>,
}

impl CalibrationTable {
    /// Look up the calibration pair that applies to `channel`.
    pub fn lookup(&self, channel: &ChannelConfig) -> Option<Calibration> {
        match channel.class {
            ChannelClass::Thermocouple => self.thermocouple,
            ChannelClass::LoadCellLarge => self.load_cell_large,
            ChannelClass::LoadCellSmall => self.load_cell_small,
            ChannelClass::StrainGauge => self.strain_gauge,
            ChannelClass::PressureTransducer => self.pressure.get(&channel.name).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, class: ChannelClass) -> ChannelConfig {
        ChannelConfig {
            name: name.to_string(),
            class,
            register: "AIN0".to_string(),
            negative_channel: None,
        }
    }

    #[test]
    fn calibration_inverse_law() {
        let cal = Calibration {
            offset: 0.5,
            scale: 0.004,
        };
        let value = cal.to_engineering(1.3);
        assert!((value - 200.0).abs() < 1e-9);
        assert!((cal.to_raw(value) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn zero_scale_is_invalid() {
        let cal = Calibration {
            offset: 0.0,
            scale: 0.0,
        };
        assert!(!cal.is_valid());
    }

    #[test]
    fn pressure_lookup_is_per_channel() {
        let mut table = CalibrationTable::default();
        table.pressure.insert(
            "pres_1".to_string(),
            Calibration {
                offset: 0.1,
                scale: 0.01,
            },
        );

        assert!(table
            .lookup(&channel("pres_1", ChannelClass::PressureTransducer))
            .is_some());
        assert!(table
            .lookup(&channel("pres_2", ChannelClass::PressureTransducer))
            .is_none());
        assert!(table
            .lookup(&channel("thermo_1", ChannelClass::Thermocouple))
            .is_none());
    }

    #[test]
    fn load_cells_share_a_group() {
        assert_eq!(ChannelClass::LoadCellLarge.group(), SensorGroup::LoadCells);
        assert_eq!(ChannelClass::LoadCellSmall.group(), SensorGroup::LoadCells);
        assert_eq!(SensorGroup::PressureTransducers.id(), 1);
    }

    #[test]
    fn class_deserializes_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            class: ChannelClass,
        }
        let w: Wrapper = toml::from_str("class = \"load_cell_large\"").unwrap();
        assert_eq!(w.class, ChannelClass::LoadCellLarge);
    }
}
