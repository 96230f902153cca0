//! Outbound wire messages.
//!
//! Every message is one JSON object per line with a `type` discriminator:
//!
//! ```text
//! {"type":"SensorValue","group_id":1,"readings":[{"sensor_id":0,"reading":101.25,"time":{...}}]}
//! {"type":"DriverValue","values":[false,true,false]}
//! {"type":"Console","message":"Ignition in 3..."}
//! ```

use crate::convert::round_to;
use crate::shared::Snapshot;
use hotfire_common::channel::{ChannelConfig, SensorGroup};
use hotfire_common::consts::DISPLAY_PRECISION;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock instant as seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTime {
    /// Whole seconds.
    pub secs_since_epoch: u64,
    /// Sub-second nanoseconds.
    pub nanos_since_epoch: u32,
}

impl From<SystemTime> for WireTime {
    fn from(time: SystemTime) -> Self {
        let since = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            secs_since_epoch: since.as_secs(),
            nanos_since_epoch: since.subsec_nanos(),
        }
    }
}

/// One sensor value in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Position within its group.
    pub sensor_id: usize,
    /// Engineering-unit value at display precision.
    pub reading: f64,
    /// Publication time of the sample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<WireTime>,
}

/// Message sent to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Outbound {
    /// Readings of one sensor group.
    SensorValue {
        /// Wire id of the group.
        group_id: u32,
        /// Readings in sensor-id order.
        readings: Vec<Reading>,
    },
    /// Actuator states in id order.
    DriverValue {
        /// `true` is energized.
        values: Vec<bool>,
    },
    /// Free-text operator notification.
    Console {
        /// Message text.
        message: String,
    },
}

impl Outbound {
    /// Console notification.
    pub fn console(message: impl Into<String>) -> Self {
        Self::Console {
            message: message.into(),
        }
    }

    /// Serialize as one newline-terminated line.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Channel indices of every non-empty sensor group, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryLayout {
    groups: Vec<(SensorGroup, Vec<usize>)>,
}

impl TelemetryLayout {
    /// Group `channels` by class, preserving configuration order inside each group.
    pub fn from_channels(channels: &[ChannelConfig]) -> Self {
        let groups = SensorGroup::ALL
            .iter()
            .map(|&group| {
                let members: Vec<usize> = channels
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.class.group() == group)
                    .map(|(i, _)| i)
                    .collect();
                (group, members)
            })
            .filter(|(_, members)| !members.is_empty())
            .collect();
        Self { groups }
    }

    /// Non-empty groups with their channel indices.
    pub fn groups(&self) -> &[(SensorGroup, Vec<usize>)] {
        &self.groups
    }

    /// Messages for one broadcast tick: one per group, then the driver states.
    pub fn messages(&self, snapshot: &Snapshot) -> Vec<Outbound> {
        let time = Some(WireTime::from(snapshot.published_at));
        let values = &snapshot.sample.values;

        let mut out: Vec<Outbound> = self
            .groups
            .iter()
            .map(|(group, members)| Outbound::SensorValue {
                group_id: group.id(),
                readings: members
                    .iter()
                    .enumerate()
                    .filter_map(|(sensor_id, &channel)| {
                        values.get(channel).map(|&v| Reading {
                            sensor_id,
                            reading: round_to(v, DISPLAY_PRECISION),
                            time,
                        })
                    })
                    .collect(),
            })
            .collect();

        out.push(Outbound::DriverValue {
            values: snapshot.actuators.states().to_vec(),
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hotfire_common::channel::ChannelClass;
    use hotfire_common::types::{ActuatorState, Sample};
    use std::time::Duration;

    fn channel(name: &str, class: ChannelClass) -> ChannelConfig {
        ChannelConfig {
            name: name.to_string(),
            class,
            register: "AIN0".to_string(),
            negative_channel: None,
        }
    }

    fn layout() -> TelemetryLayout {
        TelemetryLayout::from_channels(&[
            channel("pres_1", ChannelClass::PressureTransducer),
            channel("thermo_1", ChannelClass::Thermocouple),
            channel("b_load", ChannelClass::LoadCellLarge),
            channel("thermo_2", ChannelClass::Thermocouple),
            channel("s_load", ChannelClass::LoadCellSmall),
        ])
    }

    #[test]
    fn groups_in_wire_order_without_empties() {
        let groups: Vec<(u32, Vec<usize>)> = layout()
            .groups()
            .iter()
            .map(|(g, m)| (g.id(), m.clone()))
            .collect();
        assert_eq!(groups, vec![(0, vec![1, 3]), (1, vec![0]), (2, vec![2, 4])]);
    }

    #[test]
    fn messages_round_and_stamp() {
        let snapshot = Snapshot {
            sample: Sample {
                sequence: 9,
                time_s: 0.03,
                values: vec![101.23456, 20.5, 3.14159, 21.0, -0.004],
            },
            actuators: ActuatorState::from_states(vec![true, false], 1),
            published_at: UNIX_EPOCH + Duration::new(1_700_000_000, 500),
        };
        let messages = layout().messages(&snapshot);
        assert_eq!(messages.len(), 4);

        let Outbound::SensorValue { group_id, readings } = &messages[1] else {
            panic!("expected pressure group");
        };
        assert_eq!(*group_id, 1);
        assert_eq!(readings[0].reading, 101.23);
        assert_eq!(
            readings[0].time,
            Some(WireTime {
                secs_since_epoch: 1_700_000_000,
                nanos_since_epoch: 500
            })
        );
        assert_eq!(
            messages[3],
            Outbound::DriverValue {
                values: vec![true, false]
            }
        );
    }

    #[test]
    fn wire_shape() {
        let line = Outbound::console("Ignition in 3...").to_line().unwrap();
        assert_eq!(line, "{\"type\":\"Console\",\"message\":\"Ignition in 3...\"}\n");

        let line = Outbound::SensorValue {
            group_id: 0,
            readings: vec![Reading {
                sensor_id: 0,
                reading: 20.5,
                time: None,
            }],
        }
        .to_line()
        .unwrap();
        assert_eq!(
            line,
            "{\"type\":\"SensorValue\",\"group_id\":0,\"readings\":[{\"sensor_id\":0,\"reading\":20.5}]}\n"
        );
    }
}
