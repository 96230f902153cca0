//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `DaqDriver` trait with a software
//! device: noisy voltages around a baseline, optional per-channel overrides,
//! a queue of scripted batches and errors, and backlog reporting when the
//! caller falls behind the configured read period.

use super::registers::SimulatedRegisters;
use hotfire_common::device::{ActuatorPort, DaqDriver, DeviceError, StreamBatch, StreamSpec};
use hotfire_common::types::Frame;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lag after which the simulated device buffer is considered overrun.
const OVERRUN_LAG: Duration = Duration::from_secs(1);

/// Tunables of the simulated device.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Voltage every channel idles at.
    pub baseline_volts: f64,
    /// Peak amplitude of uniform noise added to every value.
    pub noise_volts: f64,
    /// Block each read until its batch would be complete on real hardware.
    pub realtime: bool,
    /// Fixed RNG seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            baseline_volts: 0.0,
            noise_volts: 0.001,
            realtime: true,
            seed: None,
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    batches: VecDeque<Result<StreamBatch, DeviceError>>,
    overrides: BTreeMap<usize, f64>,
    accepted_rate: Option<u32>,
}

#[derive(Debug)]
struct ActiveStream {
    channels: usize,
    scans_per_read: usize,
    period: Duration,
    next_deadline: Instant,
}

/// Test and scenario control over a running [`SimulationDriver`].
#[derive(Debug, Clone)]
pub struct SimulationHandle {
    script: Arc<Mutex<Script>>,
    registers: Arc<SimulatedRegisters>,
}

impl SimulationHandle {
    /// Return `frames` from the next read, reporting `backlog` scans left.
    pub fn queue_frames(&self, frames: Vec<Frame>, backlog: usize) {
        self.script
            .lock()
            .batches
            .push_back(Ok(StreamBatch { frames, backlog }));
    }

    /// Fail the next read with `reason`.
    pub fn queue_read_error(&self, reason: &str) {
        self.script
            .lock()
            .batches
            .push_back(Err(DeviceError::Read(reason.to_string())));
    }

    /// Scripted reads not yet consumed.
    pub fn pending(&self) -> usize {
        self.script.lock().batches.len()
    }

    /// Pin channel `index` to `volts` in generated frames.
    pub fn set_override(&self, index: usize, volts: f64) {
        self.script.lock().overrides.insert(index, volts);
    }

    /// Release a pinned channel.
    pub fn clear_override(&self, index: usize) {
        self.script.lock().overrides.remove(&index);
    }

    /// Make the device accept `rate` regardless of the requested one.
    pub fn force_rate(&self, rate: u32) {
        self.script.lock().accepted_rate = Some(rate);
    }

    /// Output registers of the device.
    pub fn registers(&self) -> Arc<SimulatedRegisters> {
        Arc::clone(&self.registers)
    }
}

/// Simulation driver implementing the DaqDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    config: SimulationConfig,
    rng: StdRng,
    script: Arc<Mutex<Script>>,
    registers: Arc<SimulatedRegisters>,
    stream: Option<ActiveStream>,
}

impl SimulationDriver {
    /// Create a simulation driver with default tunables.
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Create a simulation driver with explicit tunables.
    pub fn with_config(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            config,
            rng,
            script: Arc::new(Mutex::new(Script::default())),
            registers: Arc::new(SimulatedRegisters::default()),
            stream: None,
        }
    }

    /// Control handle; stays valid after the driver is boxed.
    pub fn handle(&self) -> SimulationHandle {
        SimulationHandle {
            script: Arc::clone(&self.script),
            registers: Arc::clone(&self.registers),
        }
    }

    fn generate(&mut self, channels: usize, scans: usize) -> Vec<Frame> {
        let overrides = self.script.lock().overrides.clone();
        let noise = self.config.noise_volts.abs();
        (0..scans)
            .map(|_| {
                Frame::new(
                    (0..channels)
                        .map(|ch| match overrides.get(&ch) {
                            Some(&volts) => volts,
                            None if noise > 0.0 => {
                                self.config.baseline_volts + self.rng.gen_range(-noise..=noise)
                            }
                            None => self.config.baseline_volts,
                        })
                        .collect(),
                )
            })
            .collect()
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DaqDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn configure_stream(&mut self, spec: &StreamSpec<'_>) -> Result<u32, DeviceError> {
        if spec.channels.is_empty() {
            return Err(DeviceError::StreamConfig("empty scan list".to_string()));
        }
        if spec.sample_rate == 0 || spec.scans_per_read == 0 {
            return Err(DeviceError::StreamConfig(
                "sample rate and scans per read must be non-zero".to_string(),
            ));
        }

        let scan_list: Vec<&str> = spec.channels.iter().map(|c| c.register.as_str()).collect();
        let differential = spec.channels.iter().filter(|c| c.is_differential()).count();
        info!(
            "Simulated stream: {} channels {:?}, {} differential (10x gain), {} Hz, {} scans/read",
            scan_list.len(),
            scan_list,
            differential,
            spec.sample_rate,
            spec.scans_per_read
        );

        let accepted = self.script.lock().accepted_rate.unwrap_or(spec.sample_rate);
        let period = Duration::from_secs_f64(
            f64::from(spec.scans_per_read) / f64::from(accepted.max(1)),
        );
        self.stream = Some(ActiveStream {
            channels: spec.channels.len(),
            scans_per_read: spec.scans_per_read as usize,
            period,
            next_deadline: Instant::now() + period,
        });
        Ok(accepted)
    }

    fn read_batch(&mut self) -> Result<StreamBatch, DeviceError> {
        let (channels, scans, backlog) = {
            let Some(stream) = self.stream.as_mut() else {
                return Err(DeviceError::NotStreaming);
            };

            if let Some(scripted) = self.script.lock().batches.pop_front() {
                return scripted;
            }

            let mut backlog = 0;
            if self.config.realtime {
                let now = Instant::now();
                if stream.next_deadline > now {
                    std::thread::sleep(stream.next_deadline - now);
                    stream.next_deadline += stream.period;
                } else {
                    let lag = now - stream.next_deadline;
                    if lag > OVERRUN_LAG {
                        warn!("Simulated device buffer overrun ({:?} behind); resynchronizing", lag);
                        stream.next_deadline = now + stream.period;
                    } else {
                        let periods_behind =
                            (lag.as_secs_f64() / stream.period.as_secs_f64()) as usize;
                        backlog = periods_behind * stream.scans_per_read;
                        stream.next_deadline += stream.period;
                    }
                }
            }
            (stream.channels, stream.scans_per_read, backlog)
        };

        Ok(StreamBatch {
            frames: self.generate(channels, scans),
            backlog,
        })
    }

    fn stop_stream(&mut self) -> Result<(), DeviceError> {
        if self.stream.take().is_some() {
            debug!("Simulated stream stopped");
        }
        Ok(())
    }

    fn actuator_port(&self) -> Arc<dyn ActuatorPort> {
        self.registers.clone()
    }
}
