//! DAQ Core struct and acquisition loop management.
//!
//! `DaqCore` owns the driver, the converter, the emergency monitor and the
//! sample log. Each cycle drains the device, checks every frame against the
//! interlock, converts and logs the batch, then publishes the last sample to
//! [`SharedState`]. Nothing after [`DaqCore::start`] ends the loop except
//! the shutdown flag.

use crate::actuators::ActuatorBank;
use crate::convert::{batch_timestamps, UnitConverter};
use crate::emergency::EmergencyMonitor;
use crate::error::DaqError;
use crate::notify::Notifier;
use crate::sample_log::SampleSink;
use crate::shared::{SharedState, Snapshot};
use hotfire_common::channel::ChannelConfig;
use hotfire_common::config::DaqConfig;
use hotfire_common::consts::{MAX_BACKLOG_READS, PUBLISH_TIMEOUT, SKIPPED_SAMPLE, STORAGE_PRECISION};
use hotfire_common::device::{DaqDriver, DeviceError, StreamSpec};
use hotfire_common::types::{Frame, Sample};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, error, info, warn};

/// Pause after a failed read before trying again.
const READ_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Samples between progress log lines.
const PROGRESS_INTERVAL: u64 = 1000;

/// Timing statistics for acquisition loop monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    /// Number of cycles executed
    pub cycle_count: u64,
    /// Cycles whose processing exceeded one read period
    pub timing_violations: u64,
    /// Maximum observed processing time
    pub max_cycle_time_us: u64,
    /// Sum of processing times for average calculation
    pub total_cycle_time_us: u64,
    /// Cycles whose snapshot could not be published in time
    pub skipped_publishes: u64,
    /// Failed device reads
    pub read_errors: u64,
    /// Device-marked lost samples
    pub skipped_samples: u64,
}

/// What one cycle did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Device reads performed, including the first.
    pub reads: usize,
    /// Frames received.
    pub frames: usize,
    /// Values carrying the lost-sample sentinel.
    pub skipped_samples: usize,
    /// A device read failed this cycle.
    pub read_failed: bool,
    /// Rows reached the sample log.
    pub logged: bool,
    /// Snapshot reached shared state.
    pub published: bool,
}

/// DAQ Core manages the driver and the acquisition loop.
pub struct DaqCore {
    driver: Box<dyn DaqDriver>,
    channels: Vec<ChannelConfig>,
    converter: UnitConverter,
    monitor: EmergencyMonitor,
    actuators: Arc<ActuatorBank>,
    shared: Arc<SharedState>,
    notifier: Notifier,
    log: Box<dyn SampleSink>,
    sample_rate: u32,
    scans_per_read: u32,
    read_period: Duration,
    total_samples: u64,
    streaming: bool,
    stats: LoopStats,
}

impl DaqCore {
    /// Create a new DaqCore from a validated configuration.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn new(
        config: &DaqConfig,
        driver: Box<dyn DaqDriver>,
        actuators: Arc<ActuatorBank>,
        shared: Arc<SharedState>,
        notifier: Notifier,
        log: Box<dyn SampleSink>,
    ) -> Result<Self, DaqError> {
        config.validate()?;

        let calibrations = config.calibrations()?;
        let channel = config.emergency_channel_index()?;
        let monitor = EmergencyMonitor::new(
            &config.emergency,
            channel,
            calibrations[channel],
            Arc::clone(&actuators),
            notifier.clone(),
        );

        let sample_rate = config.general.sample_rate;
        let scans_per_read = config.scans_per_read();
        let read_period = Duration::from_secs_f64(f64::from(scans_per_read) / f64::from(sample_rate));

        info!(
            "DaqCore created with driver '{}' v{}, {} channels, {} Hz, {} scans/read",
            driver.name(),
            driver.version(),
            config.channels.len(),
            sample_rate,
            scans_per_read
        );

        Ok(Self {
            driver,
            channels: config.channels.clone(),
            converter: UnitConverter::new(calibrations),
            monitor,
            actuators,
            shared,
            notifier,
            log,
            sample_rate,
            scans_per_read,
            read_period,
            total_samples: 0,
            streaming: false,
            stats: LoopStats::default(),
        })
    }

    /// Clear the outputs and start the device stream.
    ///
    /// # Errors
    /// Returns error if the stream cannot be configured or the device
    /// accepts a different sample rate than requested.
    pub fn start(&mut self) -> Result<(), DaqError> {
        // Outputs may still be energized after an improper shutdown.
        if let Err(e) = self.actuators.clear_all() {
            warn!("Clearing actuators at startup failed: {}", e);
        }

        let spec = StreamSpec {
            channels: &self.channels,
            sample_rate: self.sample_rate,
            scans_per_read: self.scans_per_read,
        };
        let actual = self.driver.configure_stream(&spec)?;
        self.streaming = true;
        if actual != self.sample_rate {
            error!(
                "Failed to configure data stream: requested {} Hz, device reports {} Hz",
                self.sample_rate, actual
            );
            if let Err(e) = self.driver.stop_stream() {
                warn!("Failed to stop misconfigured stream: {}", e);
            }
            self.streaming = false;
            return Err(DeviceError::RateMismatch {
                requested: self.sample_rate,
                actual,
            }
            .into());
        }

        info!("Data stream started at {} Hz", actual);
        Ok(())
    }

    /// Run one acquisition cycle.
    pub fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        let mut frames: Vec<Frame> = Vec::with_capacity(self.scans_per_read as usize);

        loop {
            match self.driver.read_batch() {
                Ok(batch) => {
                    report.reads += 1;
                    for frame in &batch.frames {
                        self.monitor.check_frame(frame);
                    }
                    frames.extend(batch.frames);
                    if batch.backlog == 0 || report.reads > MAX_BACKLOG_READS {
                        break;
                    }
                }
                Err(e) => {
                    report.read_failed = true;
                    self.stats.read_errors += 1;
                    error!("Device read failed: {}", e);
                    self.notifier.notify(format!("[E] Device read failed: {e}"));
                    break;
                }
            }
        }

        report.frames = frames.len();
        if frames.is_empty() {
            return report;
        }

        report.skipped_samples = frames
            .iter()
            .flat_map(|f| f.values())
            .filter(|&&v| v == SKIPPED_SAMPLE)
            .count();
        if report.skipped_samples > 0 {
            self.stats.skipped_samples += report.skipped_samples as u64;
            warn!("{} samples got skipped", report.skipped_samples);
            self.notifier
                .notify(format!("{} samples got skipped", report.skipped_samples));
        }

        let previous_total = self.total_samples;
        self.total_samples += frames.len() as u64;
        let first_sequence = self.total_samples - frames.len() as u64;
        let times = batch_timestamps(
            self.total_samples,
            frames.len(),
            self.sample_rate,
            STORAGE_PRECISION,
        );
        let samples: Vec<Sample> = self
            .converter
            .convert_batch(&frames, STORAGE_PRECISION)
            .into_iter()
            .zip(times)
            .enumerate()
            .map(|(i, (values, time_s))| Sample {
                sequence: first_sequence + i as u64,
                time_s,
                values,
            })
            .collect();

        match self.log.append(&samples) {
            Ok(()) => report.logged = true,
            Err(e) => {
                error!("Sample log write failed: {}", e);
                self.notifier.notify(format!("[E] Sample log write failed: {e}"));
            }
        }

        if let Some(last) = samples.last() {
            let snapshot = Snapshot {
                sample: last.clone(),
                actuators: self.actuators.snapshot(),
                published_at: SystemTime::now(),
            };
            report.published = self.shared.publish(snapshot, PUBLISH_TIMEOUT);
            if !report.published {
                self.stats.skipped_publishes += 1;
                debug!("Shared state busy; publish skipped this cycle");
            }
        }

        if previous_total / PROGRESS_INTERVAL != self.total_samples / PROGRESS_INTERVAL {
            info!("{} samples collected", self.total_samples);
        }

        report
    }

    /// Run the acquisition loop.
    ///
    /// This method blocks until the shutdown flag is set, then runs
    /// [`shutdown`](Self::shutdown).
    ///
    /// # Errors
    /// Returns error if the stream was never started or the shutdown path
    /// fails.
    pub fn run(&mut self) -> Result<(), DaqError> {
        if !self.streaming {
            return Err(DeviceError::NotStreaming.into());
        }

        info!(
            "Starting acquisition loop (read period={}us)...",
            self.read_period.as_micros()
        );
        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        while !self.shared.should_stop() {
            let cycle_start = Instant::now();
            let report = self.run_cycle();
            let cycle_time_us = cycle_start.elapsed().as_micros() as u64;

            self.stats.cycle_count += 1;
            self.stats.total_cycle_time_us += cycle_time_us;
            if cycle_time_us > self.stats.max_cycle_time_us {
                self.stats.max_cycle_time_us = cycle_time_us;
            }

            // A larger batch than one read means the loop fell behind.
            if report.reads > 1 || cycle_time_us > 2 * self.read_period.as_micros() as u64 {
                self.stats.timing_violations += 1;
                if self.stats.timing_violations <= 10 || self.stats.timing_violations % 1000 == 0 {
                    warn!(
                        "Timing violation #{}: cycle took {}us over {} reads (period {}us)",
                        self.stats.timing_violations,
                        cycle_time_us,
                        report.reads,
                        self.read_period.as_micros()
                    );
                }
            }

            if report.read_failed {
                std::thread::sleep(READ_ERROR_BACKOFF);
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Acquisition loop: {} cycles, avg={}us, max={}us, violations={}, skipped publishes={}",
                    self.stats.cycle_count,
                    self.stats.total_cycle_time_us / self.stats.cycle_count,
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations,
                    self.stats.skipped_publishes
                );
            }
        }

        info!(
            "Acquisition loop stopped after {} cycles, {} samples (violations: {})",
            self.stats.cycle_count, self.total_samples, self.stats.timing_violations
        );
        self.shutdown()
    }

    /// Drive every actuator off, stop the stream and flush the log.
    ///
    /// Every step is attempted; the first failure is returned.
    pub fn shutdown(&mut self) -> Result<(), DaqError> {
        info!("Shutting down acquisition");
        let mut first_err: Option<DaqError> = None;

        if let Err(e) = self.actuators.clear_all() {
            error!("Failed to clear actuators on shutdown: {}", e);
            first_err.get_or_insert(e.into());
        }

        if self.streaming {
            match self.driver.stop_stream() {
                Ok(()) => self.streaming = false,
                Err(e) => {
                    error!("Failed to stop data stream: {}", e);
                    first_err.get_or_insert(e.into());
                }
            }
        }

        if let Err(e) = self.log.flush() {
            error!("Failed to flush sample log: {}", e);
            first_err.get_or_insert(e.into());
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Samples acquired so far.
    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Get timing statistics.
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Whether the device stream is running.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{sched_getscheduler, SCHED_FIFO, SCHED_RR};
        // SAFETY: sched_getscheduler(0) only queries the calling thread's policy.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
