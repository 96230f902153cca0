//! Shared test rig.

mod emergency_shutdown;
mod ignition_countdown;
mod link_failsafe;
mod operator_commands;
mod sample_logging;

use hotfire_common::config::{ConfigLoader, DaqConfig};
use hotfire_common::device::DaqDriver;
use hotfire_common::shutdown::ShutdownFlag;
use hotfire_common::types::Frame;
use hotfire_daq::actuators::ActuatorBank;
use hotfire_daq::command::CommandDispatcher;
use hotfire_daq::core::DaqCore;
use hotfire_daq::drivers::simulation::{SimulationConfig, SimulationDriver, SimulationHandle};
use hotfire_daq::ignition::IgnitionSequencer;
use hotfire_daq::notify::{NotificationReceiver, Notifier};
use hotfire_daq::sample_log::CsvSampleLog;
use hotfire_daq::shared::SharedState;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// 300 Hz, one scan per read; `pres_1` reads 100 engineering units at 1.0 V.
fn config_toml(data_dir: &Path, tick_ms: u64) -> String {
    format!(
        r#"
[shared]
log_level = "debug"

[general]
sample_rate = 300
reads_per_sec = 300
data_dir = '{}'

[[channels]]
name = "thermo_1"
class = "thermocouple"
register = "AIN0"

[[channels]]
name = "pres_1"
class = "pressure_transducer"
register = "AIN1"

[[channels]]
name = "load_1"
class = "load_cell_large"
register = "AIN2"
negative_channel = 3

[calibration.thermocouple]
offset = 0.0
scale = 0.005

[calibration.load_cell_large]
offset = 0.1
scale = 0.002

[calibration.pressure.pres_1]
offset = 0.0
scale = 0.01

[[actuators]]
name = "main_valve"
register = "EIO0"

[[actuators]]
name = "igniter"
register = "EIO1"

[[actuators]]
name = "vent"
register = "EIO2"

[emergency]
sensor_name = "pres_1"
threshold = 100.0
shutdown_actuator = 0

[ignition]
actuator = 1
countdown_s = 10
tick_ms = {tick_ms}

[telemetry]
bind = "127.0.0.1:0"
interval_ms = 10
reset_actuators_min = 5

[operator]
password = "hunter2"
"#,
        data_dir.display()
    )
}

pub const PASSWORD: &str = "hunter2";

/// Every component of one acquisition unit, wired as the binary wires them.
pub struct Rig {
    pub config: DaqConfig,
    pub core: DaqCore,
    pub sim: SimulationHandle,
    pub actuators: Arc<ActuatorBank>,
    pub shared: Arc<SharedState>,
    pub dispatcher: CommandDispatcher,
    pub ignition: IgnitionSequencer,
    pub notifications: NotificationReceiver,
    pub dir: TempDir,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_tick_ms(1000)
    }

    pub fn with_tick_ms(tick_ms: u64) -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("daq.toml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        file.write_all(config_toml(&dir.path().join("data"), tick_ms).as_bytes())
            .unwrap();
        drop(file);

        let config = DaqConfig::load(&config_path).unwrap();
        config.validate().unwrap();

        let driver = SimulationDriver::with_config(SimulationConfig {
            realtime: false,
            noise_volts: 0.0,
            seed: Some(7),
            ..SimulationConfig::default()
        });
        let sim = driver.handle();
        let shutdown = ShutdownFlag::new();
        let actuators = Arc::new(ActuatorBank::new(
            driver.actuator_port(),
            &config.actuators,
            config.ignition.actuator,
            shutdown.clone(),
        ));
        let shared = Arc::new(SharedState::new(shutdown));
        let (notifier, notifications) = Notifier::channel();
        let log = CsvSampleLog::create(&config.general.data_dir, &config.log_columns()).unwrap();

        let core = DaqCore::new(
            &config,
            Box::new(driver),
            Arc::clone(&actuators),
            Arc::clone(&shared),
            notifier.clone(),
            Box::new(log),
        )
        .unwrap();

        let ignition = IgnitionSequencer::new(
            &config.ignition,
            Arc::clone(&actuators),
            notifier.clone(),
            shared.shutdown().clone(),
        );
        let dispatcher = CommandDispatcher::new(
            &config.operator.password,
            Arc::clone(&actuators),
            ignition.clone(),
            Arc::clone(&shared),
            notifier,
        );

        Self {
            config,
            core,
            sim,
            actuators,
            shared,
            dispatcher,
            ignition,
            notifications,
            dir,
        }
    }

    /// Writes recorded by the simulated device since startup cleared it.
    pub fn writes_after_start(&self) -> Vec<(String, bool)> {
        let writes = self.sim.registers().writes();
        writes[self.config.actuators.len()..].to_vec()
    }

    pub fn drain_notifications(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.notifications.try_recv().ok()).collect()
    }

    pub fn command(&self, json: &str) -> Option<String> {
        self.dispatcher.handle(json)
    }
}

/// Scan with `pres_1` at `pressure` engineering units, other channels idle.
pub fn frame_at(pressure: f64) -> Frame {
    Frame::new(vec![0.1, pressure * 0.01, 0.1])
}
