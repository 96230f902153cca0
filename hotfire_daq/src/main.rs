//! # Hotfire DAQ Binary
//!
//! Acquisition unit of the hybrid engine test stand: streams the sensors,
//! enforces the over-pressure interlock, runs the ignition countdown and
//! serves the operator link.
//!
//! # Usage
//!
//! ```bash
//! # Run against the simulated device
//! hotfire_daq --config config/daq.toml --simulate
//!
//! # Run with a specific driver
//! hotfire_daq --config config/daq.toml --driver simulation
//!
//! # Verbose logging, JSON output, custom operator port
//! hotfire_daq --config config/daq.toml -s -v --json --bind 127.0.0.1:9000
//! ```

use clap::Parser;
use hotfire_common::config::{ConfigLoader, DaqConfig, LogLevel};
use hotfire_common::shutdown::ShutdownFlag;
use hotfire_daq::actuators::ActuatorBank;
use hotfire_daq::command::CommandDispatcher;
use hotfire_daq::core::DaqCore;
use hotfire_daq::driver_registry::DriverRegistry;
use hotfire_daq::ignition::IgnitionSequencer;
use hotfire_daq::notify::Notifier;
use hotfire_daq::sample_log::CsvSampleLog;
use hotfire_daq::server::OperatorServer;
use hotfire_daq::shared::SharedState;
use hotfire_daq::telemetry::{ObserverRegistry, TelemetryBroadcaster, TelemetryLayout};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// Hotfire DAQ - test stand acquisition and control unit
#[derive(Parser, Debug)]
#[command(name = "hotfire_daq")]
#[command(version)]
#[command(about = "Test stand data acquisition, safety interlock and operator link")]
#[command(long_about = None)]
struct Args {
    /// Path to the acquisition configuration file.
    #[arg(short, long, default_value = "/etc/hotfire/daq.toml")]
    config: PathBuf,

    /// Force simulation driver (ignores the configured driver)
    #[arg(short = 's', long)]
    simulate: bool,

    /// Driver to load instead of the configured one
    #[arg(short, long)]
    driver: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Operator link listen address (overrides `[telemetry] bind`)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("DAQ startup failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tracing comes up before the config is checked so its errors are logged.
    let loaded = DaqConfig::load(&args.config);
    let level = loaded
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, level);

    info!("Hotfire DAQ v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Loading config from {:?}", args.config);
    let config = loaded?;
    config.validate()?;

    let service_span = info_span!("service", name = %config.shared.service_name);
    let _entered = service_span.clone().entered();
    info!(
        "Configuration valid: {} channels at {} Hz",
        config.channels.len(),
        config.general.sample_rate
    );

    let driver_name = if args.simulate {
        info!("Simulation mode enabled");
        "simulation".to_string()
    } else if let Some(ref name) = args.driver {
        info!("Driver from CLI: {}", name);
        name.clone()
    } else {
        config.general.driver.clone()
    };

    let registry = DriverRegistry::with_builtin()?;
    let driver = registry.create_driver(&driver_name)?;
    let shutdown = ShutdownFlag::new();
    let actuators = Arc::new(ActuatorBank::new(
        driver.actuator_port(),
        &config.actuators,
        config.ignition.actuator,
        shutdown.clone(),
    ));

    let shared = Arc::new(SharedState::new(shutdown.clone()));
    let (notifier, notifications) = Notifier::channel();

    let log = CsvSampleLog::create(&config.general.data_dir, &config.log_columns())?;
    info!("Logging samples to {}", log.path().display());

    let mut core = DaqCore::new(
        &config,
        driver,
        Arc::clone(&actuators),
        Arc::clone(&shared),
        notifier.clone(),
        Box::new(log),
    )?;
    core.start()?;

    let signal_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal_flag.trip("signal received");
    })?;

    let ignition = IgnitionSequencer::new(
        &config.ignition,
        Arc::clone(&actuators),
        notifier.clone(),
        shutdown.clone(),
    );
    let dispatcher = Arc::new(CommandDispatcher::new(
        &config.operator.password,
        Arc::clone(&actuators),
        ignition,
        Arc::clone(&shared),
        notifier,
    ));
    let observers = Arc::new(ObserverRegistry::new());
    let broadcaster = TelemetryBroadcaster::new(
        &config.telemetry,
        TelemetryLayout::from_channels(&config.channels),
        Arc::clone(&shared),
        Arc::clone(&observers),
        notifications,
    );
    let bind = args.bind.unwrap_or_else(|| config.telemetry.bind.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("hotfire-link")
        .build()?;

    let link = runtime.block_on(OperatorServer::bind(
        &bind,
        Arc::clone(&dispatcher),
        Arc::clone(&observers),
        Arc::clone(&shared),
    ));
    let server = match link {
        Ok(server) => server,
        Err(e) => {
            shutdown.trip("operator link unavailable");
            if let Err(e) = core.shutdown() {
                warn!("Shutdown after failed bind reported: {}", e);
            }
            return Err(e.into());
        }
    };

    let loop_flag = shutdown.clone();
    let acquisition = std::thread::Builder::new()
        .name("acquisition".to_string())
        .spawn(move || {
            let _entered = service_span.entered();
            let result = core.run();
            loop_flag.trip("acquisition loop ended");
            result
        })?;

    runtime.block_on(async {
        let server = tokio::spawn(server.run());
        let telemetry = tokio::spawn(broadcaster.run());
        for (name, task) in [("operator link", server), ("telemetry", telemetry)] {
            if let Err(e) = task.await {
                error!("{} task failed: {}", name, e);
            }
        }
    });

    match acquisition.join() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Acquisition loop error: {}", e),
        Err(_) => error!("Acquisition thread panicked"),
    }

    info!("Hotfire DAQ shutdown complete");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
