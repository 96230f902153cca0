//! Ignition sequencer.
//!
//! [`IgnitionSequence`] is the state machine; [`IgnitionSequencer`] runs it on
//! its own thread, one tick per period, and is the handle the command
//! dispatcher holds.
//!
//! ```text
//! Idle ──start──▶ Countdown(n) ──tick──▶ Countdown(n-1) ... Countdown(0) ──tick──▶ Firing ──▶ Idle
//!                      │
//!                   cancel
//!                      ▼
//!                  Canceled ──next tick──▶ Idle
//! ```
//!
//! Cancellation and shutdown are observed only at tick boundaries, so a
//! cancel takes effect within one tick period.

use crate::actuators::ActuatorBank;
use crate::notify::Notifier;
use hotfire_common::config::IgnitionConfig;
use hotfire_common::shutdown::ShutdownFlag;
use hotfire_common::types::IgnitionState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Countdown continues; payload is the value just announced.
    Counting(u32),
    /// Sequence aborted; actuator left de-energized.
    Canceled,
    /// Ignition actuator energized.
    Fired,
    /// Ignition actuator could not be energized.
    Faulted,
    /// No sequence in flight.
    Idle,
}

impl TickOutcome {
    /// Whether the sequence ended with this tick.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Counting(_))
    }
}

/// Countdown-then-fire state machine.
pub struct IgnitionSequence {
    state: IgnitionState,
    countdown: u32,
    actuator: usize,
    actuators: Arc<ActuatorBank>,
    notifier: Notifier,
    fired: u64,
}

impl IgnitionSequence {
    /// Create an idle sequence.
    pub fn new(config: &IgnitionConfig, actuators: Arc<ActuatorBank>, notifier: Notifier) -> Self {
        Self {
            state: IgnitionState::Idle,
            countdown: config.countdown_s,
            actuator: config.actuator,
            actuators,
            notifier,
            fired: 0,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> IgnitionState {
        self.state
    }

    /// Times the sequence reached Firing.
    #[inline]
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Begin a countdown. Returns `false` and changes nothing unless idle.
    pub fn start(&mut self) -> bool {
        if !self.state.is_idle() {
            return false;
        }
        self.state = IgnitionState::Countdown(self.countdown);
        info!("Ignition sequence started ({} ticks)", self.countdown);
        true
    }

    /// Request cancellation; applied on the next tick.
    ///
    /// Returns `true` if a countdown was in flight.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            IgnitionState::Countdown(_) => {
                self.state = IgnitionState::Canceled;
                true
            }
            _ => false,
        }
    }

    /// Advance one tick. `abort` is an external cancellation such as
    /// process shutdown.
    pub fn tick(&mut self, abort: bool) -> TickOutcome {
        match self.state {
            IgnitionState::Idle => TickOutcome::Idle,
            IgnitionState::Canceled => self.abort_sequence(),
            IgnitionState::Countdown(_) if abort => self.abort_sequence(),
            IgnitionState::Countdown(0) => self.fire(),
            IgnitionState::Countdown(n) => {
                self.notifier.notify(format!("Ignition in {n}..."));
                debug!("Ignition countdown {}", n);
                self.state = IgnitionState::Countdown(n - 1);
                TickOutcome::Counting(n)
            }
            IgnitionState::Firing => {
                self.state = IgnitionState::Idle;
                TickOutcome::Idle
            }
        }
    }

    fn abort_sequence(&mut self) -> TickOutcome {
        if self.actuators.state(self.actuator) == Some(true) {
            if let Err(e) = self.actuators.write_actuator(self.actuator, false) {
                error!("Failed to de-energize ignition actuator: {}", e);
            }
        }
        warn!("Ignition canceled");
        self.notifier.notify("Ignition canceled");
        self.state = IgnitionState::Idle;
        TickOutcome::Canceled
    }

    fn fire(&mut self) -> TickOutcome {
        self.state = IgnitionState::Firing;
        let outcome = match self.actuators.write_actuator(self.actuator, true) {
            Ok(()) => {
                self.fired += 1;
                warn!("Ignition in progress");
                self.notifier.notify("Ignition in progress");
                TickOutcome::Fired
            }
            Err(e) => {
                error!("Ignition actuation failed: {}", e);
                self.notifier
                    .notify(format!("[E] Ignition actuation failed: {e}"));
                TickOutcome::Faulted
            }
        };
        self.state = IgnitionState::Idle;
        outcome
    }
}

/// Thread-backed runner around a shared [`IgnitionSequence`].
#[derive(Clone)]
pub struct IgnitionSequencer {
    sequence: Arc<Mutex<IgnitionSequence>>,
    shutdown: ShutdownFlag,
    tick: Duration,
}

impl IgnitionSequencer {
    /// Create a sequencer ticking at `config.tick()`.
    pub fn new(
        config: &IgnitionConfig,
        actuators: Arc<ActuatorBank>,
        notifier: Notifier,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            sequence: Arc::new(Mutex::new(IgnitionSequence::new(config, actuators, notifier))),
            shutdown,
            tick: config.tick(),
        }
    }

    /// Start a sequence on a new thread.
    ///
    /// Returns `None` without side effects if a sequence is already in
    /// flight.
    pub fn start(&self) -> Option<JoinHandle<TickOutcome>> {
        if !self.sequence.lock().start() {
            debug!("Ignition already in progress; start ignored");
            return None;
        }

        let sequence = Arc::clone(&self.sequence);
        let shutdown = self.shutdown.clone();
        let tick = self.tick;
        let spawned = std::thread::Builder::new()
            .name("ignition".to_string())
            .spawn(move || loop {
                let outcome = sequence.lock().tick(shutdown.is_set());
                if outcome.is_terminal() {
                    return outcome;
                }
                std::thread::sleep(tick);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn ignition thread: {}", e);
                let mut sequence = self.sequence.lock();
                sequence.cancel();
                sequence.tick(true);
                None
            }
        }
    }

    /// Request cancellation of the in-flight sequence, if any.
    pub fn cancel(&self) -> bool {
        self.sequence.lock().cancel()
    }

    /// Current state.
    pub fn state(&self) -> IgnitionState {
        self.sequence.lock().state()
    }

    /// Times the sequence reached Firing.
    pub fn fired(&self) -> u64 {
        self.sequence.lock().fired()
    }
}
