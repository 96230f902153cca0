//! Periodic telemetry fan-out and the link-loss fail-safe.
//!
//! Each interval the broadcaster takes the latest [`Snapshot`], serializes
//! it through the [`TelemetryLayout`] and delivers it to every registered
//! [`Observer`]. An observer that fails a delivery is removed. A broadcast
//! that reaches nobody counts against the [`LinkWatchdog`]; when the grace
//! window runs out the shutdown flag is tripped, which drives every
//! actuator off through the acquisition loop's shutdown path.
//!
//! Until the first sample is published there is nothing to send, and the
//! link counts as up while at least one observer is registered.

use super::message::{Outbound, TelemetryLayout};
use super::watchdog::{format_mm_ss, LinkStatus, LinkWatchdog};
use crate::notify::NotificationReceiver;
use crate::shared::SharedState;
use hotfire_common::config::TelemetryConfig;
use hotfire_common::consts::SNAPSHOT_TIMEOUT;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Why a delivery to one observer failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The connection is gone.
    #[error("observer disconnected")]
    Closed,
    /// The observer is not draining its queue.
    #[error("observer queue full")]
    Full,
}

/// A connected telemetry consumer.
pub trait Observer: Send + Sync {
    /// Registry-assigned identity.
    fn id(&self) -> u64;

    /// Queue one serialized line. Must not block.
    fn deliver(&self, line: &str) -> Result<(), DeliveryError>;
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Observers that accepted every line.
    pub delivered: usize,
    /// Observers removed after a failed delivery.
    pub removed: usize,
}

/// Set of connected observers.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn Observer>>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh observer id.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Add an observer.
    pub fn register(&self, observer: Arc<dyn Observer>) {
        debug!("Observer {} registered", observer.id());
        self.observers.lock().push(observer);
    }

    /// Remove observer `id`. Returns whether it was registered.
    pub fn remove(&self, id: u64) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|o| o.id() != id);
        let removed = observers.len() != before;
        if removed {
            debug!("Observer {} removed", id);
        }
        removed
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }

    /// Deliver `lines` to every observer, removing those that fail.
    pub fn broadcast(&self, lines: &[String]) -> DeliveryReport {
        let observers: Vec<Arc<dyn Observer>> = self.observers.lock().clone();
        let mut report = DeliveryReport::default();
        let mut failed = Vec::new();

        for observer in &observers {
            match lines.iter().try_for_each(|line| observer.deliver(line)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Dropping observer {}: {}", observer.id(), e);
                    failed.push(observer.id());
                }
            }
        }

        if !failed.is_empty() {
            self.observers.lock().retain(|o| !failed.contains(&o.id()));
            report.removed = failed.len();
        }
        report
    }
}

/// Telemetry task state.
pub struct TelemetryBroadcaster {
    shared: Arc<SharedState>,
    observers: Arc<ObserverRegistry>,
    layout: TelemetryLayout,
    watchdog: LinkWatchdog,
    interval: Duration,
    notifications: NotificationReceiver,
    last_announced: Option<u64>,
}

impl TelemetryBroadcaster {
    /// Create a broadcaster.
    pub fn new(
        config: &TelemetryConfig,
        layout: TelemetryLayout,
        shared: Arc<SharedState>,
        observers: Arc<ObserverRegistry>,
        notifications: NotificationReceiver,
    ) -> Self {
        Self {
            shared,
            observers,
            layout,
            watchdog: LinkWatchdog::new(config.grace_window()),
            interval: config.interval(),
            notifications,
            last_announced: None,
        }
    }

    /// Run one broadcast interval and feed the outcome to the watchdog.
    pub fn tick(&mut self, now: Instant) -> LinkStatus {
        let reached = match self.shared.latest(SNAPSHOT_TIMEOUT) {
            Some(snapshot) => {
                let lines: Vec<String> = self
                    .layout
                    .messages(&snapshot)
                    .iter()
                    .filter_map(|msg| match msg.to_line() {
                        Ok(line) => Some(line),
                        Err(e) => {
                            error!("Failed to serialize telemetry: {}", e);
                            None
                        }
                    })
                    .collect();
                self.observers.broadcast(&lines).delivered
            }
            None => self.observers.len(),
        };

        let status = if reached > 0 {
            self.last_announced = None;
            self.watchdog.record_success(now)
        } else {
            self.watchdog.record_failure(now)
        };

        match status {
            LinkStatus::Down { remaining } => {
                let secs = remaining.as_secs();
                if self.last_announced != Some(secs) {
                    self.last_announced = Some(secs);
                    warn!(
                        "[W] Connection issue! Actuator states will automatically reset in: {}",
                        format_mm_ss(remaining)
                    );
                }
            }
            LinkStatus::Expired => self.expire(),
            LinkStatus::Up | LinkStatus::NeverConnected => {}
        }
        status
    }

    fn expire(&mut self) {
        if self.shared.should_stop() {
            return;
        }
        let message = format!(
            "[E] Operator link down for {}; resetting actuators",
            format_mm_ss(self.watchdog.grace())
        );
        error!("{}", message);
        self.deliver_console(&message);
        self.shared.shutdown().trip("operator link lost");
    }

    /// Deliver one console notification to every observer.
    pub fn deliver_console(&self, message: &str) {
        match Outbound::console(message).to_line() {
            Ok(line) => {
                self.observers.broadcast(&[line]);
            }
            Err(e) => error!("Failed to serialize console message: {}", e),
        }
    }

    /// Deliver every queued notification.
    pub fn flush_notifications(&mut self) {
        while let Ok(message) = self.notifications.try_recv() {
            self.deliver_console(&message);
        }
    }

    /// Broadcast until the shutdown flag is set.
    pub async fn run(mut self) {
        info!(
            "Telemetry broadcaster started (interval={}ms, grace={})",
            self.interval.as_millis(),
            format_mm_ss(self.watchdog.grace())
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Instant::now());
                    if self.shared.should_stop() {
                        break;
                    }
                }
                Some(message) = self.notifications.recv() => {
                    self.deliver_console(&message);
                }
            }
        }

        self.flush_notifications();
        info!("Telemetry broadcaster stopped");
    }
}
