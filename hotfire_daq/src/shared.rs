//! Shared state handed from the acquisition loop to the operator link.
//!
//! The acquisition loop is the single writer. It publishes a complete
//! [`Snapshot`] by swapping an `Arc` under a write lock it waits for at most
//! a bounded timeout; if the lock is busy the publish is skipped for that
//! cycle. Readers clone the `Arc` under a read lock, so they always observe
//! a whole `Sample`/`ActuatorState` pair and never hold the lock while
//! serializing.

use hotfire_common::shutdown::ShutdownFlag;
use hotfire_common::types::{ActuatorState, Sample};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Latest externally visible state.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Last converted sample of the most recent batch.
    pub sample: Sample,
    /// Actuator states at publish time.
    pub actuators: ActuatorState,
    /// Wall-clock time of publication.
    pub published_at: SystemTime,
}

/// Single point of truth between the acquisition loop and the link.
#[derive(Debug, Default)]
pub struct SharedState {
    latest: RwLock<Option<Arc<Snapshot>>>,
    shutdown: ShutdownFlag,
}

impl SharedState {
    /// Create empty state bound to `shutdown`.
    pub fn new(shutdown: ShutdownFlag) -> Self {
        Self {
            latest: RwLock::new(None),
            shutdown,
        }
    }

    /// Replace the snapshot, waiting at most `timeout` for the lock.
    ///
    /// Returns `false` if the lock could not be taken in time; the previous
    /// snapshot stays visible.
    pub fn publish(&self, snapshot: Snapshot, timeout: Duration) -> bool {
        let snapshot = Arc::new(snapshot);
        match self.latest.try_write_for(timeout) {
            Some(mut guard) => {
                *guard = Some(snapshot);
                true
            }
            None => false,
        }
    }

    /// Latest snapshot, or `None` if nothing was published yet or the lock
    /// stayed busy for `timeout`.
    pub fn latest(&self, timeout: Duration) -> Option<Arc<Snapshot>> {
        self.latest.try_read_for(timeout)?.clone()
    }

    /// Process-wide shutdown flag.
    #[inline]
    pub fn shutdown(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    /// Whether shutdown has been requested.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.shutdown.is_set()
    }
}
