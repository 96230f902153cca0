//! Process-wide shutdown flag.
//!
//! Every worker holds a clone of the same [`ShutdownFlag`] and polls it once
//! per iteration. Tripping is write-once: the first call wins and reports
//! `true`, further calls are idempotent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Cooperative, write-once stop signal shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    tripped: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Create a flag in the running (not tripped) state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the flag.
    ///
    /// Returns `true` only for the call that actually changed the state.
    pub fn trip(&self, reason: &str) -> bool {
        let first = self
            .tripped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if first {
            info!("Shutdown requested: {}", reason);
        }
        first
    }

    /// Whether shutdown has been requested.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}
