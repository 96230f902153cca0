//! Operator link watchdog.
//!
//! Tracks how long the operator link has been down. The clock starts at
//! the first failed broadcast after at least one successful delivery and
//! stops at the next success. Once the grace window has elapsed the status
//! is [`LinkStatus::Expired`] until the link comes back.

use std::time::{Duration, Instant};
use tracing::info;

/// State of the operator link after one broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Delivered to at least one observer.
    Up,
    /// No operator has connected yet; nothing is armed to fail safe.
    NeverConnected,
    /// Link down; fail-safe fires after `remaining`.
    Down {
        /// Grace time left.
        remaining: Duration,
    },
    /// Grace window elapsed.
    Expired,
}

/// Disconnect timer for the operator link.
#[derive(Debug, Clone)]
pub struct LinkWatchdog {
    grace: Duration,
    connected_once: bool,
    down_since: Option<Instant>,
}

impl LinkWatchdog {
    /// Create a watchdog with the given grace window.
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            connected_once: false,
            down_since: None,
        }
    }

    /// Configured grace window.
    #[inline]
    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Whether the disconnect timer is running.
    #[inline]
    pub fn is_down(&self) -> bool {
        self.down_since.is_some()
    }

    /// Record a broadcast that reached at least one observer.
    pub fn record_success(&mut self, now: Instant) -> LinkStatus {
        if let Some(since) = self.down_since.take() {
            info!("Operator link restored after {:?}", now.saturating_duration_since(since));
        }
        self.connected_once = true;
        LinkStatus::Up
    }

    /// Record a broadcast that reached nobody.
    pub fn record_failure(&mut self, now: Instant) -> LinkStatus {
        if !self.connected_once {
            return LinkStatus::NeverConnected;
        }
        let since = *self.down_since.get_or_insert(now);
        let elapsed = now.saturating_duration_since(since);
        match self.grace.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => LinkStatus::Down { remaining },
            _ => LinkStatus::Expired,
        }
    }
}

/// Format a duration as `MM:SS`, truncating sub-second parts.
pub fn format_mm_ss(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
