//! Operator notifications.
//!
//! Free-text console messages produced anywhere in the process are queued on
//! an unbounded channel and drained by the telemetry broadcaster, which
//! delivers them to every connected observer. Queuing never blocks, so the
//! acquisition loop can notify from its hot path.

use tokio::sync::mpsc;

/// Receiving end, owned by the telemetry broadcaster.
pub type NotificationReceiver = mpsc::UnboundedReceiver<String>;

/// Cloneable sending handle.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<String>,
}

impl Notifier {
    /// Create a connected notifier/receiver pair.
    pub fn channel() -> (Self, NotificationReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a message for the operator console.
    ///
    /// Dropped silently once the broadcaster has exited.
    pub fn notify(&self, message: impl Into<String>) {
        let _ = self.tx.send(message.into());
    }
}
