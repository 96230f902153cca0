//! Operator telemetry.
//!
//! - [`message`] - Outbound JSON messages and the sensor-group layout
//! - [`watchdog`] - Disconnect timer behind the link-loss fail-safe
//! - [`broadcaster`] - Interval fan-out to observers

pub mod broadcaster;
pub mod message;
pub mod watchdog;

pub use broadcaster::{DeliveryError, DeliveryReport, Observer, ObserverRegistry, TelemetryBroadcaster};
pub use message::{Outbound, Reading, TelemetryLayout, WireTime};
pub use watchdog::{LinkStatus, LinkWatchdog};
