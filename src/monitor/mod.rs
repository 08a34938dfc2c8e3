//! Encoder monitor: drives the quadrature decoder from live edge events.
//!
//! The run loop owns the line subscription for the duration of one
//! [`EncoderMonitor::run`] call and publishes decoded actions into an
//! unbuffered [`ActionStream`]. Cancellation is the only clean way out.

/// Observer hooks.
pub mod observer;
/// Run loop and configuration.
pub mod runner;
/// Lifecycle state.
pub mod state;
/// Action channel.
pub mod stream;

pub use observer::{LogObserver, MonitorObserver, NoopObserver};
pub use runner::{EncoderMonitor, MonitorConfig, PublishMode};
pub use state::{MonitorState, MonitorStatus};
pub use stream::{action_channel, ActionSender, ActionStream};
