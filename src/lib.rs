//! # ky040 - rotary encoder decoding for Linux GPIO
//!
//! Turns edges on a mechanical rotary encoder's clock and data lines into a
//! stream of [`Action`]s, delivered exactly once and in order.
//!
//! ## Core Concepts
//!
//! - **Decoder**: a pure function of (previous clock, clock, data) that fires
//!   only on a rising clock edge
//! - **Line provider**: where levels and edge events come from; a Linux GPIO
//!   chip in production, [`SimulatedChip`] in tests
//! - **Monitor**: owns the edge subscription for one run, feeds the decoder,
//!   and publishes actions into an unbuffered stream until cancelled
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::thread;
//!
//! use ky040::{action_channel, cancellation, EncoderMonitor, LinePair, MonitorConfig, SimulatedChip};
//!
//! let chip = SimulatedChip::new();
//! let monitor = EncoderMonitor::new(Arc::new(chip), MonitorConfig::new(LinePair::new(17, 18)));
//!
//! let (canceller, cancel) = cancellation();
//! let (tx, actions) = action_channel();
//! let worker = thread::spawn(move || monitor.run(&cancel, tx));
//!
//! let consumer = thread::spawn(move || actions.into_iter().map(|a| a.delta()).sum::<i64>());
//!
//! canceller.cancel();
//! worker.join().unwrap().unwrap();
//! let _count = consumer.join().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod cancel;
pub mod config;
pub mod decoder;
pub mod error;
pub mod line;
pub mod monitor;

// Re-export primary types at crate root for convenience
pub use action::Action;
pub use cancel::{cancellation, Cancellation, Canceller};
pub use config::EncoderConfig;
pub use decoder::{decode, QuadratureDecoder};
pub use error::{ConfigError, Ky040Error, Ky040Result, LineError, MonitorError, MonitorPhase, StreamError};
pub use line::{
    Edge, EdgeEvent, Level, LevelPair, LineHandle, LineOffset, LinePair, LineProvider, LineSubscription,
    SimulatedChip,
};
pub use monitor::{
    action_channel, ActionSender, ActionStream, EncoderMonitor, LogObserver, MonitorConfig, MonitorObserver,
    MonitorState, MonitorStatus, PublishMode,
};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use line::gpio::GpioChip;
