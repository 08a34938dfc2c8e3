//! Hardware line abstraction.
//!
//! The encoder monitor talks to hardware only through [`LineProvider`].
//! [`memory::SimulatedChip`] is an in-process provider for tests and demos;
//! `gpio::GpioChip` (feature `hardware`, Linux only) drives real lines via the
//! GPIO character device.

/// Linux GPIO character device provider.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;
/// In-process simulated provider.
pub mod memory;
mod traits;

pub use memory::{SimulatedChip, SimulatedStats};
pub use traits::{
    Edge, EdgeEvent, EdgeSender, Level, LevelPair, LineHandle, LineOffset, LinePair, LineProvider,
    LineSubscription,
};
