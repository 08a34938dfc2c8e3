//! Line provider contract.
//!
//! The monitor only relies on three things from hardware: a line reads as
//! one of two levels, edges are reported as "something changed", and a
//! subscription can be released more than once without harm.

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::error::LineError;

/// Line number on a GPIO chip.
pub type LineOffset = u32;

/// Binary level of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Logic 0.
    Low,
    /// Logic 1.
    High,
}

impl Level {
    /// Level as 0 or 1.
    #[must_use]
    pub const fn as_bit(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }

    /// Any non-zero bit reads as high.
    #[must_use]
    pub const fn from_bit(bit: u8) -> Self {
        if bit == 0 {
            Self::Low
        } else {
            Self::High
        }
    }

    /// Returns true for [`Level::High`].
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_bit())
    }
}

/// The two encoder lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinePair {
    /// Clock (A) line.
    pub clock: LineOffset,
    /// Data (B) line.
    pub data: LineOffset,
}

impl LinePair {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(clock: LineOffset, data: LineOffset) -> Self {
        Self { clock, data }
    }
}

/// Levels of both encoder lines, sampled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelPair {
    /// Clock level.
    pub clock: Level,
    /// Data level.
    pub data: Level,
}

impl LevelPair {
    #[allow(missing_docs)]
    #[must_use]
    pub const fn new(clock: Level, data: Level) -> Self {
        Self { clock, data }
    }
}

/// Direction of a line transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Low to high.
    Rising,
    /// High to low.
    Falling,
}

/// A single edge notification from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvent {
    /// Line that changed.
    pub offset: LineOffset,
    /// Transition direction as reported by the provider.
    pub edge: Edge,
    /// Provider timestamp in nanoseconds. Monotonic, arbitrary epoch.
    pub timestamp_ns: u64,
}

/// Queue the provider pushes edge notifications into.
///
/// An `Err` item tells the monitor the provider can no longer deliver events.
pub type EdgeSender = Sender<Result<EdgeEvent, LineError>>;

/// A short-lived handle on a single input line.
///
/// Dropping the handle releases the line.
pub trait LineHandle: Send {
    /// Line this handle was opened on.
    fn offset(&self) -> LineOffset;

    /// Reads the current level.
    fn level(&self) -> Result<Level, LineError>;
}

/// A live edge-event registration on a clock/data pair.
pub trait LineSubscription: Send {
    /// Lines covered by this subscription.
    fn lines(&self) -> LinePair;

    /// Reads both line levels as one sample.
    fn levels(&self) -> Result<LevelPair, LineError>;

    /// Releases the registration. Calling it again is a no-op.
    fn release(&mut self);
}

/// Source of line handles and edge subscriptions.
pub trait LineProvider: Send + Sync {
    /// Opens a single line as input.
    fn open_input(&self, offset: LineOffset) -> Result<Box<dyn LineHandle>, LineError>;

    /// Requests both-edge notification on `lines`, delivered into `events`
    /// in the order the provider observed them.
    fn subscribe(
        &self,
        lines: LinePair,
        events: EdgeSender,
    ) -> Result<Box<dyn LineSubscription>, LineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_bits() {
        assert_eq!(Level::from_bit(0), Level::Low);
        assert_eq!(Level::from_bit(1), Level::High);
        assert_eq!(Level::from_bit(7), Level::High);
        assert_eq!(Level::High.as_bit(), 1);
        assert_eq!(Level::from(false), Level::Low);
        assert_eq!(Level::Low.to_string(), "0");
    }
}
