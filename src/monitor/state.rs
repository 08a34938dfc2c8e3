//! Observable lifecycle state of a monitor run.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Lifecycle of one [`EncoderMonitor::run`](super::EncoderMonitor::run) call.
///
/// `Uninitialized -> ReadingInitialClock -> Subscribed -> Closing -> Closed`,
/// with a direct jump to `Closed` when initialization fails. No state is
/// ever re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MonitorState {
    /// `run` has not been called.
    Uninitialized = 0,
    /// Reading the seed clock level.
    ReadingInitialClock = 1,
    /// Edge subscription active, processing events.
    Subscribed = 2,
    /// Releasing the subscription.
    Closing = 3,
    /// Run returned.
    Closed = 4,
}

impl MonitorState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Uninitialized,
            1 => Self::ReadingInitialClock,
            2 => Self::Subscribed,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::ReadingInitialClock)
                | (Self::ReadingInitialClock, Self::Subscribed | Self::Closed)
                | (Self::Subscribed, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Returns true for [`MonitorState::Closed`].
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Shared view of a monitor's current state.
///
/// Obtained from [`EncoderMonitor::status`](super::EncoderMonitor::status)
/// before `run` consumes the monitor.
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    state: Arc<AtomicU8>,
}

impl MonitorStatus {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(MonitorState::Uninitialized as u8)),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        MonitorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Polls until the state is `target` or `timeout` elapses.
    #[must_use]
    pub fn wait_for(&self, target: MonitorState, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.state() == target {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    pub(crate) fn advance(&self, next: MonitorState) {
        debug_assert!(
            self.state().can_advance_to(next),
            "illegal monitor transition {:?} -> {next:?}",
            self.state()
        );
        self.state.store(next as u8, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let status = MonitorStatus::new();
        assert_eq!(status.state(), MonitorState::Uninitialized);
        for next in [
            MonitorState::ReadingInitialClock,
            MonitorState::Subscribed,
            MonitorState::Closing,
            MonitorState::Closed,
        ] {
            status.advance(next);
            assert_eq!(status.state(), next);
        }
        assert!(status.state().is_terminal());
    }

    #[test]
    fn test_failed_initialization_closes_directly() {
        assert!(MonitorState::ReadingInitialClock.can_advance_to(MonitorState::Closed));
        assert!(!MonitorState::Subscribed.can_advance_to(MonitorState::Closed));
    }

    #[test]
    fn test_no_reentry() {
        assert!(!MonitorState::Closed.can_advance_to(MonitorState::Subscribed));
        assert!(!MonitorState::Closing.can_advance_to(MonitorState::Subscribed));
        assert!(!MonitorState::Closed.can_advance_to(MonitorState::ReadingInitialClock));
    }
}
