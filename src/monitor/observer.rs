//! Optional observer hooks for a monitor run.
//!
//! The monitor never logs on its own. Callers that want logs, counters or
//! test probes inject a [`MonitorObserver`]; [`LogObserver`] forwards every
//! hook to the `log` facade.

use crate::action::Action;
use crate::error::MonitorError;
use crate::line::{EdgeEvent, Level, LevelPair, LineOffset, LinePair};

/// Hooks invoked at fixed points of a monitor run. All default to no-ops.
///
/// Hooks run on the monitor's thread, inside the edge loop; they must not
/// block.
pub trait MonitorObserver: Send + Sync {
    /// `run` was entered.
    fn run_started(&self, _lines: LinePair) {}

    /// The seed clock level was read.
    fn initial_clock(&self, _offset: LineOffset, _level: Level) {}

    /// The edge subscription is active.
    fn subscribed(&self, _lines: LinePair) {}

    /// An edge arrived and both levels were sampled.
    fn edge(&self, _event: &EdgeEvent, _levels: LevelPair) {}

    /// An action was decoded and is about to be published.
    fn action(&self, _action: Action) {}

    /// A decoded action was dropped because cancellation won the publish race.
    fn action_dropped(&self, _action: Action) {}

    /// The run is about to return an error.
    fn failed(&self, _error: &MonitorError) {}

    /// `run` is returning.
    fn run_finished(&self, _lines: LinePair) {}
}

/// Observer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MonitorObserver for NoopObserver {}

const TARGET: &str = "ky040::monitor";

/// Observer that writes to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl MonitorObserver for LogObserver {
    fn run_started(&self, lines: LinePair) {
        log::info!(target: TARGET, "rotary encoder started clock_pin={} data_pin={}", lines.clock, lines.data);
    }

    fn initial_clock(&self, offset: LineOffset, level: Level) {
        log::trace!(target: TARGET, "read clock clock_pin={offset} value={level}");
    }

    fn subscribed(&self, lines: LinePair) {
        log::info!(target: TARGET, "subscribed to edges clock_pin={} data_pin={}", lines.clock, lines.data);
    }

    fn edge(&self, event: &EdgeEvent, levels: LevelPair) {
        log::trace!(
            target: TARGET,
            "read line values edge_pin={} edge={:?} clock={} data={}",
            event.offset,
            event.edge,
            levels.clock,
            levels.data
        );
    }

    fn action(&self, action: Action) {
        log::trace!(target: TARGET, "decoded action={action}");
    }

    fn action_dropped(&self, action: Action) {
        log::warn!(target: TARGET, "dropped action={action} on cancellation");
    }

    fn failed(&self, error: &MonitorError) {
        log::error!(target: TARGET, "{} failed: {error}", error.phase());
    }

    fn run_finished(&self, lines: LinePair) {
        log::info!(target: TARGET, "rotary encoder finished clock_pin={} data_pin={}", lines.clock, lines.data);
    }
}
