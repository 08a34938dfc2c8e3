//! In-memory line provider.
//!
//! [`SimulatedChip`] behaves like a GPIO chip with programmable levels. Tests
//! drive edges with [`SimulatedChip::drive`], inject faults, and inspect the
//! open/read/subscribe/release counters afterwards.
//!
//! Every driven edge records the level sample it produced, and the
//! subscription hands those samples back in order. This makes the levels a
//! monitor reads for edge N exactly the levels that caused edge N, however
//! far the monitor lags behind the driver.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::LineError;
use crate::line::traits::{
    Edge, EdgeEvent, EdgeSender, Level, LevelPair, LineHandle, LineOffset, LinePair, LineProvider,
    LineSubscription,
};

const EDGE_SPACING_NS: u64 = 1_000;

/// Provider call counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedStats {
    /// Successful single-line opens.
    pub opens: usize,
    /// Single-line handles not yet dropped.
    pub live_handles: usize,
    /// Single-line level reads.
    pub reads: usize,
    /// Subscribe attempts, failed ones included.
    pub subscribes: usize,
    /// Subscription releases (first call per subscription only).
    pub releases: usize,
    /// Level pair reads through a subscription.
    pub level_reads: usize,
}

#[derive(Debug, Default)]
struct Faults {
    open: bool,
    read: bool,
    subscribe: bool,
    level_reads: usize,
}

#[derive(Debug)]
struct ActiveSubscription {
    id: u64,
    lines: LinePair,
    events: Option<EdgeSender>,
    samples: VecDeque<LevelPair>,
}

#[derive(Debug, Default)]
struct ChipState {
    levels: HashMap<LineOffset, Level>,
    faults: Faults,
    stats: SimulatedStats,
    active: Option<ActiveSubscription>,
    next_id: u64,
    now_ns: u64,
}

impl ChipState {
    fn level(&self, offset: LineOffset) -> Level {
        self.levels.get(&offset).copied().unwrap_or(Level::Low)
    }
}

/// A simulated GPIO chip.
///
/// Cloning shares the underlying chip. Edges should be driven from a single
/// thread so that sample order and event order agree.
#[derive(Debug, Clone, Default)]
pub struct SimulatedChip {
    state: Arc<Mutex<ChipState>>,
}

impl SimulatedChip {
    /// Creates a chip with every line low.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial level of a line.
    #[must_use]
    pub fn with_level(self, offset: LineOffset, level: Level) -> Self {
        self.set_level(offset, level);
        self
    }

    /// Sets a line level without emitting an edge.
    pub fn set_level(&self, offset: LineOffset, level: Level) {
        self.lock().levels.insert(offset, level);
    }

    /// Current level of a line.
    #[must_use]
    pub fn level(&self, offset: LineOffset) -> Level {
        self.lock().level(offset)
    }

    /// Makes single-line opens fail.
    pub fn fail_open(&self, fail: bool) {
        self.lock().faults.open = fail;
    }

    /// Makes single-line level reads fail.
    pub fn fail_line_reads(&self, fail: bool) {
        self.lock().faults.read = fail;
    }

    /// Makes subscribe attempts fail.
    pub fn fail_subscribe(&self, fail: bool) {
        self.lock().faults.subscribe = fail;
    }

    /// Makes the next `count` subscription level reads fail.
    pub fn fail_next_level_reads(&self, count: usize) {
        self.lock().faults.level_reads = count;
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn stats(&self) -> SimulatedStats {
        self.lock().stats
    }

    /// Returns true while a subscription is held.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Polls until a subscription is held or `timeout` elapses.
    #[must_use]
    pub fn wait_for_subscription(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_subscribed() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Sets both encoder lines and emits one edge for the change.
    ///
    /// The edge is reported on the clock line if the clock changed, otherwise
    /// on the data line if it changed, otherwise as a clock re-read (bounce).
    /// Blocks while the subscriber's edge queue is full.
    pub fn drive(&self, clock: Level, data: Level) -> Result<(), LineError> {
        let (events, event) = {
            let mut state = self.lock();
            let Some(lines) = state.active.as_ref().map(|a| a.lines) else {
                return Err(LineError::Closed {
                    message: "no active subscription".to_string(),
                });
            };

            let (offset, level) = if state.level(lines.clock) != clock {
                (lines.clock, clock)
            } else if state.level(lines.data) != data {
                (lines.data, data)
            } else {
                (lines.clock, clock)
            };

            state.levels.insert(lines.clock, clock);
            state.levels.insert(lines.data, data);
            state.now_ns += EDGE_SPACING_NS;
            let timestamp_ns = state.now_ns;

            let Some(active) = state.active.as_mut() else {
                return Err(LineError::Closed {
                    message: "no active subscription".to_string(),
                });
            };
            active.samples.push_back(LevelPair::new(clock, data));
            let Some(events) = active.events.clone() else {
                return Err(LineError::Closed {
                    message: "edge stream disconnected".to_string(),
                });
            };

            let edge = if level.is_high() { Edge::Rising } else { Edge::Falling };
            (events, EdgeEvent { offset, edge, timestamp_ns })
        };

        // Send outside the lock: the subscriber takes it to read levels.
        events.send(Ok(event)).map_err(|_| LineError::Closed {
            message: "subscriber dropped the edge queue".to_string(),
        })
    }

    /// Pushes a provider failure into the edge queue.
    pub fn inject_error(&self, error: LineError) -> Result<(), LineError> {
        let events = self
            .lock()
            .active
            .as_ref()
            .and_then(|a| a.events.clone())
            .ok_or_else(|| LineError::Closed {
                message: "no active subscription".to_string(),
            })?;
        events.send(Err(error)).map_err(|_| LineError::Closed {
            message: "subscriber dropped the edge queue".to_string(),
        })
    }

    /// Drops the edge queue sender while keeping the subscription held.
    pub fn disconnect(&self) {
        if let Some(active) = self.lock().active.as_mut() {
            active.events = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChipState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LineProvider for SimulatedChip {
    fn open_input(&self, offset: LineOffset) -> Result<Box<dyn LineHandle>, LineError> {
        let mut state = self.lock();
        if state.faults.open {
            return Err(LineError::Open {
                offset,
                message: "simulated open failure".to_string(),
            });
        }
        state.stats.opens += 1;
        state.stats.live_handles += 1;
        Ok(Box::new(SimulatedLine {
            offset,
            state: Arc::clone(&self.state),
        }))
    }

    fn subscribe(
        &self,
        lines: LinePair,
        events: EdgeSender,
    ) -> Result<Box<dyn LineSubscription>, LineError> {
        let mut state = self.lock();
        state.stats.subscribes += 1;
        if state.faults.subscribe {
            return Err(LineError::Request {
                clock: lines.clock,
                data: lines.data,
                message: "simulated subscribe failure".to_string(),
            });
        }
        if state.active.is_some() {
            return Err(LineError::Request {
                clock: lines.clock,
                data: lines.data,
                message: "lines busy".to_string(),
            });
        }

        state.next_id += 1;
        let id = state.next_id;
        state.active = Some(ActiveSubscription {
            id,
            lines,
            events: Some(events),
            samples: VecDeque::new(),
        });

        Ok(Box::new(SimulatedSubscription {
            id,
            lines,
            state: Arc::clone(&self.state),
            released: false,
        }))
    }
}

struct SimulatedLine {
    offset: LineOffset,
    state: Arc<Mutex<ChipState>>,
}

impl LineHandle for SimulatedLine {
    fn offset(&self) -> LineOffset {
        self.offset
    }

    fn level(&self) -> Result<Level, LineError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stats.reads += 1;
        if state.faults.read {
            return Err(LineError::Read {
                offset: self.offset,
                message: "simulated read failure".to_string(),
            });
        }
        Ok(state.level(self.offset))
    }
}

impl Drop for SimulatedLine {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stats.live_handles = state.stats.live_handles.saturating_sub(1);
    }
}

struct SimulatedSubscription {
    id: u64,
    lines: LinePair,
    state: Arc<Mutex<ChipState>>,
    released: bool,
}

impl LineSubscription for SimulatedSubscription {
    fn lines(&self) -> LinePair {
        self.lines
    }

    fn levels(&self) -> Result<LevelPair, LineError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stats.level_reads += 1;
        if state.faults.level_reads > 0 {
            state.faults.level_reads -= 1;
            return Err(LineError::Read {
                offset: self.lines.clock,
                message: "simulated level read failure".to_string(),
            });
        }

        let sample = state
            .active
            .as_mut()
            .filter(|a| a.id == self.id)
            .and_then(|a| a.samples.pop_front());
        Ok(sample.unwrap_or_else(|| {
            LevelPair::new(state.level(self.lines.clock), state.level(self.lines.data))
        }))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stats.releases += 1;
        if state.active.as_ref().is_some_and(|a| a.id == self.id) {
            state.active = None;
        }
    }
}

impl Drop for SimulatedSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    const CLOCK: LineOffset = 17;
    const DATA: LineOffset = 18;

    #[test]
    fn test_handle_accounting() {
        let chip = SimulatedChip::new().with_level(CLOCK, Level::High);
        {
            let handle = chip.open_input(CLOCK).unwrap();
            assert_eq!(handle.offset(), CLOCK);
            assert_eq!(handle.level().unwrap(), Level::High);
            assert_eq!(chip.stats().live_handles, 1);
        }
        let stats = chip.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.live_handles, 0);
    }

    #[test]
    fn test_open_failure() {
        let chip = SimulatedChip::new();
        chip.fail_open(true);
        assert!(matches!(chip.open_input(CLOCK), Err(LineError::Open { offset: CLOCK, .. })));
        assert_eq!(chip.stats().opens, 0);
    }

    #[test]
    fn test_drive_records_samples_in_order() {
        let chip = SimulatedChip::new();
        let (tx, rx) = unbounded();
        let sub = chip.subscribe(LinePair::new(CLOCK, DATA), tx).unwrap();

        chip.drive(Level::High, Level::Low).unwrap();
        chip.drive(Level::Low, Level::Low).unwrap();
        chip.drive(Level::Low, Level::High).unwrap();

        let edges: Vec<EdgeEvent> = rx.try_iter().map(Result::unwrap).collect();
        assert_eq!(edges.len(), 3);
        assert_eq!((edges[0].offset, edges[0].edge), (CLOCK, Edge::Rising));
        assert_eq!((edges[1].offset, edges[1].edge), (CLOCK, Edge::Falling));
        assert_eq!((edges[2].offset, edges[2].edge), (DATA, Edge::Rising));
        assert!(edges[0].timestamp_ns < edges[1].timestamp_ns);

        assert_eq!(sub.levels().unwrap(), LevelPair::new(Level::High, Level::Low));
        assert_eq!(sub.levels().unwrap(), LevelPair::new(Level::Low, Level::Low));
        assert_eq!(sub.levels().unwrap(), LevelPair::new(Level::Low, Level::High));
        // Queue drained: falls back to the current levels.
        assert_eq!(sub.levels().unwrap(), LevelPair::new(Level::Low, Level::High));
    }

    #[test]
    fn test_release_is_idempotent() {
        let chip = SimulatedChip::new();
        let (tx, _rx) = unbounded();
        let mut sub = chip.subscribe(LinePair::new(CLOCK, DATA), tx).unwrap();
        assert!(chip.is_subscribed());

        sub.release();
        sub.release();
        drop(sub);

        assert!(!chip.is_subscribed());
        assert_eq!(chip.stats().releases, 1);
    }

    #[test]
    fn test_second_subscription_is_busy() {
        let chip = SimulatedChip::new();
        let (tx, _rx) = unbounded();
        let _sub = chip.subscribe(LinePair::new(CLOCK, DATA), tx.clone()).unwrap();
        assert!(matches!(
            chip.subscribe(LinePair::new(CLOCK, DATA), tx),
            Err(LineError::Request { .. })
        ));
        assert_eq!(chip.stats().subscribes, 2);
    }

    #[test]
    fn test_level_read_faults_count_down() {
        let chip = SimulatedChip::new();
        let (tx, _rx) = unbounded();
        let sub = chip.subscribe(LinePair::new(CLOCK, DATA), tx).unwrap();
        chip.fail_next_level_reads(1);
        assert!(sub.levels().is_err());
        assert!(sub.levels().is_ok());
    }

    #[test]
    fn test_drive_without_subscription() {
        let chip = SimulatedChip::new();
        assert!(matches!(chip.drive(Level::High, Level::Low), Err(LineError::Closed { .. })));
    }
}
