//! Encoder monitor run loop.
//!
//! One `run` call reads the seed clock level, subscribes to edges on both
//! lines, and then drains the provider's edge queue on the calling thread.
//! Draining a single queue on a single thread is what serializes edge
//! processing: the decoder state is never touched from two places at once.

use std::sync::Arc;

use crossbeam_channel::{bounded, select, Receiver};
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::cancel::Cancellation;
use crate::decoder::QuadratureDecoder;
use crate::error::{LineError, MonitorError};
use crate::line::{EdgeEvent, Level, LineProvider, LinePair, LineSubscription};

use super::observer::{MonitorObserver, NoopObserver};
use super::state::{MonitorState, MonitorStatus};
use super::stream::ActionSender;

/// What happens to a decoded action when cancellation fires while it is
/// waiting for a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Wait for a consumer regardless of cancellation. No decided action is
    /// lost, but consumers must keep draining until the run returns.
    #[default]
    Blocking,
    /// Race the publish against cancellation; if cancellation wins the
    /// action is dropped and reported to the observer.
    CancelAware,
}

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Clock and data lines.
    pub lines: LinePair,
    /// Max edge events queued between the provider and the run loop.
    pub edge_queue_capacity: usize,
    /// Publish behaviour under cancellation.
    pub publish: PublishMode,
}

impl MonitorConfig {
    /// Default edge queue capacity.
    pub const DEFAULT_EDGE_QUEUE_CAPACITY: usize = 64;

    #[must_use]
    pub const fn new(lines: LinePair) -> Self {
        Self {
            lines,
            edge_queue_capacity: Self::DEFAULT_EDGE_QUEUE_CAPACITY,
            publish: PublishMode::Blocking,
        }
    }

    #[must_use]
    pub fn with_publish_mode(mut self, publish: PublishMode) -> Self {
        self.publish = publish;
        self
    }

    #[must_use]
    pub fn with_edge_queue_capacity(mut self, capacity: usize) -> Self {
        self.edge_queue_capacity = capacity;
        self
    }
}

enum Flow {
    Continue,
    Cancelled,
}

/// Releases the subscription on every exit path, unwinding included.
struct SubscriptionGuard(Box<dyn LineSubscription>);

impl SubscriptionGuard {
    fn get(&self) -> &dyn LineSubscription {
        self.0.as_ref()
    }

    fn release(&mut self) {
        self.0.release();
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Turns edge events on a clock/data pair into published [`Action`]s.
///
/// A monitor is single-shot: [`EncoderMonitor::run`] consumes it. Restarting
/// means building a new monitor.
pub struct EncoderMonitor {
    provider: Arc<dyn LineProvider>,
    cfg: MonitorConfig,
    observer: Arc<dyn MonitorObserver>,
    status: MonitorStatus,
}

impl std::fmt::Debug for EncoderMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderMonitor")
            .field("cfg", &self.cfg)
            .field("state", &self.status.state())
            .finish_non_exhaustive()
    }
}

impl EncoderMonitor {
    /// Creates a monitor over `provider` with no observer.
    pub fn new(provider: Arc<dyn LineProvider>, cfg: MonitorConfig) -> Self {
        Self {
            provider,
            cfg,
            observer: Arc::new(NoopObserver),
            status: MonitorStatus::new(),
        }
    }

    /// Installs an observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn MonitorObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle on the lifecycle state, valid after `run` consumes the monitor.
    #[must_use]
    pub fn status(&self) -> MonitorStatus {
        self.status.clone()
    }

    #[allow(missing_docs)]
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.cfg
    }

    /// Runs until `cancel` fires.
    ///
    /// Returns `Ok(())` only for cancellation. Initialization failures return
    /// before any subscription exists; runtime failures return after the
    /// subscription is released. `actions` is dropped on return, which tells
    /// consumers no further actions will arrive.
    pub fn run(self, cancel: &Cancellation, actions: ActionSender) -> Result<(), MonitorError> {
        let lines = self.cfg.lines;
        self.observer.run_started(lines);

        let result = self.run_inner(cancel, &actions);
        drop(actions);

        if let Err(err) = &result {
            self.observer.failed(err);
        }
        self.status.advance(MonitorState::Closed);
        self.observer.run_finished(lines);

        result
    }

    fn run_inner(&self, cancel: &Cancellation, actions: &ActionSender) -> Result<(), MonitorError> {
        let lines = self.cfg.lines;

        self.status.advance(MonitorState::ReadingInitialClock);
        let initial_clock = self.read_initial_clock()?;

        let (edge_tx, edge_rx) = bounded(self.cfg.edge_queue_capacity.max(1));
        let subscription = self
            .provider
            .subscribe(lines, edge_tx)
            .map_err(|source| MonitorError::Subscription {
                clock: lines.clock,
                data: lines.data,
                source,
            })?;
        let mut subscription = SubscriptionGuard(subscription);

        self.status.advance(MonitorState::Subscribed);
        self.observer.subscribed(lines);

        let mut decoder = QuadratureDecoder::new(initial_clock);
        let result = self.process_edges(&mut decoder, subscription.get(), &edge_rx, cancel, actions);

        self.status.advance(MonitorState::Closing);
        subscription.release();

        result
    }

    /// Opens the clock line, reads it once, and releases it before returning.
    fn read_initial_clock(&self) -> Result<Level, MonitorError> {
        let offset = self.cfg.lines.clock;
        let access_err = |source: LineError| MonitorError::LineAccess { offset, source };

        let handle = self.provider.open_input(offset).map_err(access_err)?;
        let level = handle.level().map_err(access_err)?;
        drop(handle);

        self.observer.initial_clock(offset, level);
        Ok(level)
    }

    fn process_edges(
        &self,
        decoder: &mut QuadratureDecoder,
        subscription: &dyn LineSubscription,
        edges: &Receiver<Result<EdgeEvent, LineError>>,
        cancel: &Cancellation,
        actions: &ActionSender,
    ) -> Result<(), MonitorError> {
        loop {
            select! {
                recv(cancel.receiver()) -> _ => return Ok(()),
                recv(edges) -> msg => {
                    let event = match msg {
                        Ok(Ok(event)) => event,
                        Ok(Err(source)) => return Err(MonitorError::RuntimeRead { source }),
                        Err(_) => return Err(MonitorError::EdgeStreamClosed),
                    };
                    if let Flow::Cancelled = self.handle_edge(decoder, subscription, &event, cancel, actions)? {
                        return Ok(());
                    }
                }
            }
        }
    }

    fn handle_edge(
        &self,
        decoder: &mut QuadratureDecoder,
        subscription: &dyn LineSubscription,
        event: &EdgeEvent,
        cancel: &Cancellation,
        actions: &ActionSender,
    ) -> Result<Flow, MonitorError> {
        let levels = subscription
            .levels()
            .map_err(|source| MonitorError::RuntimeRead { source })?;
        self.observer.edge(event, levels);

        match decoder.step(levels) {
            Some(action) => self.publish(action, cancel, actions),
            None => Ok(Flow::Continue),
        }
    }

    fn publish(
        &self,
        action: Action,
        cancel: &Cancellation,
        actions: &ActionSender,
    ) -> Result<Flow, MonitorError> {
        self.observer.action(action);

        match self.cfg.publish {
            PublishMode::Blocking => {
                actions
                    .sender()
                    .send(action)
                    .map_err(|_| MonitorError::SinkDisconnected)?;
                Ok(Flow::Continue)
            }
            PublishMode::CancelAware => select! {
                send(actions.sender(), action) -> res => {
                    res.map_err(|_| MonitorError::SinkDisconnected)?;
                    Ok(Flow::Continue)
                }
                recv(cancel.receiver()) -> _ => {
                    self.observer.action_dropped(action);
                    Ok(Flow::Cancelled)
                }
            },
        }
    }
}
