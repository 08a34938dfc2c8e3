//! Linux GPIO character device provider.
//!
//! Built on `gpiocdev`. Single-line reads use a short-lived request that is
//! released when the handle drops. Subscriptions hold one two-line request
//! with both-edge detection; a named pump thread moves kernel edge events
//! into the monitor's edge queue until the subscription is released.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::SendTimeoutError;
use gpiocdev::line::{EdgeDetection, EdgeKind, Value, Values};
use gpiocdev::Request;

use crate::error::LineError;
use crate::line::traits::{
    Edge, EdgeEvent, EdgeSender, Level, LevelPair, LineHandle, LineOffset, LinePair, LineProvider,
    LineSubscription,
};

/// How long the pump blocks before re-checking its stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const DEFAULT_CONSUMER: &str = "ky040";

/// A GPIO chip opened through the character device.
#[derive(Debug, Clone)]
pub struct GpioChip {
    path: PathBuf,
    consumer: String,
}

impl GpioChip {
    /// Refers to a chip by name (`gpiochip0`) or by device path.
    #[must_use]
    pub fn new(chip: &str) -> Self {
        Self {
            path: chip_path(chip),
            consumer: DEFAULT_CONSUMER.to_string(),
        }
    }

    /// Sets the consumer label the kernel shows for requested lines.
    #[must_use]
    pub fn with_consumer(mut self, consumer: impl Into<String>) -> Self {
        self.consumer = consumer.into();
        self
    }

    /// Device path of the chip.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn chip_path(chip: &str) -> PathBuf {
    if chip.contains('/') {
        PathBuf::from(chip)
    } else {
        Path::new("/dev").join(chip)
    }
}

const fn level_of(value: Value) -> Level {
    match value {
        Value::Active => Level::High,
        Value::Inactive => Level::Low,
    }
}

impl LineProvider for GpioChip {
    fn open_input(&self, offset: LineOffset) -> Result<Box<dyn LineHandle>, LineError> {
        let req = Request::builder()
            .on_chip(self.path.clone())
            .with_consumer(self.consumer.clone())
            .with_line(offset)
            .as_input()
            .request()
            .map_err(|e| LineError::Open {
                offset,
                message: e.to_string(),
            })?;

        Ok(Box::new(GpioLine { offset, req }))
    }

    fn subscribe(
        &self,
        lines: LinePair,
        events: EdgeSender,
    ) -> Result<Box<dyn LineSubscription>, LineError> {
        let request_err = |message: String| LineError::Request {
            clock: lines.clock,
            data: lines.data,
            message,
        };

        let req = Request::builder()
            .on_chip(self.path.clone())
            .with_consumer(self.consumer.clone())
            .with_lines(&[lines.clock, lines.data])
            .as_input()
            .with_edge_detection(EdgeDetection::BothEdges)
            .request()
            .map_err(|e| request_err(e.to_string()))?;
        let req = Arc::new(req);
        let stop = Arc::new(AtomicBool::new(false));

        let pump = {
            let req = Arc::clone(&req);
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("ky040-edges".to_string())
                .spawn(move || pump_edges(&req, &stop, &events))
                .map_err(|e| request_err(format!("spawn edge pump: {e}")))?
        };

        Ok(Box::new(GpioSubscription {
            lines,
            req: Some(req),
            stop,
            pump: Some(pump),
        }))
    }
}

struct GpioLine {
    offset: LineOffset,
    req: Request,
}

impl LineHandle for GpioLine {
    fn offset(&self) -> LineOffset {
        self.offset
    }

    fn level(&self) -> Result<Level, LineError> {
        self.req.value(self.offset).map(level_of).map_err(|e| LineError::Read {
            offset: self.offset,
            message: e.to_string(),
        })
    }
}

struct GpioSubscription {
    lines: LinePair,
    req: Option<Arc<Request>>,
    stop: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl LineSubscription for GpioSubscription {
    fn lines(&self) -> LinePair {
        self.lines
    }

    fn levels(&self) -> Result<LevelPair, LineError> {
        let Some(req) = self.req.as_ref() else {
            return Err(LineError::Closed {
                message: "subscription released".to_string(),
            });
        };

        let read_err = |message: String| LineError::Read {
            offset: self.lines.clock,
            message,
        };

        let mut values = Values::from_offsets(&[self.lines.clock, self.lines.data]);
        req.values(&mut values).map_err(|e| read_err(e.to_string()))?;

        let clock = values
            .get(self.lines.clock)
            .ok_or_else(|| read_err("clock value missing".to_string()))?;
        let data = values
            .get(self.lines.data)
            .ok_or_else(|| read_err("data value missing".to_string()))?;

        Ok(LevelPair::new(level_of(clock), level_of(data)))
    }

    fn release(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(pump) = self.pump.take() {
            // The pump re-checks the flag at least every POLL_INTERVAL.
            let _ = pump.join();
        }
        // Last reference: closes the kernel request.
        self.req = None;
    }
}

impl Drop for GpioSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

fn pump_edges(req: &Request, stop: &AtomicBool, events: &EdgeSender) {
    while !stop.load(Ordering::Acquire) {
        let item = match req.wait_edge_event(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => req
                .read_edge_event()
                .map(|ev| EdgeEvent {
                    offset: ev.offset,
                    edge: match ev.kind {
                        EdgeKind::Rising => Edge::Rising,
                        EdgeKind::Falling => Edge::Falling,
                    },
                    timestamp_ns: ev.timestamp_ns,
                })
                .map_err(|e| LineError::Closed {
                    message: format!("read edge event: {e}"),
                }),
            Err(e) => Err(LineError::Closed {
                message: format!("wait for edge event: {e}"),
            }),
        };

        let failed = item.is_err();
        if !forward(item, stop, events) || failed {
            return;
        }
    }
}

/// Blocks on a full queue, but never past a stop request.
fn forward(
    mut item: Result<EdgeEvent, LineError>,
    stop: &AtomicBool,
    events: &EdgeSender,
) -> bool {
    loop {
        match events.send_timeout(item, POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => {
                if stop.load(Ordering::Acquire) {
                    return false;
                }
                item = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chip_path_resolution() {
        assert_eq!(GpioChip::new("gpiochip0").path(), Path::new("/dev/gpiochip0"));
        assert_eq!(GpioChip::new("/dev/gpiochip4").path(), Path::new("/dev/gpiochip4"));
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_of(Value::Active), Level::High);
        assert_eq!(level_of(Value::Inactive), Level::Low);
    }
}
