//! Error types for ky040.
//!
//! All errors are strongly typed using thiserror. Each layer owns its own
//! enum (line provider, monitor lifecycle, configuration) and [`Ky040Error`]
//! wraps them for callers that do not care which layer failed.

use thiserror::Error;

use crate::line::LineOffset;

/// Failures reported by a line provider.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("Cannot open line {offset}: {message}")]
    Open {
        offset: LineOffset,
        message: String,
    },

    #[error("Cannot read line {offset}: {message}")]
    Read {
        offset: LineOffset,
        message: String,
    },

    #[error("Cannot request edge events on lines {clock}/{data}: {message}")]
    Request {
        clock: LineOffset,
        data: LineOffset,
        message: String,
    },

    #[error("Line subscription closed: {message}")]
    Closed {
        message: String,
    },
}

/// Phase of a monitor run in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorPhase {
    /// Reading the initial clock level.
    Initialization,
    /// Opening the edge subscription.
    Subscribe,
    /// Processing edge events.
    Runtime,
}

impl MonitorPhase {
    /// Stable lowercase name, used in log output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialization => "initialization",
            Self::Subscribe => "subscribe",
            Self::Runtime => "runtime",
        }
    }
}

impl std::fmt::Display for MonitorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that terminate an encoder monitor run.
///
/// A run that ends because its cancellation fired returns `Ok(())`; every
/// other exit is one of these.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Reading initial clock level on line {offset} failed: {source}")]
    LineAccess {
        offset: LineOffset,
        #[source]
        source: LineError,
    },

    #[error("Subscribing to edges on lines {clock}/{data} failed: {source}")]
    Subscription {
        clock: LineOffset,
        data: LineOffset,
        #[source]
        source: LineError,
    },

    #[error("Reading line levels during edge processing failed: {source}")]
    RuntimeRead {
        #[source]
        source: LineError,
    },

    #[error("Edge event stream closed before cancellation")]
    EdgeStreamClosed,

    #[error("Action sink has no remaining consumers")]
    SinkDisconnected,
}

impl MonitorError {
    /// The run phase that failed.
    #[must_use]
    pub const fn phase(&self) -> MonitorPhase {
        match self {
            Self::LineAccess { .. } => MonitorPhase::Initialization,
            Self::Subscription { .. } => MonitorPhase::Subscribe,
            Self::RuntimeRead { .. } | Self::EdgeStreamClosed | Self::SinkDisconnected => {
                MonitorPhase::Runtime
            }
        }
    }

    /// Returns true if the run failed before any subscription was active.
    #[must_use]
    pub const fn is_initialization(&self) -> bool {
        matches!(self.phase(), MonitorPhase::Initialization | MonitorPhase::Subscribe)
    }
}

/// Errors returned when receiving from an action stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Action stream closed: the monitor has finished")]
    Closed,

    #[error("No action within {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

impl StreamError {
    /// Returns true if the producer is gone and no action will ever arrive.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Pin '{name}' must be a positive line number, got {value}")]
    InvalidPin {
        name: &'static str,
        value: LineOffset,
    },

    #[error("Clock and data pins must differ, both are {value}")]
    DuplicatePin {
        value: LineOffset,
    },

    #[error("Chip name cannot be empty")]
    EmptyChip,

    #[error("Invalid log level '{value}'")]
    InvalidLogLevel {
        value: String,
    },

    #[error("Field '{field}' must be greater than zero")]
    ZeroCapacity {
        field: &'static str,
    },

    #[error("Failed to parse configuration: {message}")]
    Parse {
        message: String,
    },

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for ky040.
#[derive(Debug, Error)]
pub enum Ky040Error {
    #[error("Line error: {0}")]
    Line(#[from] LineError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Ky040Error {
    /// Returns true if this is a line provider error.
    #[must_use]
    pub const fn is_line(&self) -> bool {
        matches!(self, Self::Line(_))
    }

    /// Returns true if this is a monitor error.
    #[must_use]
    pub const fn is_monitor(&self) -> bool {
        matches!(self, Self::Monitor(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for ky040 operations.
pub type Ky040Result<T> = Result<T, Ky040Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_error_messages() {
        let err = LineError::Open {
            offset: 17,
            message: "busy".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("17"));
        assert!(msg.contains("busy"));
    }

    #[test]
    fn test_monitor_error_phases() {
        let access = MonitorError::LineAccess {
            offset: 17,
            source: LineError::Read {
                offset: 17,
                message: "eio".to_string(),
            },
        };
        assert_eq!(access.phase(), MonitorPhase::Initialization);
        assert!(access.is_initialization());

        let sub = MonitorError::Subscription {
            clock: 17,
            data: 18,
            source: LineError::Request {
                clock: 17,
                data: 18,
                message: "busy".to_string(),
            },
        };
        assert_eq!(sub.phase(), MonitorPhase::Subscribe);
        assert!(sub.is_initialization());

        let runtime = MonitorError::RuntimeRead {
            source: LineError::Closed {
                message: "gone".to_string(),
            },
        };
        assert_eq!(runtime.phase(), MonitorPhase::Runtime);
        assert!(!runtime.is_initialization());
        assert!(!MonitorError::SinkDisconnected.is_initialization());
    }

    #[test]
    fn test_monitor_error_names_line() {
        let err = MonitorError::LineAccess {
            offset: 5,
            source: LineError::Open {
                offset: 5,
                message: "no such line".to_string(),
            },
        };
        let msg = format!("{err}");
        assert!(msg.contains("initial clock"));
        assert!(msg.contains("line 5"));
    }

    #[test]
    fn test_stream_error() {
        let err = StreamError::Timeout { duration_ms: 250 };
        assert!(format!("{err}").contains("250ms"));
        assert!(!err.is_closed());
        assert!(StreamError::Closed.is_closed());
    }

    #[test]
    fn test_config_error() {
        let err = ConfigError::InvalidPin {
            name: "clock",
            value: 0,
        };
        let msg = format!("{err}");
        assert!(msg.contains("clock"));
        assert!(msg.contains("positive"));
    }

    #[test]
    fn test_top_level_from() {
        let err: Ky040Error = ConfigError::EmptyChip.into();
        assert!(err.is_config());
        assert!(!err.is_monitor());

        let err: Ky040Error = MonitorError::EdgeStreamClosed.into();
        assert!(err.is_monitor());

        let err: Ky040Error = LineError::Closed {
            message: "x".to_string(),
        }
        .into();
        assert!(err.is_line());
        assert!(format!("{err}").starts_with("Line error"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(MonitorPhase::Subscribe.to_string(), "subscribe");
        assert_eq!(MonitorPhase::Runtime.as_str(), "runtime");
    }
}
