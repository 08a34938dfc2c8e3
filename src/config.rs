//! Reader configuration.
//!
//! [`EncoderConfig`] holds what the `ky040-read` binary needs: which chip,
//! which two lines, how loud to log, and how the monitor publishes. It can
//! be loaded from a JSON file and then overridden field by field from flags.

use std::path::Path;
use std::str::FromStr;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::line::{LineOffset, LinePair};
use crate::monitor::{MonitorConfig, PublishMode};

/// Default chip name.
pub const DEFAULT_CHIP: &str = "gpiochip0";

/// Encoder reader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Chip name (`gpiochip0`) or device path.
    pub chip: String,
    /// Clock line. 0 means unset.
    pub clock_pin: LineOffset,
    /// Data line. 0 means unset.
    pub data_pin: LineOffset,
    /// Log level name; `None` keeps the logger's default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Edge queue capacity between provider and run loop.
    pub edge_queue_capacity: usize,
    /// Publish behaviour under cancellation.
    pub publish: PublishMode,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            chip: DEFAULT_CHIP.to_string(),
            clock_pin: 0,
            data_pin: 0,
            log_level: None,
            edge_queue_capacity: MonitorConfig::DEFAULT_EDGE_QUEUE_CAPACITY,
            publish: PublishMode::Blocking,
        }
    }
}

impl EncoderConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Reads and parses a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Checks every field. Pins must be set, positive and distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chip.trim().is_empty() {
            return Err(ConfigError::EmptyChip);
        }
        if self.clock_pin == 0 {
            return Err(ConfigError::InvalidPin {
                name: "clock",
                value: self.clock_pin,
            });
        }
        if self.data_pin == 0 {
            return Err(ConfigError::InvalidPin {
                name: "data",
                value: self.data_pin,
            });
        }
        if self.clock_pin == self.data_pin {
            return Err(ConfigError::DuplicatePin {
                value: self.clock_pin,
            });
        }
        if self.edge_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "edge_queue_capacity",
            });
        }
        self.log_filter()?;
        Ok(())
    }

    /// Parsed log level, if one is set.
    pub fn log_filter(&self) -> Result<Option<LevelFilter>, ConfigError> {
        self.log_level.as_deref().map(parse_log_level).transpose()
    }

    /// Monitor settings derived from this configuration.
    #[must_use]
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig::new(LinePair::new(self.clock_pin, self.data_pin))
            .with_edge_queue_capacity(self.edge_queue_capacity)
            .with_publish_mode(self.publish)
    }
}

/// Parses a log level name (`off`, `error`, `warn`, `info`, `debug`, `trace`),
/// case-insensitively.
pub fn parse_log_level(value: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(value.trim()).map_err(|_| ConfigError::InvalidLogLevel {
        value: value.to_string(),
    })
}
