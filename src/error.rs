// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Error types shared across the crate.
//!
//! Each failure class has its own enum so the control loop can decide locally whether to absorb
//! it (sensor glitches, log I/O) or escalate to a safe shutdown (hardware write failures).

use core::fmt;
use std::io;

/// Failure reported by the hardware abstraction layer.
#[derive(Debug, Clone, PartialEq)]
pub enum HwError {
    /// The channel or pin id is not wired on this rig.
    InvalidChannel(u8),
    /// The peripheral rejected the access.
    Io(String),
}

impl fmt::Display for HwError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HwError::InvalidChannel(ch) => write!(f, "invalid hardware channel {}", ch),
            HwError::Io(msg) => write!(f, "hardware access failed: {}", msg),
        }
    }
}

impl std::error::Error for HwError {}

/// Why a sensor reading was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Raw counts sat on an ADC rail.
    Saturated { channel: u8, raw: u16 },
    /// The ADC had no conversion ready.
    NotReady { channel: u8 },
    /// The converted value is not physically possible.
    OutOfRange { value: f32 },
    /// The ADC itself failed.
    Hardware(HwError),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SensorError::Saturated { channel, raw } => {
                write!(f, "ADC channel {} saturated at {} counts", channel, raw)
            }
            SensorError::NotReady { channel } => write!(f, "ADC channel {} not ready", channel),
            SensorError::OutOfRange { value } => write!(f, "reading {:.3} out of range", value),
            SensorError::Hardware(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SensorError {}

impl From<HwError> for SensorError {
    fn from(e: HwError) -> Self {
        SensorError::Hardware(e)
    }
}

/// Rejected operator parameter or configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid parameter value (NaN, infinity, or out of allowed range)
    InvalidParameter(&'static str),
    NegativeDuration(i64),
    DurationTooLong(i64),
    ForceOutOfRange { value: f32, min: f32, max: f32 },
    InvalidCycles(i64),
    InvalidSampleCount(i64),
    /// The config file could not be read or parsed.
    File(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidParameter(param) => write!(f, "Invalid parameter: {}", param),
            ConfigError::NegativeDuration(ms) => write!(f, "duration {} ms is negative", ms),
            ConfigError::DurationTooLong(ms) => write!(f, "duration {} ms is too long", ms),
            ConfigError::ForceOutOfRange { value, min, max } => {
                write!(f, "force {} outside [{}, {}]", value, min, max)
            }
            ConfigError::InvalidCycles(n) => write!(f, "cycle count {} must be at least 1", n),
            ConfigError::InvalidSampleCount(n) => write!(f, "sample count {} must be 1 or 2", n),
            ConfigError::File(msg) => write!(f, "config file: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::File(e.to_string())
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::File(e.to_string())
    }
}

/// Failure while persisting sample data.
#[derive(Debug)]
pub enum LogError {
    Io(io::Error),
    Csv(csv::Error),
    /// Log path longer than the bounded path type allows.
    NameTooLong(usize),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogError::Io(e) => write!(f, "log I/O error: {}", e),
            LogError::Csv(e) => write!(f, "log format error: {}", e),
            LogError::NameTooLong(len) => write!(f, "log file name is {} bytes", len),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::Io(e) => Some(e),
            LogError::Csv(e) => Some(e),
            LogError::NameTooLong(_) => None,
        }
    }
}

impl From<io::Error> for LogError {
    fn from(e: io::Error) -> Self {
        LogError::Io(e)
    }
}

impl From<csv::Error> for LogError {
    fn from(e: csv::Error) -> Self {
        LogError::Csv(e)
    }
}

/// Failure handing a command to the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayError {
    Rejected(ConfigError),
    /// The previous command has not been consumed yet.
    Busy,
    /// The control loop has exited.
    Disconnected,
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GatewayError::Rejected(e) => write!(f, "rejected: {}", e),
            GatewayError::Busy => write!(f, "control loop busy"),
            GatewayError::Disconnected => write!(f, "control loop has exited"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<ConfigError> for GatewayError {
    fn from(e: ConfigError) -> Self {
        GatewayError::Rejected(e)
    }
}

/// Malformed operator command line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidNumber(String),
    InvalidArgument(String),
    /// More words than the command takes.
    TrailingInput(String),
    /// Line exceeded the parser buffer and was discarded.
    LineTooLong,
    InvalidUtf8,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::UnknownCommand(word) => write!(f, "unknown command '{}'", word),
            ParseError::MissingArgument(what) => write!(f, "missing argument: {}", what),
            ParseError::InvalidNumber(word) => write!(f, "'{}' is not a number", word),
            ParseError::InvalidArgument(word) => write!(f, "invalid argument '{}'", word),
            ParseError::TrailingInput(rest) => write!(f, "unexpected input '{}'", rest),
            ParseError::LineTooLong => write!(f, "command line too long"),
            ParseError::InvalidUtf8 => write!(f, "command line is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseError {}
