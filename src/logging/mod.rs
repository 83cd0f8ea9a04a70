// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Data Logging
//!
//! Per-sample CSV logs written off the control thread.
//!
//! - [`record`] - row schema and log file naming
//! - [`queue`] - bounded drop-oldest hand-off and the writer thread
//! - [`sink`] - file handling

pub mod queue;
pub mod record;
pub mod sink;

pub use queue::{log_queue, DataLogger, LogConsumer, LogEvent, LogProducer};
pub use record::{LogEntry, LogPath};
pub use sink::{LogSink, LogStats};
