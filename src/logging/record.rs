// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Log row schema and log file naming.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::constants::LOGNAME_SIZE;
use crate::control::state::{SubState, TestState};
use crate::error::LogError;
use crate::sample::SampleId;

/// One CSV row of a sample log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sample: SampleId,
    pub data_count: u64,
    pub lot: String,
    pub serial: String,
    pub cycle: u32,
    pub state: TestState,
    pub sub_state: SubState,
    /// Time since the test started.
    pub elapsed_ms: u64,
    /// Time since the current state was entered.
    pub step_ms: u64,
    pub desired_force: f32,
    pub measured_force: f32,
    pub heel: f32,
    pub toe: f32,
    pub base_force: f32,
    pub psi: f32,
}

/// Log file path, at most [`LOGNAME_SIZE`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPath(PathBuf);

impl LogPath {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, LogError> {
        let path = path.into();
        let len = path.as_os_str().len();
        if len == 0 || len > LOGNAME_SIZE {
            return Err(LogError::NameTooLong(len));
        }
        Ok(Self(path))
    }

    /// `<dir>/FTS_SAMPLE_<A|B>_<YYYY-mm-dd>_<HHMMSS>.log`
    pub fn for_sample(dir: &Path, sample: SampleId, at: DateTime<Local>) -> Result<Self, LogError> {
        let name = format!(
            "FTS_SAMPLE_{}_{}.log",
            sample.letter(),
            at.format("%Y-%m-%d_%H%M%S")
        );
        Self::new(dir.join(name))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for LogPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_follows_stand_convention() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        let path = LogPath::for_sample(Path::new("../log"), SampleId::B, at).unwrap();
        assert_eq!(
            path.as_path(),
            Path::new("../log/FTS_SAMPLE_B_2024-03-09_070502.log")
        );
    }

    #[test]
    fn overlong_path_is_rejected() {
        let dir = "d".repeat(LOGNAME_SIZE);
        let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            LogPath::for_sample(Path::new(&dir), SampleId::A, at),
            Err(LogError::NameTooLong(_))
        ));
        assert!(LogPath::new("x".repeat(LOGNAME_SIZE)).is_ok());
        assert!(LogPath::new("").is_err());
    }
}
