// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! CSV log files, one per sample per run.
//!
//! The sink never reports errors to its caller. Every failure is logged as a warning and counted
//! in [`LogStats::write_errors`], and the event that caused it is discarded.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{info, warn};

use crate::constants::MAX_SAMPLE;
use crate::error::LogError;
use crate::logging::queue::LogEvent;
use crate::logging::record::{LogEntry, LogPath};
use crate::sample::SampleId;

/// Writer counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogStats {
    pub written: u64,
    pub write_errors: u64,
    /// Events evicted from the queue before reaching the writer.
    pub dropped: u64,
    /// Every file opened, in order.
    pub files: Vec<PathBuf>,
}

struct OpenLog {
    path: PathBuf,
    writer: csv::Writer<BufWriter<File>>,
}

pub struct LogSink {
    dir: PathBuf,
    logs: [Option<OpenLog>; MAX_SAMPLE],
    stats: LogStats,
}

impl LogSink {
    /// Files created without an explicit path go into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            logs: [None, None],
            stats: LogStats::default(),
        }
    }

    pub fn handle(&mut self, event: LogEvent) {
        let result = match event {
            LogEvent::Open { sample, path } => self.open(sample, path.as_path()),
            LogEvent::Record(entry) => self.record(&entry),
            LogEvent::Close { sample } => self.close(sample),
        };
        if let Err(e) = result {
            warn!("{}", e);
            self.stats.write_errors += 1;
        }
    }

    fn open(&mut self, sample: SampleId, requested: &Path) -> Result<(), LogError> {
        self.close(sample)?;

        if let Some(parent) = requested.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let (path, file) = create_unique(requested)?;
        info!("sample {} logging to {}", sample, path.display());

        self.stats.files.push(path.clone());
        self.logs[sample.index()] = Some(OpenLog {
            path,
            writer: csv::Writer::from_writer(BufWriter::new(file)),
        });
        Ok(())
    }

    fn record(&mut self, entry: &LogEntry) -> Result<(), LogError> {
        if self.logs[entry.sample.index()].is_none() {
            let path = LogPath::for_sample(&self.dir, entry.sample, Local::now())?;
            self.open(entry.sample, path.as_path())?;
        }
        if let Some(log) = self.logs[entry.sample.index()].as_mut() {
            log.writer.serialize(entry)?;
            self.stats.written += 1;
        }
        Ok(())
    }

    fn close(&mut self, sample: SampleId) -> Result<(), LogError> {
        if let Some(mut log) = self.logs[sample.index()].take() {
            log.writer.flush()?;
            info!("closed {}", log.path.display());
        }
        Ok(())
    }

    /// Flush every open file.
    pub fn flush(&mut self) {
        let mut failures = 0;
        for log in self.logs.iter_mut().flatten() {
            if let Err(e) = log.writer.flush() {
                warn!("flushing {}: {}", log.path.display(), e);
                failures += 1;
            }
        }
        self.stats.write_errors += failures;
    }

    pub fn close_all(&mut self) {
        for sample in SampleId::ALL {
            if let Err(e) = self.close(sample) {
                warn!("{}", e);
                self.stats.write_errors += 1;
            }
        }
    }

    /// Path of the file currently open for `sample`.
    pub fn current_path(&self, sample: SampleId) -> Option<&Path> {
        self.logs[sample.index()].as_ref().map(|log| log.path.as_path())
    }

    pub fn stats(&self) -> &LogStats {
        &self.stats
    }
}

/// Create `path`, or `<stem>_<n>.<ext>` if it already exists.
fn create_unique(path: &Path) -> io::Result<(PathBuf, File)> {
    let mut candidate = path.to_path_buf();
    let mut n = 0u32;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && n < 1000 => {
                n += 1;
                candidate = suffixed(path, n);
            }
            Err(e) => return Err(e),
        }
    }
}

fn suffixed(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(
            suffixed(Path::new("/tmp/FTS_SAMPLE_A_x.log"), 2),
            PathBuf::from("/tmp/FTS_SAMPLE_A_x_2.log")
        );
        assert_eq!(suffixed(Path::new("plain"), 1), PathBuf::from("plain_1"));
    }
}
