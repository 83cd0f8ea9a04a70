// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Log files written by the sink parse back into the same rows.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use footstand::control::{SubState, TestState};
use footstand::logging::{log_queue, DataLogger, LogEntry, LogEvent, LogPath, LogSink};
use footstand::SampleId;

fn scratch_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "footstand-{}-{}-{}",
        tag,
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn entry(sample: SampleId, n: u64) -> LogEntry {
    LogEntry {
        sample,
        data_count: n,
        lot: "L-2291".into(),
        serial: "SN07".into(),
        cycle: (n / 3) as u32,
        state: if n % 2 == 0 {
            TestState::DownStep
        } else {
            TestState::Hold
        },
        sub_state: if n % 3 == 0 {
            SubState::SensorContact
        } else {
            SubState::NoSensorContact
        },
        elapsed_ms: n * 12,
        step_ms: n * 12 % 500,
        desired_force: 40.0,
        measured_force: 39.871_234 + n as f32 * 0.1,
        heel: 0.125,
        toe: 1.0 / 3.0,
        base_force: -0.0421,
        psi: 41.7,
    }
}

fn read_back(path: &std::path::Path) -> Vec<LogEntry> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .unwrap();
    reader.deserialize().map(|row| row.unwrap()).collect()
}

#[test]
fn written_rows_parse_back_identical() {
    let dir = scratch_dir("roundtrip");
    let path = LogPath::new(dir.join("FTS_SAMPLE_A_test.log")).unwrap();
    let written: Vec<LogEntry> = (1..=20).map(|n| entry(SampleId::A, n)).collect();

    let mut sink = LogSink::new(&dir);
    sink.handle(LogEvent::Open {
        sample: SampleId::A,
        path: path.clone(),
    });
    for e in &written {
        sink.handle(LogEvent::Record(e.clone()));
    }
    sink.handle(LogEvent::Close {
        sample: SampleId::A,
    });

    assert_eq!(sink.stats().written, 20);
    assert_eq!(sink.stats().write_errors, 0);
    assert_eq!(read_back(path.as_path()), written);

    let header = fs::read_to_string(path.as_path()).unwrap();
    assert!(header.starts_with("sample,data_count,lot,serial,cycle,state,sub_state,"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn existing_file_gets_a_suffix() {
    let dir = scratch_dir("suffix");
    let requested = dir.join("FTS_SAMPLE_B_same.log");
    fs::write(&requested, "keep me").unwrap();

    let mut sink = LogSink::new(&dir);
    sink.handle(LogEvent::Open {
        sample: SampleId::B,
        path: LogPath::new(&requested).unwrap(),
    });
    sink.handle(LogEvent::Record(entry(SampleId::B, 1)));
    sink.close_all();

    assert_eq!(fs::read_to_string(&requested).unwrap(), "keep me");
    let suffixed = dir.join("FTS_SAMPLE_B_same_1.log");
    assert_eq!(read_back(&suffixed), vec![entry(SampleId::B, 1)]);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn record_without_open_creates_a_file() {
    let dir = scratch_dir("implicit");
    let mut sink = LogSink::new(&dir);
    sink.handle(LogEvent::Record(entry(SampleId::A, 1)));

    let path = sink.current_path(SampleId::A).unwrap().to_path_buf();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("FTS_SAMPLE_A_"));
    assert!(name.ends_with(".log"));

    sink.close_all();
    assert_eq!(read_back(&path), vec![entry(SampleId::A, 1)]);
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn writer_thread_drains_and_closes() {
    let dir = scratch_dir("thread");
    let (producer, consumer) = log_queue(256);
    let logger = DataLogger::spawn(consumer, LogSink::new(&dir), Duration::from_millis(2)).unwrap();

    let path = LogPath::new(dir.join("FTS_SAMPLE_A_thread.log")).unwrap();
    producer.push(LogEvent::Open {
        sample: SampleId::A,
        path: path.clone(),
    });
    for n in 1..=50 {
        producer.push(LogEvent::Record(entry(SampleId::A, n)));
    }

    let stats = logger.shutdown();
    assert_eq!(stats.written, 50);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.files, vec![path.as_path().to_path_buf()]);
    assert_eq!(read_back(path.as_path()).len(), 50);

    fs::remove_dir_all(&dir).ok();
}
