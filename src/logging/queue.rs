// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Hand-off from the control loop to the log writer thread.
//!
//! The control loop only ever calls [`LogProducer::push`], which never blocks: when the queue is
//! full the oldest event is evicted and counted. The writer thread drains the queue once per log
//! period and flushes the files after each drain.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::queue::ArrayQueue;
use log::{debug, info, warn};

use crate::logging::record::{LogEntry, LogPath};
use crate::logging::sink::{LogSink, LogStats};
use crate::sample::SampleId;

/// What the control loop sends to the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    Open { sample: SampleId, path: LogPath },
    Record(LogEntry),
    Close { sample: SampleId },
}

struct Shared {
    queue: ArrayQueue<LogEvent>,
    dropped: AtomicU64,
}

/// Create a bounded log queue.
pub fn log_queue(capacity: usize) -> (LogProducer, LogConsumer) {
    let shared = Arc::new(Shared {
        queue: ArrayQueue::new(capacity.max(1)),
        dropped: AtomicU64::new(0),
    });
    (
        LogProducer {
            shared: shared.clone(),
        },
        LogConsumer { shared },
    )
}

/// Control loop side.
#[derive(Clone)]
pub struct LogProducer {
    shared: Arc<Shared>,
}

impl LogProducer {
    /// Queue an event. Returns `false` if an older event had to be evicted.
    pub fn push(&self, event: LogEvent) -> bool {
        match self.shared.queue.force_push(event) {
            None => true,
            Some(_) => {
                self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Events evicted so far.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.queue.is_empty()
    }
}

/// Writer side.
pub struct LogConsumer {
    shared: Arc<Shared>,
}

impl LogConsumer {
    pub fn pop(&self) -> Option<LogEvent> {
        self.shared.queue.pop()
    }

    /// Hand every queued event to `sink` and flush. Returns the number of events drained.
    pub fn drain_into(&self, sink: &mut LogSink) -> usize {
        let mut n = 0;
        while let Some(event) = self.pop() {
            sink.handle(event);
            n += 1;
        }
        if n > 0 {
            sink.flush();
        }
        n
    }

    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

/// Background log writer.
pub struct DataLogger {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<LogStats>>,
}

impl DataLogger {
    /// Start the writer thread. It drains `consumer` into `sink` every `period`.
    pub fn spawn(consumer: LogConsumer, mut sink: LogSink, period: Duration) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        let handle = thread::Builder::new()
            .name("data-logger".into())
            .spawn(move || {
                debug!("data logger started, period {:?}", period);
                while flag.load(Ordering::Acquire) {
                    consumer.drain_into(&mut sink);
                    thread::sleep(period);
                }
                consumer.drain_into(&mut sink);
                sink.close_all();

                let mut stats = sink.stats().clone();
                stats.dropped = consumer.dropped();
                stats
            })?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the writer after a final drain and return its counters.
    pub fn shutdown(mut self) -> LogStats {
        self.stop()
    }

    fn stop(&mut self) -> LogStats {
        self.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return LogStats::default();
        };
        match handle.join() {
            Ok(stats) => {
                info!(
                    "data logger stopped: {} rows, {} dropped, {} write errors",
                    stats.written, stats.dropped, stats.write_errors
                );
                stats
            }
            Err(_) => {
                warn!("data logger thread panicked");
                LogStats::default()
            }
        }
    }
}

impl Drop for DataLogger {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_drops_oldest() {
        let (producer, consumer) = log_queue(2);
        assert!(producer.push(LogEvent::Close { sample: SampleId::A }));
        assert!(producer.push(LogEvent::Close { sample: SampleId::B }));
        assert!(!producer.push(LogEvent::Close { sample: SampleId::A }));
        assert_eq!(producer.dropped(), 1);

        // The first event was evicted.
        assert_eq!(consumer.pop(), Some(LogEvent::Close { sample: SampleId::B }));
        assert_eq!(consumer.pop(), Some(LogEvent::Close { sample: SampleId::A }));
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn producer_clones_share_queue() {
        let (producer, consumer) = log_queue(8);
        let other = producer.clone();
        other.push(LogEvent::Close { sample: SampleId::B });
        assert_eq!(producer.len(), 1);
        assert!(consumer.pop().is_some());
        assert!(producer.is_empty());
    }
}
