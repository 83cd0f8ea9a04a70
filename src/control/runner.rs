// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Fixed-period control loop.

use std::ops::ControlFlow;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::control::test_machine::TestMachine;
use crate::hw::{AdcRead, GpioWrite, PwmWrite};

/// Timing of a finished loop.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LoopStats {
    pub ticks: u64,
    /// Ticks whose work took longer than the period.
    pub missed_deadlines: u64,
    pub total_tick: Duration,
    pub max_tick: Duration,
}

impl LoopStats {
    pub fn avg_tick(&self) -> Duration {
        if self.ticks == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos((self.total_tick.as_nanos() / self.ticks as u128) as u64)
        }
    }

    pub fn missed_rate(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.missed_deadlines as f64 / self.ticks as f64
        }
    }
}

/// Tick `machine` every `period` until it finishes or `hook` breaks.
///
/// `hook` runs after every tick. The machine is always shut down before this returns.
pub fn run<A, P, G, F>(machine: &mut TestMachine<A, P, G>, period: Duration, mut hook: F) -> LoopStats
where
    A: AdcRead,
    P: PwmWrite,
    G: GpioWrite,
    F: FnMut(&mut TestMachine<A, P, G>) -> ControlFlow<()>,
{
    let mut stats = LoopStats::default();
    let epoch = Instant::now();
    let mut deadline = epoch;

    loop {
        let started = Instant::now();
        let now_ms = started.duration_since(epoch).as_millis() as u64;

        machine.tick(now_ms);
        let flow = hook(machine);

        let spent = started.elapsed();
        stats.ticks += 1;
        stats.total_tick += spent;
        stats.max_tick = stats.max_tick.max(spent);
        if spent > period {
            stats.missed_deadlines += 1;
            warn!("tick {} took {:?}, period {:?}", stats.ticks, spent, period);
        }

        if machine.finished() || flow.is_break() {
            break;
        }

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            // Fell behind; restart the schedule instead of bursting ticks.
            deadline = now;
        }
    }

    machine.shutdown();
    info!(
        "control loop stopped after {} ticks, avg {:?}, max {:?}, {} missed deadlines",
        stats.ticks,
        stats.avg_tick(),
        stats.max_tick,
        stats.missed_deadlines
    );
    stats
}
