// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Foot test procedure.
//!
//! [`TestMachine`] owns everything a run needs: the sensor reader, the actuator driver, one PID
//! controller and contact detector per sample, the command slot and the log producer. The
//! control loop calls [`TestMachine::tick`] once per period with a millisecond timestamp; nothing
//! in here reads a clock.
//!
//! Each tick:
//! 1. take at most one operator directive
//! 2. read and validate the sensors of every active sample
//! 3. update the contact sub-states
//! 4. evaluate the transition table and run the entry / exit actions
//! 5. run the force controllers and command the regulators
//! 6. hand log rows to the data logger once per log period
//!
//! Operator `quit` / `reset`, sensor faults and hardware faults bypass the transition table and
//! end the tick immediately, with the regulator already off.

use chrono::Local;
use log::{debug, error, info, warn};

use crate::config::{RigConfig, TestDefaults};
use crate::constants::MAX_SAMPLE;
use crate::control::contact::ContactDetector;
use crate::control::pid::Pid;
use crate::control::state::{next_state, QuitReason, SubState, TestState, TransitionInputs};
use crate::drivers::actuator::{ActuatorDriver, Valve};
use crate::drivers::sensor_reader::{Reading, SensorReader};
use crate::error::{HwError, SensorError};
use crate::hw::{AdcRead, GpioWrite, PwmWrite};
use crate::logging::{LogEntry, LogEvent, LogPath, LogProducer};
use crate::protocol::{CommandSlot, Directive};
use crate::sample::SampleId;

/// Parameters and bookkeeping of the current run.
#[derive(Debug, Clone, PartialEq)]
pub struct TestParameters {
    pub desired_force: f32,
    pub up_step_ms: u32,
    pub down_step_ms: u32,
    pub hold_ms: u32,
    pub cycles: u32,
    /// Samples requested by the operator; latched into `active_samples` at init.
    pub num_samples: u8,
    /// Requested turn-plate setting; latched into `turn_active` at init.
    pub turn_plates: bool,
    pub active_samples: u8,
    pub turn_active: bool,

    pub current_state: TestState,
    pub next_state: TestState,
    /// A directive was taken during the current tick.
    pub pending_command: bool,

    pub start_ms: u64,
    pub current_ms: u64,
    /// Time since `start_ms`.
    pub elapsed_ms: u64,
    /// When the current state was entered.
    pub step_ms: u64,
    /// Last time log rows were queued.
    pub log_ms: u64,

    /// Completed cycles.
    pub cycle: u32,
    pub active: bool,
    pub stop_requested: bool,
    pub quit_reason: Option<QuitReason>,
}

impl TestParameters {
    pub fn from_defaults(defaults: &TestDefaults) -> Self {
        Self {
            desired_force: defaults.desired_force,
            up_step_ms: defaults.up_step_ms,
            down_step_ms: defaults.down_step_ms,
            hold_ms: defaults.hold_ms,
            cycles: defaults.cycles,
            num_samples: defaults.num_samples,
            turn_plates: defaults.turn_plates,
            active_samples: defaults.num_samples,
            turn_active: defaults.turn_plates,
            current_state: TestState::Init,
            next_state: TestState::Init,
            pending_command: false,
            start_ms: 0,
            current_ms: 0,
            elapsed_ms: 0,
            step_ms: 0,
            log_ms: 0,
            cycle: 0,
            active: false,
            stop_requested: false,
            quit_reason: None,
        }
    }

    /// Time spent in the current state.
    #[inline]
    pub fn time_in_state(&self) -> u64 {
        self.current_ms.saturating_sub(self.step_ms)
    }

    pub fn samples(&self) -> &'static [SampleId] {
        SampleId::first(self.active_samples)
    }
}

/// Per-sample measurements and log bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub sample: SampleId,
    pub data_count: u64,
    pub lot: String,
    pub serial: String,
    pub desired_force: f32,
    /// Load cell force with the baseline removed.
    pub measured_force: f32,
    pub heel: f32,
    pub toe: f32,
    pub base_force: f32,
    pub current_sub_state: SubState,
    pub next_sub_state: SubState,
    pub log_created: bool,
    pub log_path: Option<LogPath>,
    /// Consecutive rejected readings.
    pub invalid_reads: u8,
    pub last_good: Reading,
    /// Regulator pressure commanded on the last tick.
    pub psi: f32,
}

impl SampleRecord {
    pub fn new(sample: SampleId) -> Self {
        Self {
            sample,
            data_count: 0,
            lot: String::new(),
            serial: String::new(),
            desired_force: 0.0,
            measured_force: 0.0,
            heel: 0.0,
            toe: 0.0,
            base_force: 0.0,
            current_sub_state: SubState::NoSensorContact,
            next_sub_state: SubState::NoSensorContact,
            log_created: false,
            log_path: None,
            invalid_reads: 0,
            last_good: Reading::default(),
            psi: 0.0,
        }
    }

    /// Clear the run fields. Lot and serial survive.
    fn clear_run(&mut self) {
        let lot = std::mem::take(&mut self.lot);
        let serial = std::mem::take(&mut self.serial);
        *self = Self {
            lot,
            serial,
            ..Self::new(self.sample)
        };
    }

    fn contact(&self) -> f32 {
        self.toe.max(self.heel)
    }
}

pub struct TestMachine<A, P, G> {
    config: RigConfig,
    params: TestParameters,
    samples: [SampleRecord; MAX_SAMPLE],
    pids: [Pid; MAX_SAMPLE],
    contact: [ContactDetector; MAX_SAMPLE],
    sensors: SensorReader<A>,
    actuator: ActuatorDriver<P, G>,
    commands: CommandSlot,
    log: LogProducer,
    last_tick_ms: Option<u64>,
}

impl<A, P, G> TestMachine<A, P, G>
where
    A: AdcRead,
    P: PwmWrite,
    G: GpioWrite,
{
    /// Build the machine and put the outputs in a safe state: regulators at zero, valves closed.
    ///
    /// No run is active until [`init_test`](Self::init_test) or a `start` directive.
    pub fn new(
        config: RigConfig,
        adc: A,
        pwm: P,
        gpio: G,
        commands: CommandSlot,
        log: LogProducer,
    ) -> Result<Self, HwError> {
        let sensors = SensorReader::new(
            adc,
            config.calibration.clone(),
            config.pins.clone(),
            config.control.adc_buffer_size,
        );
        let mut actuator =
            ActuatorDriver::new(pwm, gpio, config.pins.clone(), config.regulator.clone());
        actuator.init_regulator()?;
        actuator.init_valves()?;

        let pid = Pid::from_config(&config.control);
        let detector = ContactDetector::from_config(&config.control);

        Ok(Self {
            params: TestParameters::from_defaults(&config.defaults),
            samples: [SampleRecord::new(SampleId::A), SampleRecord::new(SampleId::B)],
            pids: [pid.clone(), pid],
            contact: [detector.clone(), detector],
            sensors,
            actuator,
            commands,
            log,
            last_tick_ms: None,
            config,
        })
    }

    /// Start a new run at `now_ms`.
    pub fn init_test(&mut self, now_ms: u64) {
        self.close_logs();

        let p = &mut self.params;
        p.active_samples = p.num_samples;
        p.turn_active = p.turn_plates;
        p.current_state = TestState::Init;
        p.next_state = TestState::DownStep;
        p.start_ms = now_ms;
        p.current_ms = now_ms;
        p.elapsed_ms = 0;
        p.step_ms = now_ms;
        p.log_ms = now_ms;
        p.cycle = 0;
        p.stop_requested = false;
        p.quit_reason = None;
        p.active = true;

        for idx in 0..MAX_SAMPLE {
            self.samples[idx].clear_run();
            self.pids[idx].reset();
            self.contact[idx].reset();
        }

        for &sample in self.params.samples() {
            match self.sensors.read(sample) {
                Ok(reading) => {
                    let rec = &mut self.samples[sample.index()];
                    rec.base_force = reading.force;
                    rec.last_good = Reading {
                        force: 0.0,
                        ..reading
                    };
                }
                Err(e) => warn!("sample {}: no baseline, using 0: {}", sample, e),
            }
        }

        let valves = self
            .actuator
            .init_valves()
            .and_then(|_| self.actuator.open_valve(Valve::Vertical).map(|_| ()));
        if let Err(e) = valves {
            self.abort(QuitReason::HardwareFault, &e.to_string());
            return;
        }

        info!(
            "test started: force {} up {} ms down {} ms hold {} ms, {} cycles, {} sample(s), turn plates {}",
            self.params.desired_force,
            self.params.up_step_ms,
            self.params.down_step_ms,
            self.params.hold_ms,
            self.params.cycles,
            self.params.active_samples,
            if self.params.turn_active { "on" } else { "off" }
        );
    }

    /// End the run: regulators off, valves closed, log files closed, controllers reset.
    pub fn clean_test(&mut self) {
        if let Err(e) = self.actuator.turn_off_pressure_reg() {
            error!("could not turn off pressure regulator: {}", e);
        }
        if let Err(e) = self.actuator.init_valves() {
            error!("could not close valves: {}", e);
        }
        for rec in self.samples.iter_mut() {
            rec.psi = 0.0;
        }
        self.close_logs();
        for idx in 0..MAX_SAMPLE {
            self.pids[idx].reset();
            self.contact[idx].reset();
        }
        self.params.active = false;
    }

    /// Put the outputs in a safe state before the process exits.
    pub fn shutdown(&mut self) {
        if self.params.active {
            info!("shutting down an active test");
            self.params.quit_reason.get_or_insert(QuitReason::OperatorAbort);
            self.params.current_state = TestState::Quit;
            self.params.next_state = TestState::Quit;
        }
        self.clean_test();
    }

    /// Advance the machine by one control period.
    pub fn tick(&mut self, now_ms: u64) {
        let dt = self.tick_dt(now_ms);
        self.params.current_ms = now_ms;
        self.params.pending_command = false;

        if let Some(directive) = self.commands.take() {
            self.params.pending_command = true;
            if self.apply(directive, now_ms) {
                return;
            }
        }

        if !self.params.active {
            self.hold_regulator_off();
            return;
        }
        self.params.elapsed_ms = now_ms.saturating_sub(self.params.start_ms);

        for &sample in self.params.samples() {
            if let Err(e) = self.update_sensors(sample) {
                self.abort(
                    QuitReason::SensorFault,
                    &format!("sample {}: {}", sample, e),
                );
                return;
            }
        }

        let mut contact_rising = false;
        for &sample in self.params.samples() {
            let idx = sample.index();
            let rec = &mut self.samples[idx];
            let previous = rec.current_sub_state;
            rec.next_sub_state = self.contact[idx].update(rec.contact());
            if previous == SubState::NoSensorContact && rec.next_sub_state == SubState::SensorContact
            {
                debug!("sample {} contact", sample);
                contact_rising = true;
            }
            rec.current_sub_state = rec.next_sub_state;
        }

        let current = self.params.current_state;
        let inputs = TransitionInputs {
            elapsed_ms: self.params.time_in_state(),
            down_step_ms: self.params.down_step_ms,
            up_step_ms: self.params.up_step_ms,
            hold_ms: self.params.hold_ms,
            cycle: self.params.cycle,
            cycles: self.params.cycles,
            contact_rising,
            stop_requested: self.params.stop_requested,
        };
        let (next, reason) = next_state(current, &inputs);
        self.params.next_state = next;
        if next != current {
            if let Err(e) = self.enter(next, reason, now_ms) {
                self.abort(QuitReason::HardwareFault, &e.to_string());
                return;
            }
            if !self.params.active {
                return;
            }
        }

        let state = self.params.current_state;
        for &sample in self.params.samples() {
            let idx = sample.index();
            let target = state.target_force(self.params.desired_force);
            let rec = &mut self.samples[idx];
            rec.desired_force = target;
            let command = self.pids[idx].update(target, rec.measured_force, dt);
            match self.actuator.set_des_force(sample, command) {
                Ok(psi) => self.samples[idx].psi = psi,
                Err(e) => {
                    self.abort(
                        QuitReason::HardwareFault,
                        &format!("regulator {}: {}", sample, e),
                    );
                    return;
                }
            }
        }

        if now_ms.saturating_sub(self.params.log_ms) >= self.config.logging.period_ms as u64 {
            self.params.log_ms = now_ms;
            for &sample in self.params.samples() {
                self.log_sample(sample);
            }
        }
    }

    fn tick_dt(&mut self, now_ms: u64) -> f32 {
        let nominal = self.config.control.tick_ms as f32 / 1000.0;
        let dt = match self.last_tick_ms {
            Some(last) if now_ms > last => (now_ms - last) as f32 / 1000.0,
            _ => nominal,
        };
        self.last_tick_ms = Some(now_ms);
        dt
    }

    /// Apply an operator directive. Returns `true` if the rest of the tick must be skipped.
    fn apply(&mut self, directive: Directive, now_ms: u64) -> bool {
        info!("directive {:?}", directive);
        let p = &mut self.params;
        match directive {
            Directive::Start => {
                if p.active {
                    warn!("restarting test in {}", p.current_state);
                }
                self.init_test(now_ms);
                return true;
            }
            Directive::Stop => {
                if p.active {
                    p.stop_requested = true;
                } else {
                    warn!("stop ignored: no test running");
                }
            }
            Directive::Quit => {
                if p.current_state != TestState::Quit || p.active {
                    self.abort(QuitReason::OperatorAbort, "operator quit");
                    return true;
                }
            }
            Directive::Reset => {
                if !p.active {
                    warn!("reset ignored: no test running, use start");
                    return false;
                }
                self.force_reset(now_ms);
                return true;
            }
            Directive::SetForce(force) => p.desired_force = force,
            Directive::SetSteps { up_ms, down_ms } => {
                p.up_step_ms = up_ms;
                p.down_step_ms = down_ms;
            }
            Directive::SetHold(ms) => p.hold_ms = ms,
            Directive::SetCycles(n) => p.cycles = n,
            Directive::SetSamples(n) => p.num_samples = n,
            Directive::SetTurnPlates(on) => p.turn_plates = on,
            Directive::SetLot {
                sample,
                lot,
                serial,
            } => {
                let rec = &mut self.samples[sample.index()];
                rec.lot = lot;
                rec.serial = serial;
            }
        }
        false
    }

    fn force_reset(&mut self, now_ms: u64) {
        info!("{} -> {} (operator)", self.params.current_state, TestState::Reset);
        if let Err(e) = self.actuator.turn_off_pressure_reg() {
            self.abort(QuitReason::HardwareFault, &e.to_string());
            return;
        }
        if let Err(e) = self.close_turn_valves() {
            self.abort(QuitReason::HardwareFault, &e.to_string());
            return;
        }
        for idx in 0..MAX_SAMPLE {
            self.pids[idx].reset();
            self.samples[idx].psi = 0.0;
        }
        self.params.current_state = TestState::Reset;
        self.params.next_state = TestState::Reset;
        self.params.step_ms = now_ms;
    }

    /// Leave the current state for `next` and run the entry actions.
    fn enter(
        &mut self,
        next: TestState,
        reason: Option<QuitReason>,
        now_ms: u64,
    ) -> Result<(), HwError> {
        let previous = self.params.current_state;
        if previous == TestState::Hold {
            self.close_turn_valves()?;
            self.params.cycle += 1;
        }

        info!(
            "{} -> {} at {} ms (cycle {})",
            previous, next, self.params.elapsed_ms, self.params.cycle
        );
        self.params.current_state = next;
        self.params.step_ms = now_ms;

        match next {
            TestState::DownStep => {
                self.actuator.open_valve(Valve::Vertical)?;
            }
            TestState::UpStep => {
                self.actuator.close_valve(Valve::Vertical)?;
            }
            TestState::Hold => {
                if self.params.turn_active {
                    for &sample in self.params.samples() {
                        self.actuator.open_valve(Valve::turn(sample))?;
                    }
                }
            }
            TestState::Quit => {
                self.params.quit_reason = reason;
                info!(
                    "test finished: {}",
                    reason.map(|r| r.to_string()).unwrap_or_default()
                );
                self.clean_test();
            }
            TestState::Init => self.init_test(now_ms),
            TestState::Reset => {}
        }
        Ok(())
    }

    /// Force `Quit` with regulators off in the current tick.
    fn abort(&mut self, reason: QuitReason, why: &str) {
        if reason.is_fault() {
            error!("aborting test: {} ({})", reason, why);
        } else {
            info!("aborting test: {} ({})", reason, why);
        }
        let p = &mut self.params;
        p.quit_reason = Some(reason);
        p.current_state = TestState::Quit;
        p.next_state = TestState::Quit;
        p.step_ms = p.current_ms;
        self.clean_test();
    }

    /// Read one sample, substituting the last good reading on failure.
    ///
    /// Returns an error once `max_invalid_reads` consecutive readings were rejected.
    fn update_sensors(&mut self, sample: SampleId) -> Result<(), SensorError> {
        let tolerance = self.config.control.negative_force_tolerance;
        let limit = self.config.control.max_invalid_reads;
        let rec = &mut self.samples[sample.index()];

        let result = self.sensors.read(sample).and_then(|reading| {
            let zeroed = reading.force - rec.base_force;
            if !zeroed.is_finite() || zeroed < -tolerance {
                return Err(SensorError::OutOfRange { value: zeroed });
            }
            Ok(Reading {
                force: zeroed,
                ..reading
            })
        });

        let reading = match result {
            Ok(reading) => {
                rec.invalid_reads = 0;
                rec.last_good = reading;
                reading
            }
            Err(e) => {
                rec.invalid_reads = rec.invalid_reads.saturating_add(1);
                warn!(
                    "sample {}: invalid reading {}/{}: {}",
                    sample, rec.invalid_reads, limit, e
                );
                if rec.invalid_reads >= limit {
                    return Err(e);
                }
                rec.last_good
            }
        };

        rec.measured_force = reading.force;
        rec.heel = reading.heel;
        rec.toe = reading.toe;
        Ok(())
    }

    fn log_sample(&mut self, sample: SampleId) {
        let rec = &mut self.samples[sample.index()];
        if !rec.log_created {
            match LogPath::for_sample(&self.config.logging.dir, sample, Local::now()) {
                Ok(path) => {
                    rec.log_path = Some(path.clone());
                    self.log.push(LogEvent::Open { sample, path });
                }
                Err(e) => warn!("sample {}: {}", sample, e),
            }
            rec.log_created = true;
        }

        rec.data_count += 1;
        let entry = LogEntry {
            sample,
            data_count: rec.data_count,
            lot: rec.lot.clone(),
            serial: rec.serial.clone(),
            cycle: self.params.cycle,
            state: self.params.current_state,
            sub_state: rec.current_sub_state,
            elapsed_ms: self.params.elapsed_ms,
            step_ms: self.params.time_in_state(),
            desired_force: rec.desired_force,
            measured_force: rec.measured_force,
            heel: rec.heel,
            toe: rec.toe,
            base_force: rec.base_force,
            psi: rec.psi,
        };
        if !self.log.push(LogEvent::Record(entry)) {
            debug!("log queue full, oldest event dropped");
        }
    }

    fn close_logs(&mut self) {
        for rec in self.samples.iter_mut() {
            if rec.log_created {
                self.log.push(LogEvent::Close { sample: rec.sample });
                rec.log_created = false;
            }
        }
    }

    fn close_turn_valves(&mut self) -> Result<(), HwError> {
        self.actuator.close_valve(Valve::TurnA)?;
        self.actuator.close_valve(Valve::TurnB)?;
        Ok(())
    }

    fn hold_regulator_off(&mut self) {
        let on = SampleId::ALL
            .iter()
            .any(|&s| self.actuator.psi(s) != 0.0);
        if on {
            if let Err(e) = self.actuator.turn_off_pressure_reg() {
                error!("could not turn off pressure regulator: {}", e);
            }
        }
    }

    pub fn params(&self) -> &TestParameters {
        &self.params
    }

    pub fn sample(&self, sample: SampleId) -> &SampleRecord {
        &self.samples[sample.index()]
    }

    pub fn state(&self) -> TestState {
        self.params.current_state
    }

    pub fn quit_reason(&self) -> Option<QuitReason> {
        self.params.quit_reason
    }

    /// The run ended and the outputs are safe.
    pub fn finished(&self) -> bool {
        self.params.current_state == TestState::Quit && !self.params.active
    }

    pub fn actuator(&self) -> &ActuatorDriver<P, G> {
        &self.actuator
    }

    pub fn pid(&self, sample: SampleId) -> &Pid {
        &self.pids[sample.index()]
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }
}
