// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pressure regulator and solenoid valve driver.
//!
//! The regulator takes 0-10 V for 0-120 psi. The PWM pin is filtered and amplified by the output
//! stage, so the duty cycle for a pressure is
//!
//! ```text
//! psi   = clamp(command * gain, MIN_PSI, MAX_PSI)
//! v_reg = psi / MAX_PSI * 10 V
//! v_pwm = v_reg / PWM_GAIN
//! duty  = clamp(v_pwm / 3.3 V, 0, 1)
//! ```
//!
//! Valve writes are idempotent: the driver tracks the last state it drove and skips the GPIO
//! write when nothing changes. [`ActuatorDriver::init_valves`] is the exception and always
//! writes, since the pins are in an unknown state at startup.

use log::{debug, warn};

use crate::config::{PinMap, RegulatorConfig};
use crate::constants::MAX_SAMPLE;
use crate::error::HwError;
use crate::hw::{GpioWrite, PwmWrite};
use crate::sample::SampleId;

/// Solenoid valves on the stand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Valve {
    /// Raises and lowers the foot.
    Vertical,
    TurnA,
    TurnB,
}

impl Valve {
    pub const ALL: [Valve; 3] = [Valve::Vertical, Valve::TurnA, Valve::TurnB];

    pub fn turn(sample: SampleId) -> Self {
        match sample {
            SampleId::A => Valve::TurnA,
            SampleId::B => Valve::TurnB,
        }
    }

    fn index(self) -> usize {
        match self {
            Valve::Vertical => 0,
            Valve::TurnA => 1,
            Valve::TurnB => 2,
        }
    }
}

/// Regulator pressure and PWM duty for a controller command.
pub fn command_to_duty(reg: &RegulatorConfig, command: f32) -> (f32, f32) {
    let psi = if command.is_nan() {
        reg.min_psi
    } else {
        (command * reg.command_gain).clamp(reg.min_psi, reg.max_psi)
    };
    let v_reg = psi / reg.max_psi * reg.max_v_input;
    let v_pwm = v_reg / reg.pwm_gain;
    let duty = (v_pwm / reg.v_out_max).clamp(0.0, 1.0);
    (psi, duty)
}

pub struct ActuatorDriver<P, G> {
    pwm: P,
    gpio: G,
    pins: PinMap,
    regulator: RegulatorConfig,
    /// Last state driven per valve, `None` before `init_valves`.
    valves: [Option<bool>; 3],
    psi: [f32; MAX_SAMPLE],
    duty: [f32; MAX_SAMPLE],
}

impl<P: PwmWrite, G: GpioWrite> ActuatorDriver<P, G> {
    pub fn new(pwm: P, gpio: G, pins: PinMap, regulator: RegulatorConfig) -> Self {
        Self {
            pwm,
            gpio,
            pins,
            regulator,
            valves: [None; 3],
            psi: [0.0; MAX_SAMPLE],
            duty: [0.0; MAX_SAMPLE],
        }
    }

    /// Drive every valve closed regardless of the tracked state.
    pub fn init_valves(&mut self) -> Result<(), HwError> {
        for valve in Valve::ALL {
            self.write_valve(valve, false)?;
        }
        Ok(())
    }

    /// Set the regulator carrier frequency and zero the output.
    pub fn init_regulator(&mut self) -> Result<(), HwError> {
        for ch in self.pins.regulator {
            self.pwm.set_frequency(ch, self.regulator.pwm_hz)?;
            self.pwm.set_duty(ch, 0.0)?;
        }
        self.psi = [0.0; MAX_SAMPLE];
        self.duty = [0.0; MAX_SAMPLE];
        Ok(())
    }

    /// Command the regulator of one sample. Returns the pressure requested.
    pub fn set_des_force(&mut self, sample: SampleId, command: f32) -> Result<f32, HwError> {
        let (psi, duty) = command_to_duty(&self.regulator, command);
        let idx = sample.index();
        self.pwm.set_duty(self.pins.regulator[idx], duty)?;
        self.psi[idx] = psi;
        self.duty[idx] = duty;
        Ok(psi)
    }

    /// Open a valve. Returns whether a GPIO write happened.
    pub fn open_valve(&mut self, valve: Valve) -> Result<bool, HwError> {
        self.set_valve(valve, true)
    }

    /// Close a valve. Returns whether a GPIO write happened.
    pub fn close_valve(&mut self, valve: Valve) -> Result<bool, HwError> {
        self.set_valve(valve, false)
    }

    fn set_valve(&mut self, valve: Valve, open: bool) -> Result<bool, HwError> {
        if self.valves[valve.index()] == Some(open) {
            return Ok(false);
        }
        self.write_valve(valve, open)?;
        Ok(true)
    }

    fn write_valve(&mut self, valve: Valve, open: bool) -> Result<(), HwError> {
        let pin = self.valve_pin(valve);
        let level = self.pins.valve_active.level_for(open);
        self.gpio.write_pin(pin, level)?;
        self.valves[valve.index()] = Some(open);
        debug!("valve {:?} {}", valve, if open { "open" } else { "closed" });
        Ok(())
    }

    fn valve_pin(&self, valve: Valve) -> u8 {
        match valve {
            Valve::Vertical => self.pins.vertical_valve,
            Valve::TurnA => self.pins.turn_valve[0],
            Valve::TurnB => self.pins.turn_valve[1],
        }
    }

    /// Zero every regulator channel.
    ///
    /// Attempts every channel even if one fails, then reports the first failure.
    pub fn turn_off_pressure_reg(&mut self) -> Result<(), HwError> {
        let mut result = Ok(());
        for (idx, ch) in self.pins.regulator.into_iter().enumerate() {
            match self.pwm.set_duty(ch, 0.0) {
                Ok(()) => {
                    self.psi[idx] = 0.0;
                    self.duty[idx] = 0.0;
                }
                Err(e) => {
                    warn!("failed to zero regulator channel {}: {}", ch, e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
        }
        result
    }

    pub fn valve_open(&self, valve: Valve) -> bool {
        self.valves[valve.index()] == Some(true)
    }

    /// Pressure last requested for a sample [psi].
    pub fn psi(&self, sample: SampleId) -> f32 {
        self.psi[sample.index()]
    }

    pub fn duty(&self, sample: SampleId) -> f32 {
        self.duty[sample.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;
    use crate::hw::sim::{SimGpio, SimPwm};
    use crate::hw::SimRig;

    fn driver(rig: &SimRig) -> ActuatorDriver<SimPwm, SimGpio> {
        let config = RigConfig::default();
        ActuatorDriver::new(rig.pwm(), rig.gpio(), config.pins, config.regulator)
    }

    #[test]
    fn forty_psi_duty() {
        let reg = RegulatorConfig::default();
        let (psi, duty) = command_to_duty(&reg, 40.0);
        assert_eq!(psi, 40.0);
        assert!((duty - 40.0 / 120.0 * 10.0 / 3.0 / 3.3).abs() < 1e-6);
    }

    #[test]
    fn commands_are_clamped_to_regulator_range() {
        let reg = RegulatorConfig::default();
        for command in [-1.0e6, -3.0, 0.0, 2.9, 500.0, f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            let (psi, duty) = command_to_duty(&reg, command);
            assert!(psi >= reg.min_psi && psi <= reg.max_psi, "{} -> {}", command, psi);
            assert!((0.0..=1.0).contains(&duty));
        }
        assert_eq!(command_to_duty(&reg, f32::NAN).0, reg.min_psi);
        assert_eq!(command_to_duty(&reg, 1000.0).0, reg.max_psi);
    }

    #[test]
    fn set_des_force_writes_regulator_channel() {
        let rig = SimRig::new();
        let mut act = driver(&rig);
        let psi = act.set_des_force(SampleId::B, 60.0).unwrap();
        assert_eq!(psi, 60.0);
        assert!((rig.duty(1) - act.duty(SampleId::B)).abs() < 1e-6);
        assert_eq!(rig.duty(0), 0.0);
    }

    #[test]
    fn valve_writes_are_idempotent() {
        let rig = SimRig::new();
        let mut act = driver(&rig);
        act.init_valves().unwrap();
        let writes = rig.gpio_writes();

        assert!(act.open_valve(Valve::Vertical).unwrap());
        assert!(!act.open_valve(Valve::Vertical).unwrap());
        assert_eq!(rig.gpio_writes(), writes + 1);
        assert_eq!(rig.pin(11), Some(true));

        assert!(act.close_valve(Valve::Vertical).unwrap());
        assert!(!act.close_valve(Valve::Vertical).unwrap());
        assert_eq!(rig.gpio_writes(), writes + 2);
    }

    #[test]
    fn init_valves_always_writes() {
        let rig = SimRig::new();
        let mut act = driver(&rig);
        act.init_valves().unwrap();
        act.init_valves().unwrap();
        assert_eq!(rig.gpio_writes(), 6);
        assert_eq!(rig.pin(12), Some(false));
        assert_eq!(rig.pin(15), Some(false));
    }

    #[test]
    fn active_low_valves_invert_pin_level() {
        let rig = SimRig::new();
        let mut config = RigConfig::default();
        config.pins.valve_active = crate::hw::ActiveLevel::Low;
        let mut act = ActuatorDriver::new(rig.pwm(), rig.gpio(), config.pins, config.regulator);
        act.open_valve(Valve::TurnA).unwrap();
        assert_eq!(rig.pin(12), Some(false));
        assert!(act.valve_open(Valve::TurnA));
    }

    #[test]
    fn regulator_init_and_shutdown() {
        let rig = SimRig::new();
        let mut act = driver(&rig);
        act.init_regulator().unwrap();
        assert_eq!(rig.pwm_hz(0), 500);
        assert_eq!(rig.pwm_hz(1), 500);

        act.set_des_force(SampleId::A, 80.0).unwrap();
        assert!(rig.duty(0) > 0.0);
        act.turn_off_pressure_reg().unwrap();
        assert_eq!(rig.duty(0), 0.0);
        assert_eq!(act.psi(SampleId::A), 0.0);
    }

    #[test]
    fn failed_write_is_reported() {
        let rig = SimRig::new();
        let mut act = driver(&rig);
        rig.set_pwm_failure(true);
        assert!(act.set_des_force(SampleId::A, 40.0).is_err());
        assert!(act.turn_off_pressure_reg().is_err());
    }
}
