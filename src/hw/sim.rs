// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Simulated rig.
//!
//! Stands in for the ADC / PWM / GPIO drivers when the stand is not attached. All three handles
//! share one [`SimState`], so a test can script raw ADC counts and then inspect what the
//! controller wrote to the regulator and valves. [`SimPlant`] adds a crude pneumatic model so the
//! binary can run a full test sequence on a desk.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{Calibration, PinMap, RegulatorConfig};
use crate::error::HwError;
use crate::hw::{AdcRead, GpioWrite, PwmWrite};

const SIM_ADC_CHANNELS: usize = 8;
const SIM_PWM_CHANNELS: usize = 2;

/// Everything the simulated peripherals expose.
#[derive(Debug, Default)]
pub struct SimState {
    pub adc: [u16; SIM_ADC_CHANNELS],
    pub adc_not_ready: [bool; SIM_ADC_CHANNELS],
    pub duty: [f32; SIM_PWM_CHANNELS],
    pub pwm_hz: [u32; SIM_PWM_CHANNELS],
    pub pins: HashMap<u8, bool>,
    pub gpio_writes: u32,
    pub pwm_writes: u32,
    /// Make every PWM write fail.
    pub fail_pwm: bool,
}

/// Shared handle to the simulated peripherals.
#[derive(Clone, Default)]
pub struct SimRig {
    state: Arc<Mutex<SimState>>,
}

impl SimRig {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the rig state from the rest of the test.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn adc(&self) -> SimAdc {
        SimAdc { rig: self.clone() }
    }

    pub fn pwm(&self) -> SimPwm {
        SimPwm { rig: self.clone() }
    }

    pub fn gpio(&self) -> SimGpio {
        SimGpio { rig: self.clone() }
    }

    pub fn set_adc(&self, ch: u8, raw: u16) {
        if let Some(slot) = self.lock().adc.get_mut(ch as usize) {
            *slot = raw;
        }
    }

    pub fn set_not_ready(&self, ch: u8, not_ready: bool) {
        if let Some(slot) = self.lock().adc_not_ready.get_mut(ch as usize) {
            *slot = not_ready;
        }
    }

    pub fn set_pwm_failure(&self, fail: bool) {
        self.lock().fail_pwm = fail;
    }

    pub fn duty(&self, ch: u8) -> f32 {
        self.lock().duty.get(ch as usize).copied().unwrap_or(0.0)
    }

    pub fn pwm_hz(&self, ch: u8) -> u32 {
        self.lock().pwm_hz.get(ch as usize).copied().unwrap_or(0)
    }

    /// Last level written to a pin, `None` if never written.
    pub fn pin(&self, pin: u8) -> Option<bool> {
        self.lock().pins.get(&pin).copied()
    }

    pub fn gpio_writes(&self) -> u32 {
        self.lock().gpio_writes
    }

    pub fn pwm_writes(&self) -> u32 {
        self.lock().pwm_writes
    }
}

pub struct SimAdc {
    rig: SimRig,
}

impl AdcRead for SimAdc {
    fn read_channel(&mut self, ch: u8) -> nb::Result<u16, HwError> {
        let state = self.rig.lock();
        let idx = ch as usize;
        if idx >= SIM_ADC_CHANNELS {
            return Err(nb::Error::Other(HwError::InvalidChannel(ch)));
        }
        if state.adc_not_ready[idx] {
            return Err(nb::Error::WouldBlock);
        }
        Ok(state.adc[idx])
    }
}

pub struct SimPwm {
    rig: SimRig,
}

impl PwmWrite for SimPwm {
    fn set_duty(&mut self, ch: u8, duty: f32) -> Result<(), HwError> {
        let mut state = self.rig.lock();
        if state.fail_pwm {
            return Err(HwError::Io(format!("pwm channel {} write failed", ch)));
        }
        let slot = state
            .duty
            .get_mut(ch as usize)
            .ok_or(HwError::InvalidChannel(ch))?;
        *slot = duty;
        state.pwm_writes += 1;
        Ok(())
    }

    fn set_frequency(&mut self, ch: u8, hz: u32) -> Result<(), HwError> {
        let mut state = self.rig.lock();
        let slot = state
            .pwm_hz
            .get_mut(ch as usize)
            .ok_or(HwError::InvalidChannel(ch))?;
        *slot = hz;
        Ok(())
    }
}

pub struct SimGpio {
    rig: SimRig,
}

impl GpioWrite for SimGpio {
    fn write_pin(&mut self, pin: u8, high: bool) -> Result<(), HwError> {
        let mut state = self.rig.lock();
        state.pins.insert(pin, high);
        state.gpio_writes += 1;
        Ok(())
    }
}

/// First-order pneumatic model of the stand.
///
/// With the vertical valve open the foot force chases the regulator pressure; with it closed the
/// foot unloads. Toe and heel pick up a share of the force once the foot carries load.
pub struct SimPlant {
    rig: SimRig,
    calibration: Calibration,
    pins: PinMap,
    regulator: RegulatorConfig,
    /// Load cell force per psi at the regulator.
    pub lbs_per_psi: f32,
    /// Time constant of the pressure response [s].
    pub tau_s: f32,
    force: [f32; 2],
}

impl SimPlant {
    pub fn new(
        rig: SimRig,
        calibration: Calibration,
        pins: PinMap,
        regulator: RegulatorConfig,
    ) -> Self {
        let plant = Self {
            rig,
            calibration,
            pins,
            regulator,
            lbs_per_psi: 1.0,
            tau_s: 0.08,
            force: [0.0; 2],
        };
        for sample in 0..2 {
            plant.write_force(sample);
        }
        plant
    }

    /// Advance the model by `dt` seconds and publish new ADC counts.
    pub fn step(&mut self, dt: f32) {
        let valve_open = self
            .rig
            .pin(self.pins.vertical_valve)
            .map(|level| level == self.pins.valve_active.level_for(true))
            .unwrap_or(false);
        let alpha = (dt / self.tau_s).min(1.0);

        for sample in 0..2 {
            let duty = self.rig.duty(self.pins.regulator[sample]);
            let v_reg = duty * self.regulator.v_out_max * self.regulator.pwm_gain;
            let psi = v_reg / self.regulator.max_v_input * self.regulator.max_psi;
            let target = if valve_open { psi * self.lbs_per_psi } else { 0.0 };
            self.force[sample] += (target - self.force[sample]) * alpha;
            self.write_force(sample);
        }
    }

    pub fn force(&self, sample: usize) -> f32 {
        self.force[sample]
    }

    fn write_force(&self, sample: usize) {
        let force = self.force[sample].max(0.0);
        self.rig
            .set_adc(self.pins.load_cell[sample], load_cell_counts(&self.calibration, force));

        // Half the force on each pad once the foot is loaded.
        let contact = if force > 1.0 { force * 0.05 } else { 0.0 };
        let toe = foot_counts(&self.calibration, self.calibration.r2_toe, contact);
        let heel = foot_counts(&self.calibration, self.calibration.r2_heel, contact);
        self.rig.set_adc(self.pins.toe[sample], toe);
        self.rig.set_adc(self.pins.heel[sample], heel);
    }
}

/// Raw counts a load cell produces for `force_lbs`.
pub fn load_cell_counts(cal: &Calibration, force_lbs: f32) -> u16 {
    let v_cell = force_lbs * cal.load_cell_const * cal.excitation_v + cal.load_cell_offset_v;
    volts_to_counts(cal, v_cell * cal.gain_loadcell)
}

/// Raw counts a foot sensor produces for a contact value (µS per unit area).
pub fn foot_counts(cal: &Calibration, r2: f32, contact: f32) -> u16 {
    if contact <= 0.0 {
        return 0;
    }
    let r_fsr = 1.0e6 / (contact * cal.foot_sensor_area);
    let v = cal.excitation_v * r2 / (r_fsr + r2 + cal.foot_sensor_internal_res);
    volts_to_counts(cal, v / cal.gain_toe_heel)
}

fn volts_to_counts(cal: &Calibration, v: f32) -> u16 {
    let max = cal.adc_resolution - 1;
    let counts = v / cal.adc_max_v * cal.adc_resolution as f32;
    counts.round().clamp(0.0, max as f32) as u16
}
