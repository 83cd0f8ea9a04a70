// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Rig configuration.
//!
//! [`RigConfig`] bundles calibration, wiring, tuning and test defaults. Every field has a default
//! taken from [`crate::constants`], so a config file only needs to list what differs:
//!
//! ```json
//! { "control": { "p_gain": 1.2 }, "logging": { "dir": "/var/log/footstand" } }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;
use crate::hw::ActiveLevel;
use crate::protocol::ParamLimits;

/// Conversion constants for the load cells and foot sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub adc_max_v: f32,
    pub adc_resolution: u16,
    /// Load cell sensitivity [V/V/lb].
    pub load_cell_const: f32,
    pub gain_loadcell: f32,
    /// Load cell output at zero load [V].
    pub load_cell_offset_v: f32,
    pub excitation_v: f32,
    pub foot_sensor_area: f32,
    pub gain_toe_heel: f32,
    pub r2_toe: f32,
    pub r2_heel: f32,
    pub foot_sensor_internal_res: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            adc_max_v: ADC_MAX_V,
            adc_resolution: RESOLUTION_ADC,
            load_cell_const: LOAD_CELL_CONST,
            gain_loadcell: GAIN_LOADCELL,
            load_cell_offset_v: Y_INTERCEPT,
            excitation_v: FIVE_V_INPUT,
            foot_sensor_area: AREA_FOOT_SENSOR,
            gain_toe_heel: GAIN_TOE_HEEL,
            r2_toe: R2_TOE,
            r2_heel: R2_HEEL,
            foot_sensor_internal_res: FOOT_SENSOR_INTERNAL_RES,
        }
    }
}

/// Channel and pin numbers, indexed by sample (A = 0, B = 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    pub load_cell: [u8; MAX_SAMPLE],
    pub heel: [u8; MAX_SAMPLE],
    pub toe: [u8; MAX_SAMPLE],
    pub regulator: [u8; MAX_SAMPLE],
    pub vertical_valve: u8,
    pub turn_valve: [u8; MAX_SAMPLE],
    /// Pin level that opens a valve.
    pub valve_active: ActiveLevel,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            load_cell: [LOAD_CELL_1, LOAD_CELL_2],
            heel: [HEEL_1_ADC, HEEL_2_ADC],
            toe: [TOE_1_ADC, TOE_2_ADC],
            regulator: [PRS_REG_1, PRS_REG_2],
            vertical_valve: SOL_VALVE_1,
            turn_valve: [SOL_VALVE_2, SOL_VALVE_3],
            valve_active: ActiveLevel::High,
        }
    }
}

/// Pressure regulator output stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulatorConfig {
    pub min_psi: f32,
    pub max_psi: f32,
    /// psi per unit of controller output.
    pub command_gain: f32,
    /// Force units per psi, used to bound operator force requests.
    pub force_per_psi: f32,
    pub pwm_gain: f32,
    pub max_v_input: f32,
    pub v_out_max: f32,
    pub pwm_hz: u32,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            min_psi: MIN_PSI,
            max_psi: MAX_PSI,
            command_gain: 1.0,
            force_per_psi: 1.0,
            pwm_gain: PWM_GAIN,
            max_v_input: MAX_V_INPUT_PRESSREG,
            v_out_max: V_OUT_MAX,
            pwm_hz: PWM_HZ,
        }
    }
}

/// Control loop timing, PID tuning and sensor validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tick_ms: u32,
    pub p_gain: f32,
    pub i_gain: f32,
    pub d_gain: f32,
    pub i_min: f32,
    pub i_max: f32,
    /// Derivative smoothing weight on the newest sample (1.0 = unfiltered).
    pub d_filter: f32,
    pub adc_buffer_size: usize,
    pub max_invalid_reads: u8,
    pub negative_force_tolerance: f32,
    pub contact_on: f32,
    pub contact_hysteresis: f32,
    pub debounce_samples: u8,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_ms: CONTROL_TICK_MS,
            p_gain: DEFAULT_P_GAIN,
            i_gain: DEFAULT_I_GAIN,
            d_gain: DEFAULT_D_GAIN,
            i_min: DEFAULT_I_MIN,
            i_max: DEFAULT_I_MAX,
            d_filter: 1.0,
            adc_buffer_size: ADC_BUFFER_SIZE,
            max_invalid_reads: MAX_INVALID_READS,
            negative_force_tolerance: NEGATIVE_FORCE_TOLERANCE,
            contact_on: CONTACT_ON_THRESHOLD,
            contact_hysteresis: CONTACT_HYSTERESIS,
            debounce_samples: CONTACT_DEBOUNCE_SAMPLES,
        }
    }
}

/// Data logger placement and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub period_ms: u32,
    pub queue_capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(LOG_DIR),
            period_ms: LOG_TIMER_MS,
            queue_capacity: LOG_QUEUE_CAPACITY,
        }
    }
}

/// Test parameters used until the operator changes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestDefaults {
    pub desired_force: f32,
    pub up_step_ms: u32,
    pub down_step_ms: u32,
    pub hold_ms: u32,
    pub cycles: u32,
    pub num_samples: u8,
    pub turn_plates: bool,
}

impl Default for TestDefaults {
    fn default() -> Self {
        Self {
            desired_force: DEFAULT_DES_FORCE,
            up_step_ms: DEFAULT_UP_STEP_MS,
            down_step_ms: DEFAULT_DOWN_STEP_MS,
            hold_ms: DEFAULT_HOLD_MS,
            cycles: DEFAULT_DES_STEPS,
            num_samples: DEFAULT_NUM_SAMPLES,
            turn_plates: DEFAULT_TURN_PLATES,
        }
    }
}

/// Complete rig configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub calibration: Calibration,
    pub pins: PinMap,
    pub regulator: RegulatorConfig,
    pub control: ControlConfig,
    pub logging: LogConfig,
    pub defaults: TestDefaults,
}

impl RigConfig {
    /// Load a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: RigConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Bounds the command gateway enforces on operator input.
    pub fn limits(&self) -> ParamLimits {
        ParamLimits {
            min_force: self.regulator.min_psi * self.regulator.force_per_psi,
            max_force: self.regulator.max_psi * self.regulator.force_per_psi,
            max_step_ms: MAX_STEP_MS,
        }
    }

    /// Reject configurations the control loop cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.control;
        let gains = [c.p_gain, c.i_gain, c.d_gain, c.i_min, c.i_max, c.d_filter];
        if gains.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::InvalidParameter("PID gains must be finite"));
        }
        if c.i_min > c.i_max {
            return Err(ConfigError::InvalidParameter("i_min must not exceed i_max"));
        }
        if !(c.d_filter > 0.0 && c.d_filter <= 1.0) {
            return Err(ConfigError::InvalidParameter("d_filter must be in (0, 1]"));
        }
        if c.tick_ms == 0 {
            return Err(ConfigError::InvalidParameter("tick_ms must be positive"));
        }
        if c.adc_buffer_size == 0 || c.adc_buffer_size > MAX_ADC_BUFFER_SIZE {
            return Err(ConfigError::InvalidParameter(
                "adc_buffer_size must be between 1 and 100",
            ));
        }
        if c.max_invalid_reads == 0 {
            return Err(ConfigError::InvalidParameter("max_invalid_reads must be positive"));
        }
        if c.debounce_samples == 0 {
            return Err(ConfigError::InvalidParameter("debounce_samples must be positive"));
        }
        if c.contact_hysteresis < 0.0 || c.contact_hysteresis > c.contact_on {
            return Err(ConfigError::InvalidParameter(
                "contact_hysteresis must be within [0, contact_on]",
            ));
        }

        let r = &self.regulator;
        if !(r.min_psi >= 0.0 && r.min_psi < r.max_psi) {
            return Err(ConfigError::InvalidParameter("regulator psi range is empty"));
        }
        if r.pwm_gain <= 0.0 || r.v_out_max <= 0.0 || r.force_per_psi <= 0.0 {
            return Err(ConfigError::InvalidParameter("regulator gains must be positive"));
        }

        let cal = &self.calibration;
        if cal.adc_resolution < 2 || cal.gain_loadcell <= 0.0 || cal.foot_sensor_area <= 0.0 {
            return Err(ConfigError::InvalidParameter("calibration constants must be positive"));
        }
        if cal.load_cell_const * cal.excitation_v == 0.0 {
            return Err(ConfigError::InvalidParameter("load cell sensitivity is zero"));
        }

        if self.logging.period_ms == 0 || self.logging.queue_capacity == 0 {
            return Err(ConfigError::InvalidParameter("log period and queue must be positive"));
        }

        let d = &self.defaults;
        let limits = self.limits();
        if d.desired_force < limits.min_force || d.desired_force > limits.max_force {
            return Err(ConfigError::ForceOutOfRange {
                value: d.desired_force,
                min: limits.min_force,
                max: limits.max_force,
            });
        }
        if d.cycles == 0 {
            return Err(ConfigError::InvalidCycles(0));
        }
        if d.num_samples == 0 || d.num_samples as usize > MAX_SAMPLE {
            return Err(ConfigError::InvalidSampleCount(d.num_samples as i64));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RigConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.defaults.desired_force, 40.0);
        assert_eq!(config.logging.period_ms, 12);
        assert_eq!(config.pins.turn_valve, [12, 15]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "control": { "p_gain": 1.5 }, "defaults": { "cycles": 7 } }"#;
        let config: RigConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.control.p_gain, 1.5);
        assert_eq!(config.control.i_gain, DEFAULT_I_GAIN);
        assert_eq!(config.defaults.cycles, 7);
        assert_eq!(config.regulator.max_psi, MAX_PSI);
    }

    #[test]
    fn rejects_inverted_integrator_limits() {
        let mut config = RigConfig::default();
        config.control.i_min = 10.0;
        config.control.i_max = -10.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_adc_buffer() {
        let mut config = RigConfig::default();
        config.control.adc_buffer_size = MAX_ADC_BUFFER_SIZE;
        assert!(config.validate().is_ok());
        config.control.adc_buffer_size = MAX_ADC_BUFFER_SIZE + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter(_))
        ));
    }

    #[test]
    fn rejects_default_force_outside_regulator_range() {
        let mut config = RigConfig::default();
        config.defaults.desired_force = 500.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ForceOutOfRange { .. })
        ));
    }

    #[test]
    fn limits_scale_with_force_per_psi() {
        let mut config = RigConfig::default();
        config.regulator.force_per_psi = 2.0;
        let limits = config.limits();
        assert_eq!(limits.min_force, 6.0);
        assert_eq!(limits.max_force, 240.0);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RigConfig::load(Path::new("/nonexistent/footstand.json")).unwrap_err();
        assert!(matches!(err, ConfigError::File(_)));
    }
}
