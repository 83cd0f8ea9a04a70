// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Rig constants for the foot test stand.
//!
//! These are the factory defaults. Everything that is a calibration value or a tuning knob is
//! copied into [`RigConfig`](crate::config::RigConfig) and can be overridden from the config file.

/* --------------------------- ADC -------------------------- */
/// Counts in the 12 bit ADC (0 - 4095).
pub const RESOLUTION_ADC: u16 = 4096;
/// Highest valid raw count.
pub const ADC_MAX_COUNT: u16 = RESOLUTION_ADC - 1;
/// Full-scale ADC input voltage.
pub const ADC_MAX_V: f32 = 1.8;
/// Raw conversions averaged per reading.
pub const ADC_BUFFER_SIZE: usize = 8;
/// Upper bound on `ADC_BUFFER_SIZE` overrides.
pub const MAX_ADC_BUFFER_SIZE: usize = 100;

/* --------------------------- Analog channels -------------------------- */
pub const LOAD_CELL_1: u8 = 0; // AIN_0
pub const LOAD_CELL_2: u8 = 1; // AIN_1
pub const HEEL_1_ADC: u8 = 2; // AIN_2
pub const TOE_1_ADC: u8 = 3; // AIN_3
pub const HEEL_2_ADC: u8 = 4; // AIN_4
pub const TOE_2_ADC: u8 = 5; // AIN_5

/* --------------------------- Valves and regulator -------------------------- */
pub const SOL_VALVE_1: u8 = 11; // GPIO 11, P8
pub const SOL_VALVE_2: u8 = 12; // GPIO 12, P8
pub const SOL_VALVE_3: u8 = 15; // GPIO 15, P8
pub const PRS_REG_1: u8 = 0; // PWMSS_0A P9 22
pub const PRS_REG_2: u8 = 1; // PWMSS_0B P9 21
pub const PWM_HZ: u32 = 500;

/* --------------------------- Load cell calibration -------------------------- */
/// Load cell sensitivity [V/V/lb].
pub const LOAD_CELL_CONST: f32 = 0.0030019;
/// Gain of the load cell op amp.
pub const GAIN_LOADCELL: f32 = 1.757;
/// Load cell output at zero load [V], from the bench fit of lbs vs output voltage.
pub const Y_INTERCEPT: f32 = 0.03996;
/// Load cell excitation voltage.
pub const FIVE_V_INPUT: f32 = 5.0;

/* --------------------------- Foot sensor calibration -------------------------- */
pub const AREA_FOOT_SENSOR: f32 = 42.09;
/// Divider between the foot sensor node and the ADC input.
pub const GAIN_TOE_HEEL: f32 = 2.0;
pub const R2_TOE: f32 = 322.0;
pub const R2_HEEL: f32 = 2298.0;
pub const FOOT_SENSOR_INTERNAL_RES: f32 = 470.0;

/* --------------------------- Pressure regulator -------------------------- */
pub const V_OUT_MAX: f32 = 3.3;
pub const MAX_PSI: f32 = 120.0;
pub const MIN_PSI: f32 = 3.0;
/// Output stage gain (1 + R2/R1).
pub const PWM_GAIN: f32 = 3.0;
pub const MAX_V_INPUT_PRESSREG: f32 = 10.0;

/* --------------------------- Test defaults -------------------------- */
pub const DEFAULT_DES_FORCE: f32 = 40.0; // psi
pub const DEFAULT_UP_STEP_MS: u32 = 500;
pub const DEFAULT_DOWN_STEP_MS: u32 = 500;
pub const DEFAULT_HOLD_MS: u32 = 0;
pub const DEFAULT_DES_STEPS: u32 = 2; // cycles
pub const DEFAULT_TURN_PLATES: bool = true;
pub const DEFAULT_NUM_SAMPLES: u8 = 1;
/// Upper bound for any operator supplied step duration.
pub const MAX_STEP_MS: i64 = 600_000;

/* --------------------------- Control loop -------------------------- */
pub const CONTROL_TICK_MS: u32 = 2;
pub const DEFAULT_P_GAIN: f32 = 0.8;
pub const DEFAULT_I_GAIN: f32 = 2.0;
pub const DEFAULT_D_GAIN: f32 = 0.0;
pub const DEFAULT_I_MIN: f32 = -40.0;
pub const DEFAULT_I_MAX: f32 = 120.0;
/// Consecutive invalid sensor reads tolerated before the test is aborted.
pub const MAX_INVALID_READS: u8 = 3;
/// Zeroed force below `-NEGATIVE_FORCE_TOLERANCE` is not physical.
pub const NEGATIVE_FORCE_TOLERANCE: f32 = 5.0;

/* --------------------------- Contact detection -------------------------- */
pub const CONTACT_ON_THRESHOLD: f32 = 1.0;
pub const CONTACT_HYSTERESIS: f32 = 0.4;
pub const CONTACT_DEBOUNCE_SAMPLES: u8 = 2;

/* --------------------------- Data logging -------------------------- */
pub const LOGNAME_SIZE: usize = 255;
pub const LOG_TIMER_MS: u32 = 12;
pub const LOG_DIR: &str = "../log";
pub const LOG_QUEUE_CAPACITY: usize = 1024;
pub const MAX_SAMPLE: usize = 2;
