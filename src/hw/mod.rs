// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Hardware Boundary
//!
//! Raw ADC, PWM and GPIO access as traits. The register-level drivers for the board implement
//! these; [`sim`] implements them in memory.

pub mod adc;
pub mod gpio;
pub mod pwm;
pub mod sim;

pub use adc::AdcRead;
pub use gpio::{ActiveLevel, GpioWrite};
pub use pwm::PwmWrite;
pub use sim::{SimPlant, SimRig};
