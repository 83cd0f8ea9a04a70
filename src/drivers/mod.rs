// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device Drivers
//!
//! Drivers that sit above the raw `hw/` traits and below the test state machine.
//!
//! - [`sensor_reader`] – load cells and toe/heel foot sensors
//! - [`actuator`] – pressure regulators and solenoid valves

pub mod actuator;
pub mod sensor_reader;

pub use actuator::{ActuatorDriver, Valve};
pub use sensor_reader::{Reading, SensorReader};
