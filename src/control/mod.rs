// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Control
//!
//! Closed-loop force control and the test procedure.
//!
//! ## Modules
//!
//! - [`pid`] - PID force controller with anti-windup.
//! - [`contact`] - Debounced sensor-contact detection.
//! - [`state`] - Test states and the transition table.
//! - [`test_machine`] - The test procedure, driving sensors, controllers and valves.
//! - [`runner`] - Fixed-period loop around the test machine.

pub mod contact;
pub mod pid;
pub mod runner;
pub mod state;
pub mod test_machine;

pub use contact::ContactDetector;
pub use pid::Pid;
pub use runner::{run, LoopStats};
pub use state::{next_state, QuitReason, SubState, TestState, TransitionInputs};
pub use test_machine::{SampleRecord, TestMachine, TestParameters};
