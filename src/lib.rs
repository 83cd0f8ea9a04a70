// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Foot Test Stand Controller
//!
//! This crate drives a pneumatic foot test stand: it regulates the force a sensorized foot applies
//! to up to two samples, cycles through a fixed down-step / up-step / hold procedure, detects
//! sensor contact, and logs per-sample data to CSV. It runs on a Linux single-board computer.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`hw`] | ADC / PWM / GPIO traits and the simulated rig |
//! | [`drivers`] | Sensor reader, regulator and valve driver |
//! | [`control`] | PID, contact detection, test state machine, control loop |
//! | [`logging`] | Background CSV data logger |
//! | [`protocol`] | Operator command parser and hand-off |
//! | [`config`] | Rig configuration |
//!
//! ## Running
//!
//! The binary drives the simulated rig, takes an optional JSON config and reads operator commands
//! (`start`, `stop`, `force 45`, `steps 400 600`, ...) from stdin:
//!
//! ```bash
//! RUST_LOG=debug cargo run --release -- rig.json
//! ```
//!
//! Unit tests sit next to each module; the end-to-end procedures and log round trips are under
//! `tests/`, and `cargo bench` times one control tick.
//!
//! ## License
//!
//! MIT, see `LICENSE`.
//!
//! © 2025–2026 Christopher Liu

pub mod config;
pub mod constants;
pub mod control;
pub mod drivers;
pub mod error;
pub mod hw;
pub mod logging;
pub mod protocol;
pub mod sample;

pub use sample::SampleId;
