// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! PWM output boundary used for the pressure regulator command.

use crate::error::HwError;

/// Duty-cycle output on a PWM subsystem channel.
pub trait PwmWrite {
    /// Set the duty cycle as a fraction in `[0.0, 1.0]`.
    fn set_duty(&mut self, ch: u8, duty: f32) -> Result<(), HwError>;

    /// Set the carrier frequency of a channel.
    fn set_frequency(&mut self, ch: u8, hz: u32) -> Result<(), HwError>;
}
