// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Operator command vocabulary.
//!
//! A [`Command`] is what the parser read off the line, with numbers still in their widest form.
//! [`Command::validate`] checks it against the rig's [`ParamLimits`] and produces a [`Directive`],
//! which is the only thing the control loop ever receives.

use crate::constants::{MAX_PSI, MAX_SAMPLE, MAX_STEP_MS, MIN_PSI};
use crate::error::ConfigError;
use crate::sample::SampleId;

/// Longest line the parser buffers, including arguments.
pub const MAX_LINE: usize = 128;
/// Longest lot or serial identifier.
pub const MAX_ID_LEN: usize = 31;

/// Parsed, unvalidated operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Quit,
    Reset,
    SetForce(f32),
    SetSteps { up_ms: i64, down_ms: i64 },
    SetHold(i64),
    SetCycles(i64),
    SetSamples(i64),
    SetTurnPlates(bool),
    SetLot {
        sample: SampleId,
        lot: String,
        serial: String,
    },
}

/// Validated command, ready for the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Start,
    Stop,
    Quit,
    Reset,
    SetForce(f32),
    SetSteps { up_ms: u32, down_ms: u32 },
    SetHold(u32),
    SetCycles(u32),
    SetSamples(u8),
    SetTurnPlates(bool),
    SetLot {
        sample: SampleId,
        lot: String,
        serial: String,
    },
}

/// Bounds on operator-supplied parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamLimits {
    pub min_force: f32,
    pub max_force: f32,
    pub max_step_ms: i64,
}

impl Default for ParamLimits {
    fn default() -> Self {
        Self {
            min_force: MIN_PSI,
            max_force: MAX_PSI,
            max_step_ms: MAX_STEP_MS,
        }
    }
}

impl Command {
    pub fn validate(self, limits: &ParamLimits) -> Result<Directive, ConfigError> {
        Ok(match self {
            Command::Start => Directive::Start,
            Command::Stop => Directive::Stop,
            Command::Quit => Directive::Quit,
            Command::Reset => Directive::Reset,
            Command::SetForce(force) => {
                if !force.is_finite() {
                    return Err(ConfigError::InvalidParameter("force must be finite"));
                }
                if force < limits.min_force || force > limits.max_force {
                    return Err(ConfigError::ForceOutOfRange {
                        value: force,
                        min: limits.min_force,
                        max: limits.max_force,
                    });
                }
                Directive::SetForce(force)
            }
            Command::SetSteps { up_ms, down_ms } => Directive::SetSteps {
                up_ms: duration(up_ms, limits)?,
                down_ms: duration(down_ms, limits)?,
            },
            Command::SetHold(ms) => Directive::SetHold(duration(ms, limits)?),
            Command::SetCycles(n) => {
                if n < 1 || n > u32::MAX as i64 {
                    return Err(ConfigError::InvalidCycles(n));
                }
                Directive::SetCycles(n as u32)
            }
            Command::SetSamples(n) => {
                if n < 1 || n > MAX_SAMPLE as i64 {
                    return Err(ConfigError::InvalidSampleCount(n));
                }
                Directive::SetSamples(n as u8)
            }
            Command::SetTurnPlates(on) => Directive::SetTurnPlates(on),
            Command::SetLot {
                sample,
                lot,
                serial,
            } => {
                if !valid_id(&lot) || !valid_id(&serial) {
                    return Err(ConfigError::InvalidParameter(
                        "lot and serial must be 1-31 printable characters",
                    ));
                }
                Directive::SetLot {
                    sample,
                    lot,
                    serial,
                }
            }
        })
    }
}

fn duration(ms: i64, limits: &ParamLimits) -> Result<u32, ConfigError> {
    if ms < 0 {
        return Err(ConfigError::NegativeDuration(ms));
    }
    if ms > limits.max_step_ms {
        return Err(ConfigError::DurationTooLong(ms));
    }
    Ok(ms as u32)
}

fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN && id.chars().all(|c| c.is_ascii_graphic())
}
