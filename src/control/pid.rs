// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! PID force controller.
//!
//! Derivative acts on the measurement rather than the error, so a step change of the force target
//! between test states does not kick the regulator. The integrator is clamped after every
//! accumulation. There is no output clamp here; the actuator driver bounds the regulator command.

use crate::config::ControlConfig;

/// PID gains and state for one sample channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Pid {
    /// Proportional gain
    p_gain: f32,
    /// Integral gain
    i_gain: f32,
    /// Derivative gain
    d_gain: f32,

    /// Integrator state
    i_state: f32,
    /// Last measured value (for derivative term)
    d_state: f32,
    /// Last derivative term
    past_d_term: f32,

    /// Integral anti-windup clamp
    i_min: f32,
    i_max: f32,

    /// Weight of the newest derivative sample (1.0 = unfiltered)
    d_filter: f32,

    first_update: bool,
}

impl Pid {
    /// Create a new PID controller.
    ///
    /// `p_gain`, `i_gain`, `d_gain` are the gain constants.
    pub fn new(p_gain: f32, i_gain: f32, d_gain: f32) -> Self {
        Self {
            p_gain,
            i_gain,
            d_gain,

            i_state: 0.0,
            d_state: 0.0,
            past_d_term: 0.0,

            i_min: -1.0,
            i_max: 1.0,

            d_filter: 1.0,

            first_update: true,
        }
    }

    /// Build a controller from the rig's control settings.
    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(config.p_gain, config.i_gain, config.d_gain)
            .with_integral_limits(config.i_min, config.i_max)
            .with_derivative_filter(config.d_filter)
    }

    /// Set integral limits for anti-windup. Limits given in the wrong order are swapped.
    pub fn with_integral_limits(mut self, min: f32, max: f32) -> Self {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        self.i_min = lo;
        self.i_max = hi;
        self.i_state = self.i_state.clamp(lo, hi);
        self
    }

    /// Smooth the derivative term: `d = a * d_new + (1 - a) * d_prev`, `a` in `(0, 1]`.
    pub fn with_derivative_filter(mut self, a: f32) -> Self {
        self.d_filter = if a > 0.0 && a <= 1.0 { a } else { 1.0 };
        self
    }

    /// Reset integrator + derivative history.
    pub fn reset(&mut self) {
        self.i_state = 0.0f32.clamp(self.i_min, self.i_max);
        self.d_state = 0.0;
        self.past_d_term = 0.0;
        self.first_update = true;
    }

    /// Update the controller.
    ///
    /// `target`: desired force
    /// `measured`: current force
    /// `dt`: timestep in seconds (e.g. 0.002 for a 2 ms control tick)
    ///
    /// Returns an unbounded regulator command.
    pub fn update(&mut self, target: f32, measured: f32, dt: f32) -> f32 {
        let error = target - measured;

        // ----- P term -----
        let p = self.p_gain * error;

        // ----- I term -----
        let accum = self.i_gain * error * dt;
        if accum.is_finite() {
            self.i_state += accum;
        }

        // Anti-windup clamp
        self.i_state = self.i_state.clamp(self.i_min, self.i_max);

        let i = self.i_state;

        // ----- D term (on measurement) -----
        let d_measured = if self.first_update || dt <= 0.0 || !measured.is_finite() {
            self.first_update = false;
            0.0
        } else {
            (measured - self.d_state) / dt
        };
        let d = self.d_filter * d_measured + (1.0 - self.d_filter) * self.past_d_term;
        self.past_d_term = d;
        if measured.is_finite() {
            self.d_state = measured;
        }

        p + i - self.d_gain * d
    }

    #[inline]
    pub fn integrator(&self) -> f32 {
        self.i_state
    }

    #[inline]
    pub fn integral_limits(&self) -> (f32, f32) {
        (self.i_min, self.i_max)
    }

    #[inline]
    pub fn last_measured(&self) -> f32 {
        self.d_state
    }

    #[inline]
    pub fn last_derivative(&self) -> f32 {
        self.past_d_term
    }
}
