// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Test states and the transition table.
//!
//! All time- and event-driven transitions of the test procedure are decided by [`next_state`].
//! The only transitions that bypass it are the operator-forced `Reset` and `Quit`, and fault
//! aborts, which the test machine applies directly.

use core::fmt;

use serde::{Deserialize, Serialize};

/// High-level test state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestState {
    #[serde(rename = "init")]
    Init,
    #[serde(rename = "downStep")]
    DownStep,
    #[serde(rename = "upStep")]
    UpStep,
    #[serde(rename = "hold")]
    Hold,
    #[serde(rename = "quit")]
    Quit,
    #[serde(rename = "reset")]
    Reset,
}

impl TestState {
    /// Display name used in logs and operator output.
    pub fn name(self) -> &'static str {
        match self {
            TestState::Init => "init",
            TestState::DownStep => "downStep",
            TestState::UpStep => "upStep",
            TestState::Hold => "hold",
            TestState::Quit => "quit",
            TestState::Reset => "reset",
        }
    }

    /// Force the controller regulates to while in this state.
    pub fn target_force(self, desired: f32) -> f32 {
        match self {
            TestState::DownStep | TestState::UpStep | TestState::Hold => desired,
            TestState::Init | TestState::Reset | TestState::Quit => 0.0,
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-sample contact sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubState {
    #[serde(rename = "sensorContact")]
    SensorContact,
    #[serde(rename = "noSensorContact")]
    NoSensorContact,
}

impl SubState {
    pub fn name(self) -> &'static str {
        match self {
            SubState::SensorContact => "sensorContact",
            SubState::NoSensorContact => "noSensorContact",
        }
    }
}

impl fmt::Display for SubState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why the test reached `Quit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuitReason {
    /// Operator asked for a graceful stop; the run ended at a cycle boundary.
    NormalCompletion,
    /// All configured cycles ran.
    CycleLimitReached,
    /// Operator quit mid-test.
    OperatorAbort,
    /// Too many consecutive invalid sensor readings.
    SensorFault,
    /// An actuator write failed.
    HardwareFault,
}

impl QuitReason {
    /// Process exit code reported to the operator.
    pub fn code(self) -> i32 {
        match self {
            QuitReason::NormalCompletion | QuitReason::CycleLimitReached => 0,
            QuitReason::OperatorAbort => 1,
            QuitReason::SensorFault => 2,
            QuitReason::HardwareFault => 3,
        }
    }

    pub fn is_fault(self) -> bool {
        matches!(self, QuitReason::SensorFault | QuitReason::HardwareFault)
    }
}

impl fmt::Display for QuitReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            QuitReason::NormalCompletion => "normal completion",
            QuitReason::CycleLimitReached => "cycle limit reached",
            QuitReason::OperatorAbort => "operator abort",
            QuitReason::SensorFault => "sensor fault",
            QuitReason::HardwareFault => "hardware fault",
        };
        write!(f, "{} (code {})", text, self.code())
    }
}

/// Everything the transition table looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionInputs {
    /// Time spent in the current state.
    pub elapsed_ms: u64,
    pub down_step_ms: u32,
    pub up_step_ms: u32,
    pub hold_ms: u32,
    /// Cycles completed so far.
    pub cycle: u32,
    pub cycles: u32,
    /// Some active sample entered `SensorContact` this tick.
    pub contact_rising: bool,
    /// Operator asked to stop at the end of the current cycle.
    pub stop_requested: bool,
}

/// The fixed transition table.
///
/// Returns the next state and, when that state is `Quit`, the reason.
pub fn next_state(current: TestState, inputs: &TransitionInputs) -> (TestState, Option<QuitReason>) {
    match current {
        TestState::Init => (TestState::DownStep, None),

        TestState::DownStep if inputs.elapsed_ms >= inputs.down_step_ms as u64 => {
            (TestState::UpStep, None)
        }

        TestState::UpStep
            if inputs.contact_rising || inputs.elapsed_ms >= inputs.up_step_ms as u64 =>
        {
            (TestState::Hold, None)
        }

        TestState::Hold if inputs.elapsed_ms >= inputs.hold_ms as u64 => {
            let completed = inputs.cycle.saturating_add(1);
            if completed >= inputs.cycles {
                (TestState::Quit, Some(QuitReason::CycleLimitReached))
            } else if inputs.stop_requested {
                (TestState::Quit, Some(QuitReason::NormalCompletion))
            } else {
                (TestState::DownStep, None)
            }
        }

        TestState::Reset => (TestState::Init, None),

        state => (state, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> TransitionInputs {
        TransitionInputs {
            elapsed_ms: 0,
            down_step_ms: 500,
            up_step_ms: 500,
            hold_ms: 0,
            cycle: 0,
            cycles: 2,
            contact_rising: false,
            stop_requested: false,
        }
    }

    #[test]
    fn init_always_moves_to_down_step() {
        let mut i = inputs();
        i.down_step_ms = 1_000_000;
        assert_eq!(next_state(TestState::Init, &i), (TestState::DownStep, None));
    }

    #[test]
    fn down_step_waits_for_duration() {
        let mut i = inputs();
        i.elapsed_ms = 499;
        assert_eq!(next_state(TestState::DownStep, &i).0, TestState::DownStep);
        i.elapsed_ms = 500;
        assert_eq!(next_state(TestState::DownStep, &i).0, TestState::UpStep);
    }

    #[test]
    fn up_step_ends_early_on_contact() {
        let mut i = inputs();
        i.elapsed_ms = 200;
        assert_eq!(next_state(TestState::UpStep, &i).0, TestState::UpStep);
        i.contact_rising = true;
        assert_eq!(next_state(TestState::UpStep, &i).0, TestState::Hold);
    }

    #[test]
    fn hold_repeats_until_cycle_limit() {
        let mut i = inputs();
        assert_eq!(next_state(TestState::Hold, &i), (TestState::DownStep, None));
        i.cycle = 1;
        assert_eq!(
            next_state(TestState::Hold, &i),
            (TestState::Quit, Some(QuitReason::CycleLimitReached))
        );
    }

    #[test]
    fn hold_honours_graceful_stop() {
        let mut i = inputs();
        i.cycles = 10;
        i.stop_requested = true;
        assert_eq!(
            next_state(TestState::Hold, &i),
            (TestState::Quit, Some(QuitReason::NormalCompletion))
        );
    }

    #[test]
    fn hold_waits_for_hold_time() {
        let mut i = inputs();
        i.hold_ms = 100;
        i.elapsed_ms = 50;
        assert_eq!(next_state(TestState::Hold, &i).0, TestState::Hold);
    }

    #[test]
    fn reset_reinitialises_and_quit_is_terminal() {
        let mut i = inputs();
        i.elapsed_ms = 1_000_000;
        assert_eq!(next_state(TestState::Reset, &i).0, TestState::Init);
        assert_eq!(next_state(TestState::Quit, &i), (TestState::Quit, None));
    }

    #[test]
    fn targets_follow_state() {
        assert_eq!(TestState::DownStep.target_force(40.0), 40.0);
        assert_eq!(TestState::Hold.target_force(40.0), 40.0);
        assert_eq!(TestState::Init.target_force(40.0), 0.0);
        assert_eq!(TestState::Reset.target_force(40.0), 0.0);
    }

    #[test]
    fn fault_reasons_have_nonzero_codes() {
        assert_eq!(QuitReason::CycleLimitReached.code(), 0);
        assert!(QuitReason::SensorFault.code() != 0);
        assert!(QuitReason::HardwareFault.is_fault());
        assert_eq!(TestState::DownStep.to_string(), "downStep");
    }
}
