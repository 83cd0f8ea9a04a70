// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Digital output boundary used for the solenoid valves.

use crate::error::HwError;

/// Whether a pin energizes its load when driven high or low.
#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ActiveLevel {
    High,
    Low,
}

impl ActiveLevel {
    /// Pin level that puts the load in the requested logical state.
    #[inline]
    pub fn level_for(self, on: bool) -> bool {
        match self {
            ActiveLevel::High => on,
            ActiveLevel::Low => !on,
        }
    }
}

/// Single GPIO pin writes.
pub trait GpioWrite {
    fn write_pin(&mut self, pin: u8, high: bool) -> Result<(), HwError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_low_inverts_level() {
        assert!(ActiveLevel::High.level_for(true));
        assert!(!ActiveLevel::High.level_for(false));
        assert!(!ActiveLevel::Low.level_for(true));
        assert!(ActiveLevel::Low.level_for(false));
    }
}
