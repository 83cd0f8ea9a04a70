// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Sensor-contact detection with hysteresis and debounce.
//!
//! The sub-state only flips after `debounce` consecutive readings on the far side of the relevant
//! threshold: above `on` to enter contact, below `on - hysteresis` to leave it. Readings between
//! the two thresholds reset both streaks.

use crate::config::ControlConfig;
use crate::control::state::SubState;

#[derive(Debug, Clone, PartialEq)]
pub struct ContactDetector {
    on: f32,
    off: f32,
    debounce: u8,
    state: SubState,
    streak: u8,
}

impl ContactDetector {
    pub fn new(on: f32, hysteresis: f32, debounce: u8) -> Self {
        Self {
            on,
            off: on - hysteresis.max(0.0),
            debounce: debounce.max(1),
            state: SubState::NoSensorContact,
            streak: 0,
        }
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(
            config.contact_on,
            config.contact_hysteresis,
            config.debounce_samples,
        )
    }

    /// Feed one contact reading and return the resulting sub-state.
    pub fn update(&mut self, value: f32) -> SubState {
        let crossing = match self.state {
            SubState::NoSensorContact => value > self.on,
            SubState::SensorContact => value < self.off,
        };

        if crossing {
            self.streak = self.streak.saturating_add(1);
            if self.streak >= self.debounce {
                self.state = match self.state {
                    SubState::NoSensorContact => SubState::SensorContact,
                    SubState::SensorContact => SubState::NoSensorContact,
                };
                self.streak = 0;
            }
        } else {
            self.streak = 0;
        }

        self.state
    }

    #[inline]
    pub fn state(&self) -> SubState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = SubState::NoSensorContact;
        self.streak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_noisy_sample_does_not_toggle() {
        let mut det = ContactDetector::new(1.0, 0.4, 2);
        assert_eq!(det.update(0.0), SubState::NoSensorContact);
        assert_eq!(det.update(5.0), SubState::NoSensorContact);
        assert_eq!(det.update(0.0), SubState::NoSensorContact);
        assert_eq!(det.update(0.0), SubState::NoSensorContact);
    }

    #[test]
    fn sustained_contact_toggles_after_debounce() {
        let mut det = ContactDetector::new(1.0, 0.4, 3);
        assert_eq!(det.update(1.5), SubState::NoSensorContact);
        assert_eq!(det.update(1.5), SubState::NoSensorContact);
        assert_eq!(det.update(1.5), SubState::SensorContact);
    }

    #[test]
    fn hysteresis_band_holds_contact() {
        let mut det = ContactDetector::new(1.0, 0.4, 1);
        assert_eq!(det.update(1.2), SubState::SensorContact);

        // Between off (0.6) and on (1.0): stays in contact.
        for _ in 0..10 {
            assert_eq!(det.update(0.8), SubState::SensorContact);
        }
        assert_eq!(det.update(0.5), SubState::NoSensorContact);
    }

    #[test]
    fn release_also_debounced() {
        let mut det = ContactDetector::new(1.0, 0.4, 2);
        det.update(2.0);
        det.update(2.0);
        assert_eq!(det.state(), SubState::SensorContact);

        assert_eq!(det.update(0.0), SubState::SensorContact);
        assert_eq!(det.update(2.0), SubState::SensorContact);
        assert_eq!(det.update(0.0), SubState::SensorContact);
        assert_eq!(det.update(0.0), SubState::NoSensorContact);
    }

    #[test]
    fn reset_returns_to_no_contact() {
        let mut det = ContactDetector::new(1.0, 0.4, 1);
        det.update(3.0);
        det.reset();
        assert_eq!(det.state(), SubState::NoSensorContact);
    }
}
