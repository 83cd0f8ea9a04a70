// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Load cell and foot sensor acquisition.
//!
//! Each reading averages `buffer_size` raw conversions from one analog channel and converts the
//! average to engineering units.
//!
//! Load cell: bridge output through the load cell op amp into the ADC.
//! - `v_adc = avg / 4096 * 1.8`
//! - `v_cell = v_adc / GAIN_LOADCELL`
//! - `force = (v_cell - Y_INTERCEPT) / (LOAD_CELL_CONST * 5 V)`
//!
//! Toe / heel: force sensing resistor on top of `R2` in a 5 V divider, halved into the ADC.
//! - `v = avg / 4096 * 1.8 * GAIN_TOE_HEEL`
//! - `r_fsr = 5 V * R2 / v - R2 - 470`
//! - `value = (1e6 / r_fsr) / AREA` (conductance per unit area)
//!
//! A load cell conversion on either rail means a broken or overloaded cell. For the foot sensors
//! only the top rail is invalid; 0 counts is an unloaded pad. One railed conversion rejects the
//! whole reading.

use crate::config::{Calibration, PinMap};
use crate::constants::MAX_ADC_BUFFER_SIZE;
use crate::error::{HwError, SensorError};
use crate::hw::adc::{counts_to_volts, AdcRead};
use crate::sample::SampleId;

/// One foot sensor pad.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pad {
    Toe,
    Heel,
}

/// Converted readings for one sample.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Reading {
    /// Load cell force before baseline subtraction [lbs].
    pub force: f32,
    pub heel: f32,
    pub toe: f32,
}

pub struct SensorReader<A> {
    adc: A,
    calibration: Calibration,
    pins: PinMap,
    buffer_size: usize,
}

impl<A: AdcRead> SensorReader<A> {
    pub fn new(adc: A, calibration: Calibration, pins: PinMap, buffer_size: usize) -> Self {
        Self {
            adc,
            calibration,
            pins,
            buffer_size: buffer_size.clamp(1, MAX_ADC_BUFFER_SIZE),
        }
    }

    /// Read load cell, toe and heel for one sample.
    pub fn read(&mut self, sample: SampleId) -> Result<Reading, SensorError> {
        Ok(Reading {
            force: self.read_force(sample)?,
            heel: self.read_pad(sample, Pad::Heel)?,
            toe: self.read_pad(sample, Pad::Toe)?,
        })
    }

    /// Load cell force [lbs], not yet zeroed.
    pub fn read_force(&mut self, sample: SampleId) -> Result<f32, SensorError> {
        let ch = self.pins.load_cell[sample.index()];
        let avg = self.average(ch, Rails::Both)?;
        Ok(load_cell_force(&self.calibration, avg))
    }

    pub fn read_pad(&mut self, sample: SampleId, pad: Pad) -> Result<f32, SensorError> {
        let (ch, r2) = match pad {
            Pad::Toe => (self.pins.toe[sample.index()], self.calibration.r2_toe),
            Pad::Heel => (self.pins.heel[sample.index()], self.calibration.r2_heel),
        };
        let avg = self.average(ch, Rails::Top)?;
        Ok(foot_sensor_value(&self.calibration, r2, avg))
    }

    /// Average `buffer_size` conversions of one channel, rejecting any conversion on `rails`.
    fn average(&mut self, ch: u8, rails: Rails) -> Result<f32, SensorError> {
        let top = self.calibration.adc_resolution - 1;
        let mut sum: u32 = 0;
        for _ in 0..self.buffer_size {
            let raw = match self.adc.read_channel(ch) {
                Ok(raw) => raw,
                Err(nb::Error::WouldBlock) => return Err(SensorError::NotReady { channel: ch }),
                Err(nb::Error::Other(e)) => return Err(SensorError::Hardware(e)),
            };
            if raw >= self.calibration.adc_resolution {
                return Err(SensorError::Hardware(HwError::Io(format!(
                    "channel {} returned {} counts",
                    ch, raw
                ))));
            }
            let railed = raw == top || (raw == 0 && rails == Rails::Both);
            if railed {
                return Err(SensorError::Saturated { channel: ch, raw });
            }
            sum += raw as u32;
        }
        Ok(sum as f32 / self.buffer_size as f32)
    }
}

/// Which ADC rails invalidate a conversion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Rails {
    Top,
    Both,
}

/// Load cell force [lbs] for an averaged raw count.
pub fn load_cell_force(cal: &Calibration, avg_counts: f32) -> f32 {
    let v_adc = counts_to_volts(avg_counts, cal.adc_resolution, cal.adc_max_v);
    let v_cell = v_adc / cal.gain_loadcell;
    (v_cell - cal.load_cell_offset_v) / (cal.load_cell_const * cal.excitation_v)
}

/// Foot sensor conductance per unit area for an averaged raw count.
pub fn foot_sensor_value(cal: &Calibration, r2: f32, avg_counts: f32) -> f32 {
    let v = counts_to_volts(avg_counts, cal.adc_resolution, cal.adc_max_v) * cal.gain_toe_heel;
    if v <= 0.0 {
        return 0.0;
    }
    let r_fsr = (cal.excitation_v * r2 / v - r2 - cal.foot_sensor_internal_res).max(1.0);
    (1.0e6 / r_fsr) / cal.foot_sensor_area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;
    use crate::hw::sim::{foot_counts, load_cell_counts};
    use crate::hw::SimRig;

    fn reader(rig: &SimRig) -> SensorReader<crate::hw::sim::SimAdc> {
        let config = RigConfig::default();
        SensorReader::new(rig.adc(), config.calibration, config.pins, 4)
    }

    #[test]
    fn load_cell_conversion_matches_calibration() {
        let cal = Calibration::default();
        // Zero load reads the intercept voltage.
        let zero = cal.load_cell_offset_v * cal.gain_loadcell / cal.adc_max_v * 4096.0;
        assert!(load_cell_force(&cal, zero).abs() < 1e-3);

        let counts = load_cell_counts(&cal, 40.0) as f32;
        assert!((load_cell_force(&cal, counts) - 40.0).abs() < 0.2);
    }

    #[test]
    fn unloaded_foot_sensor_reads_zero() {
        let cal = Calibration::default();
        assert_eq!(foot_sensor_value(&cal, cal.r2_toe, 0.0), 0.0);
    }

    #[test]
    fn foot_sensor_value_is_monotonic() {
        let cal = Calibration::default();
        let mut last = 0.0;
        for counts in (100..4000).step_by(300) {
            let value = foot_sensor_value(&cal, cal.r2_heel, counts as f32);
            assert!(value >= last);
            last = value;
        }
    }

    #[test]
    fn reads_a_sample_through_the_pin_map() {
        let rig = SimRig::new();
        let cal = Calibration::default();
        rig.set_adc(1, load_cell_counts(&cal, 25.0));
        rig.set_adc(5, foot_counts(&cal, cal.r2_toe, 2.0));
        rig.set_adc(4, 0);

        let reading = reader(&rig).read(SampleId::B).unwrap();
        assert!((reading.force - 25.0).abs() < 0.2);
        assert!((reading.toe - 2.0).abs() < 0.1);
        assert_eq!(reading.heel, 0.0);
    }

    #[test]
    fn load_cell_rails_are_saturated() {
        let rig = SimRig::new();
        let mut reader = reader(&rig);

        rig.set_adc(0, 0);
        assert!(matches!(
            reader.read_force(SampleId::A),
            Err(SensorError::Saturated { channel: 0, .. })
        ));

        rig.set_adc(0, 4095);
        assert!(matches!(
            reader.read_force(SampleId::A),
            Err(SensorError::Saturated { raw: 4095, .. })
        ));
    }

    #[test]
    fn foot_sensor_top_rail_is_saturated() {
        let rig = SimRig::new();
        rig.set_adc(3, 4095);
        assert!(matches!(
            reader(&rig).read_pad(SampleId::A, Pad::Toe),
            Err(SensorError::Saturated { channel: 3, .. })
        ));
    }

    /// Replays a fixed sequence of conversions on every channel.
    struct Scripted {
        raw: Vec<u16>,
        next: usize,
    }

    impl Scripted {
        fn new(raw: &[u16]) -> Self {
            Self {
                raw: raw.to_vec(),
                next: 0,
            }
        }
    }

    impl AdcRead for Scripted {
        fn read_channel(&mut self, _ch: u8) -> nb::Result<u16, HwError> {
            let raw = self.raw[self.next % self.raw.len()];
            self.next += 1;
            Ok(raw)
        }
    }

    fn scripted(raw: &[u16]) -> SensorReader<Scripted> {
        let config = RigConfig::default();
        SensorReader::new(Scripted::new(raw), config.calibration, config.pins, 4)
    }

    #[test]
    fn one_railed_conversion_rejects_the_load_cell_reading() {
        assert_eq!(
            scripted(&[4095, 2000, 2000, 2000]).read_force(SampleId::A),
            Err(SensorError::Saturated {
                channel: 0,
                raw: 4095
            })
        );
        assert_eq!(
            scripted(&[300, 300, 0, 300]).read_force(SampleId::B),
            Err(SensorError::Saturated { channel: 1, raw: 0 })
        );
        assert!(scripted(&[1, 2000, 2000, 4094]).read_force(SampleId::A).is_ok());
    }

    #[test]
    fn foot_sensor_rejects_only_top_rail_conversions() {
        assert_eq!(
            scripted(&[300, 4095, 300, 300]).read_pad(SampleId::A, Pad::Heel),
            Err(SensorError::Saturated {
                channel: 2,
                raw: 4095
            })
        );
        assert!(scripted(&[0, 300, 0, 300])
            .read_pad(SampleId::A, Pad::Toe)
            .is_ok());
    }

    #[test]
    fn buffer_size_is_capped() {
        let config = RigConfig::default();
        let reader = SensorReader::new(
            Scripted::new(&[100]),
            config.calibration,
            config.pins,
            MAX_ADC_BUFFER_SIZE * 10,
        );
        assert_eq!(reader.buffer_size, MAX_ADC_BUFFER_SIZE);
    }

    #[test]
    fn pending_conversion_is_not_ready() {
        let rig = SimRig::new();
        rig.set_adc(0, 1000);
        rig.set_not_ready(0, true);
        assert_eq!(
            reader(&rig).read_force(SampleId::A),
            Err(SensorError::NotReady { channel: 0 })
        );
    }
}
