// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Analog input boundary.
//!
//! The rig's ADC driver lives outside this crate. It only has to hand back single raw conversions
//! without blocking: a conversion that is not ready yet is reported as `nb::Error::WouldBlock`,
//! which the sensor pipeline treats as a missed reading rather than spinning on it.
//!
//! Example:
//! ```no_run
//! # use footstand::hw::AdcRead;
//! # fn demo(adc: &mut impl AdcRead) {
//! let raw = adc.read_channel(3);
//! # }
//! ```

use crate::error::HwError;

/// Trait for reading a single channel from an ADC peripheral.
pub trait AdcRead {
    /// Read one raw conversion (0..=4095 on a 12-bit converter).
    fn read_channel(&mut self, ch: u8) -> nb::Result<u16, HwError>;
}

impl<T: AdcRead + ?Sized> AdcRead for &mut T {
    fn read_channel(&mut self, ch: u8) -> nb::Result<u16, HwError> {
        (**self).read_channel(ch)
    }
}

/// Convert raw counts to the voltage seen at the ADC pin.
#[inline]
pub fn counts_to_volts(raw: f32, resolution: u16, max_v: f32) -> f32 {
    raw / resolution as f32 * max_v
}
