// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Sample channel identity.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two parallel test channels on the stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SampleId {
    A,
    B,
}

impl SampleId {
    pub const ALL: [SampleId; 2] = [SampleId::A, SampleId::B];

    /// Array index for per-sample tables.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            SampleId::A => 0,
            SampleId::B => 1,
        }
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        match idx {
            0 => Some(SampleId::A),
            1 => Some(SampleId::B),
            _ => None,
        }
    }

    /// The first `n` samples (1 or 2).
    pub fn first(n: u8) -> &'static [SampleId] {
        match n {
            0 => &[],
            1 => &Self::ALL[..1],
            _ => &Self::ALL[..],
        }
    }

    pub fn letter(self) -> char {
        match self {
            SampleId::A => 'A',
            SampleId::B => 'B',
        }
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for SampleId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" | "1" => Ok(SampleId::A),
            "B" | "b" | "2" => Ok(SampleId::B),
            _ => Err(()),
        }
    }
}
