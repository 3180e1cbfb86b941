//! Units of time, phase and frequency used throughout the compiler.
//!
//! Wire instructions express time in nanoseconds as floating-point values. Internally, all
//! timestamps and durations are held as integer [`Picoseconds`] so that grid alignment and gap
//! computation are exact; rendered operations convert back to seconds.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Picoseconds per nanosecond.
const PS_PER_NS: f64 = 1_000.0;

/// Seconds per picosecond.
const S_PER_PS: f64 = 1e-12;

/// Hertz per gigahertz.
pub const HZ_PER_GHZ: f64 = 1e9;

/// An angle, in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Radians<T>(pub T);

/// A non-negative span or instant of time, in integer picoseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Picoseconds(pub u64);

impl Picoseconds {
    pub const ZERO: Self = Self(0);

    /// Convert a nanosecond value to signed picoseconds, rounding to the nearest picosecond.
    ///
    /// Returns `None` if the value is not finite or does not fit in an `i64`.
    pub fn signed_from_nanoseconds(nanoseconds: f64) -> Option<i64> {
        if !nanoseconds.is_finite() {
            return None;
        }
        let picoseconds = (nanoseconds * PS_PER_NS).round();
        if picoseconds < i64::MIN as f64 || picoseconds > i64::MAX as f64 {
            return None;
        }
        Some(picoseconds as i64)
    }

    pub fn from_nanoseconds_unchecked(nanoseconds: u64) -> Self {
        Self(nanoseconds * 1_000)
    }

    pub fn as_nanoseconds(self) -> f64 {
        self.0 as f64 / PS_PER_NS
    }

    pub fn as_seconds(self) -> f64 {
        self.0 as f64 * S_PER_PS
    }

    /// Subtract, returning the signed difference in picoseconds, saturated to the range of `i64`.
    pub fn signed_difference(self, rhs: Self) -> i64 {
        let difference = i128::from(self.0) - i128::from(rhs.0);
        difference.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }
}

impl Add for Picoseconds {
    type Output = Picoseconds;

    fn add(self, rhs: Picoseconds) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Picoseconds {
    type Output = Picoseconds;

    fn sub(self, rhs: Picoseconds) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Picoseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ns", self.as_nanoseconds())
    }
}
