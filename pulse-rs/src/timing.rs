//! Alignment of raw timestamps and durations to the control hardware's execution grid.
//!
//! Control electronics can only start and stop operations on an equidistant time grid; every
//! timestamp and duration the compiler emits is snapped forward to the next grid line.

use crate::units::Picoseconds;

/// Grid interval of the Q1 sequencer: every instruction's execution time is a multiple of 4 ns.
pub const DEFAULT_GRID_INTERVAL_NS: f64 = 4.0;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridAlignmentError {
    #[error("cannot align negative time {time} ps to the execution grid")]
    Negative { time: i64 },

    #[error("cannot align non-finite time {nanoseconds} ns to the execution grid")]
    NotFinite { nanoseconds: String },

    #[error("time {nanoseconds} ns is too large to represent in picoseconds")]
    OutOfRange { nanoseconds: String },

    #[error("the execution grid interval must be positive")]
    ZeroInterval,
}

pub type GridAlignmentResult<T> = Result<T, GridAlignmentError>;

/// Convert wire nanoseconds to signed picoseconds, naming why a value can't be represented.
fn to_picoseconds(nanoseconds: f64) -> GridAlignmentResult<i64> {
    Picoseconds::signed_from_nanoseconds(nanoseconds).ok_or_else(|| {
        let nanoseconds_text = nanoseconds.to_string();
        if nanoseconds.is_finite() {
            GridAlignmentError::OutOfRange {
                nanoseconds: nanoseconds_text,
            }
        } else {
            GridAlignmentError::NotFinite {
                nanoseconds: nanoseconds_text,
            }
        }
    })
}

/// Snap `time` forward to the next multiple of `grid`, both in the same integer unit.
///
/// The result `t'` satisfies `t' >= time`, `t' - time < grid`, and `align(t', grid) == t'`.
/// Negative times are rejected rather than relying on the sign convention of a modulo operator.
pub fn align(time: i64, grid: u64) -> GridAlignmentResult<u64> {
    if grid == 0 {
        return Err(GridAlignmentError::ZeroInterval);
    }
    if time < 0 {
        return Err(GridAlignmentError::Negative { time });
    }
    let time = time as u64;
    let grid_remainder = (grid - time % grid) % grid;
    Ok(time + grid_remainder)
}

/// Converts wire-level nanosecond values into grid-aligned [`Picoseconds`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridAligner {
    interval: Picoseconds,
}

impl GridAligner {
    pub fn new(interval: Picoseconds) -> GridAlignmentResult<Self> {
        if interval == Picoseconds::ZERO {
            return Err(GridAlignmentError::ZeroInterval);
        }
        Ok(Self { interval })
    }

    pub fn from_nanoseconds(interval_ns: f64) -> GridAlignmentResult<Self> {
        let interval = to_picoseconds(interval_ns)?;
        if interval <= 0 {
            return Err(GridAlignmentError::ZeroInterval);
        }
        Self::new(Picoseconds(interval as u64))
    }

    pub fn interval(&self) -> Picoseconds {
        self.interval
    }

    pub fn align(&self, time: Picoseconds) -> Picoseconds {
        // A non-negative input with a non-zero grid cannot fail.
        let remainder = (self.interval.0 - time.0 % self.interval.0) % self.interval.0;
        Picoseconds(time.0 + remainder)
    }

    /// Convert a raw nanosecond value and align it to the grid.
    pub fn align_nanoseconds(&self, nanoseconds: f64) -> GridAlignmentResult<Picoseconds> {
        align(to_picoseconds(nanoseconds)?, self.interval.0).map(Picoseconds)
    }
}

impl Default for GridAligner {
    fn default() -> Self {
        Self {
            interval: Picoseconds::from_nanoseconds_unchecked(DEFAULT_GRID_INTERVAL_NS as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 4, 0)]
    #[case(1, 4, 4)]
    #[case(3, 4, 4)]
    #[case(4, 4, 4)]
    #[case(5, 4, 8)]
    #[case(7, 1, 7)]
    #[case(10, 3, 12)]
    fn align_snaps_forward(#[case] time: i64, #[case] grid: u64, #[case] expected: u64) {
        assert_eq!(align(time, grid), Ok(expected));
    }

    #[test]
    fn negative_time_is_rejected() {
        assert_eq!(align(-1, 4), Err(GridAlignmentError::Negative { time: -1 }));
    }

    #[test]
    fn zero_grid_is_rejected() {
        assert_eq!(align(3, 0), Err(GridAlignmentError::ZeroInterval));
        assert_eq!(
            GridAligner::from_nanoseconds(0.0),
            Err(GridAlignmentError::ZeroInterval)
        );
    }

    #[test]
    fn aligner_converts_nanoseconds() {
        let aligner = GridAligner::from_nanoseconds(4.0).unwrap();
        assert_eq!(aligner.align_nanoseconds(3.0), Ok(Picoseconds(4_000)));
        assert_eq!(aligner.align_nanoseconds(4.0), Ok(Picoseconds(4_000)));
        assert_eq!(aligner.align_nanoseconds(4.2), Ok(Picoseconds(8_000)));
        assert!(matches!(
            aligner.align_nanoseconds(-0.5),
            Err(GridAlignmentError::Negative { time: -500 })
        ));
        assert!(matches!(
            aligner.align_nanoseconds(f64::NAN),
            Err(GridAlignmentError::NotFinite { .. })
        ));
        assert!(matches!(
            aligner.align_nanoseconds(1e300),
            Err(GridAlignmentError::OutOfRange { .. })
        ));
        assert!(matches!(
            GridAligner::from_nanoseconds(f64::INFINITY),
            Err(GridAlignmentError::NotFinite { .. })
        ));
    }

    proptest! {
        #[test]
        fn align_is_bounded_and_idempotent(time in 0i64..1_000_000_000, grid in 1u64..10_000) {
            let aligned = align(time, grid).unwrap();
            prop_assert!(aligned >= time as u64);
            prop_assert!(aligned - (time as u64) < grid);
            prop_assert_eq!(aligned % grid, 0);
            prop_assert_eq!(align(aligned as i64, grid).unwrap(), aligned);
        }

        #[test]
        fn aligner_agrees_with_align(time in 0u64..1_000_000_000, grid in 1u64..10_000) {
            let aligner = GridAligner::new(Picoseconds(grid)).unwrap();
            prop_assert_eq!(aligner.align(Picoseconds(time)).0, align(time as i64, grid).unwrap());
        }
    }
}
