//! Operations on sequences of IQ samples.

use ndarray::Array1;
use num_complex::Complex64;

use crate::units::Radians;

const J: Complex64 = Complex64::new(0f64, 1f64);

/// Rotate waveform IQ data in place by `e^{i·phase}`.
pub fn apply_phase(iq_values: &mut [Complex64], phase: Radians<f64>) {
    if phase.0 == 0.0 {
        return;
    }
    let rotation = (J * phase.0).exp();
    for value in iq_values.iter_mut() {
        *value *= rotation;
    }
}

/// Linearly spaced time tags, in seconds, for `sample_count` samples spanning `duration`.
///
/// The first tag is always `0` and the last is `duration`, matching an interpolated waveform
/// whose samples cover the whole operation.
pub fn time_tags(duration: f64, sample_count: usize) -> Vec<f64> {
    match sample_count {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => Array1::linspace(0.0, duration, sample_count).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn apply_phase_rotates() {
        let mut samples = vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.5)];
        apply_phase(&mut samples, Radians(FRAC_PI_2));
        assert_relative_eq!(samples[0], Complex64::new(0.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(samples[1], Complex64::new(-0.5, 0.0), epsilon = 1e-12);

        apply_phase(&mut samples, Radians(PI));
        assert_relative_eq!(samples[0], Complex64::new(0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn zero_phase_is_identity() {
        let mut samples = vec![Complex64::new(0.3, -0.2)];
        apply_phase(&mut samples, Radians(0.0));
        assert_eq!(samples, vec![Complex64::new(0.3, -0.2)]);
    }

    #[rstest::rstest]
    #[case(16e-9, 0, vec![])]
    #[case(16e-9, 1, vec![0.0])]
    #[case(16e-9, 3, vec![0.0, 8e-9, 16e-9])]
    fn time_tags_span_duration(
        #[case] duration: f64,
        #[case] count: usize,
        #[case] expected: Vec<f64>,
    ) {
        let tags = time_tags(duration, count);
        assert_eq!(tags.len(), expected.len());
        for (tag, expected) in tags.iter().zip(expected) {
            assert_relative_eq!(*tag, expected, epsilon = 1e-18);
        }
    }
}
