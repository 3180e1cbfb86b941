//! Analytic pulse shapes that parametric pulses are evaluated from.
//!
//! All shape parameters are expressed in samples once resolved; wire values in nanoseconds are
//! converted using the sample period when a [`ParametricShape`] is built from wire parameters.

use std::str::FromStr;

use ndarray::Array;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf;

use crate::job::{ParameterValue, Parameters};
use crate::units::Picoseconds;

/// A custom `ceil()` method that includes a machine-epsilon sized region above each integer in the
/// set of values that are mapped to that integer. In other words:
/// ceil_eps(x) = n, for all x and integers n s.t. n <= x < (n + n*epsilon)
///
/// To handle accumulated floating point errors in unit conversions above typical floating point
/// imprecision we make epsilon 10x larger than floating point epsilon.
fn ceiling_with_epsilon(value: f64) -> f64 {
    let truncated = value - (value * 10.0 * f64::EPSILON);
    truncated.ceil()
}

pub trait WaveformTemplate {
    fn into_iq_values(self) -> Vec<Complex64>;
}

/// The names under which analytic generators can be requested.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum PulseShape {
    #[strum(to_string = "constant")]
    Constant,
    #[strum(to_string = "gaussian")]
    Gaussian,
    #[strum(to_string = "gaussian_square", serialize = "gaussiansquare")]
    GaussianSquare,
    #[strum(to_string = "drag")]
    Drag,
    #[strum(to_string = "erf_square", serialize = "erfsquare")]
    ErfSquare,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("unknown pulse shape {0:?}")]
    UnknownShape(String),

    #[error("pulse shape {shape} requires parameter {parameter:?}")]
    MissingParameter {
        shape: PulseShape,
        parameter: &'static str,
    },

    #[error("parameter {parameter:?} of pulse shape {shape} is invalid: {reason}")]
    InvalidParameter {
        shape: PulseShape,
        parameter: &'static str,
        reason: String,
    },
}

/// Zero-ended Gaussian samples of unit height, sampled at sample midpoints.
///
/// The curve is lifted so that it would reach zero one sample beyond either edge of `width`
/// samples centered on `center`, then rescaled so that its peak is exactly one.
fn zeroed_gaussian(times: &[f64], center: f64, sigma: f64, zeroed_half_width: f64) -> Vec<f64> {
    let gaussian = |t: f64| (-0.5 * ((t - center) / sigma).powi(2)).exp();
    let edge = (-0.5 * (zeroed_half_width / sigma).powi(2)).exp();
    times
        .iter()
        .map(|&t| (gaussian(t) - edge) / (1.0 - edge))
        .collect()
}

fn midpoint_times(duration: usize) -> Vec<f64> {
    (Array::<f64, _>::range(0f64, duration as f64, 1f64) + 0.5).to_vec()
}

/// A flat pulse of constant amplitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    /// Number of samples
    pub duration: usize,
    /// Complex amplitude
    pub amp: Complex64,
}

impl WaveformTemplate for Constant {
    fn into_iq_values(self) -> Vec<Complex64> {
        vec![self.amp; self.duration]
    }
}

/// Creates a waveform with a Gaussian shape, centered on the pulse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gaussian {
    /// Number of samples
    pub duration: usize,
    /// Complex amplitude at the peak
    pub amp: Complex64,
    /// Standard deviation (samples)
    pub sigma: f64,
}

impl WaveformTemplate for Gaussian {
    fn into_iq_values(self) -> Vec<Complex64> {
        let times = midpoint_times(self.duration);
        let center = self.duration as f64 / 2.0;
        zeroed_gaussian(&times, center, self.sigma, center + 1.0)
            .into_iter()
            .map(|el| self.amp * el)
            .collect()
    }
}

/// Creates a square pulse with Gaussian rise and fall.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianSquare {
    /// Number of samples
    pub duration: usize,
    /// Complex amplitude of the flat top
    pub amp: Complex64,
    /// Standard deviation of the rise and fall (samples)
    pub sigma: f64,
    /// Width of the flat top (samples)
    pub width: f64,
}

impl WaveformTemplate for GaussianSquare {
    fn into_iq_values(self) -> Vec<Complex64> {
        let risefall = (self.duration as f64 - self.width) / 2.0;
        let rise_center = risefall;
        let fall_center = risefall + self.width;
        midpoint_times(self.duration)
            .into_iter()
            .map(|t| {
                let envelope = if t < rise_center {
                    zeroed_gaussian(&[t], rise_center, self.sigma, risefall + 1.0)[0]
                } else if t > fall_center {
                    zeroed_gaussian(&[t], fall_center, self.sigma, risefall + 1.0)[0]
                } else {
                    1.0
                };
                self.amp * envelope
            })
            .collect()
    }
}

/// Creates a waveform with a DRAG-corrected Gaussian shape.
///
/// This is a Gaussian shape with an additional imaginary component proportional to the time
/// derivative of the main Gaussian pulse.
///
/// See Motzoi F. et al., Phys. Rev. Lett., 103 (2009) 110501. for details.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Drag {
    /// Number of samples
    pub duration: usize,
    /// Complex amplitude at the peak
    pub amp: Complex64,
    /// Standard deviation (samples)
    pub sigma: f64,
    /// DRAG coefficient - controls strength of the derivative term
    pub beta: f64,
}

impl WaveformTemplate for Drag {
    fn into_iq_values(self) -> Vec<Complex64> {
        let times = midpoint_times(self.duration);
        let center = self.duration as f64 / 2.0;
        let gaussian = zeroed_gaussian(&times, center, self.sigma, center + 1.0);
        times
            .iter()
            .zip(gaussian)
            .map(|(t, g)| {
                let derivative = -(t - center) / self.sigma.powi(2) * g;
                self.amp * Complex64::new(g, self.beta * derivative)
            })
            .collect()
    }
}

/// Creates a waveform with a flat top and edges that are error functions (erfs).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErfSquare {
    /// Number of samples, padding included
    pub duration: usize,
    /// Complex amplitude of the flat top
    pub amp: Complex64,
    /// Slope of erf shoulders (2x FWHM of erf, samples)
    pub risetime: f64,
    /// Length of zero padding to add to beginning of pulse (samples)
    pub pad_left: f64,
    /// Length of zero padding to add to end of pulse (samples)
    pub pad_right: f64,
    /// Toggle for positive/negative polarity
    pub positive_polarity: bool,
}

impl WaveformTemplate for ErfSquare {
    fn into_iq_values(self) -> Vec<Complex64> {
        let pad_left = self.pad_left.ceil() as usize;
        let pad_right = self.pad_right.ceil() as usize;
        let body = self.duration.saturating_sub(pad_left + pad_right);
        let mut time_steps = Array::<f64, _>::range(0f64, body as f64, 1f64);

        let fwhm = 0.5 * self.risetime;
        let t1 = fwhm;
        let t2 = body as f64 - fwhm;
        let sigma = 0.5 * fwhm / (2f64 * 2f64.ln()).sqrt();
        time_steps.mapv_inplace(|el| 0.5 * (erf((el - t1) / sigma) - erf((el - t2) / sigma)));
        if !self.positive_polarity {
            time_steps *= -1f64;
        }

        let zero = Complex64::new(0f64, 0f64);
        let mut waveform = vec![zero; pad_left.min(self.duration)];
        waveform.extend(time_steps.into_iter().map(|el| self.amp * el));
        waveform.resize(self.duration, zero);
        waveform
    }
}

/// A fully resolved analytic generator, ready to be evaluated into samples.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ParametricShape {
    Constant(Constant),
    Gaussian(Gaussian),
    GaussianSquare(GaussianSquare),
    Drag(Drag),
    ErfSquare(ErfSquare),
}

/// Reads shape parameters from the wire, converting nanosecond values into samples.
struct ParameterReader<'a> {
    shape: PulseShape,
    parameters: &'a Parameters,
    sample_period_ns: f64,
}

impl ParameterReader<'_> {
    fn value(&self, parameter: &'static str) -> Result<&ParameterValue, ShapeError> {
        self.parameters
            .get(parameter)
            .ok_or(ShapeError::MissingParameter {
                shape: self.shape,
                parameter,
            })
    }

    fn invalid(&self, parameter: &'static str, reason: impl Into<String>) -> ShapeError {
        ShapeError::InvalidParameter {
            shape: self.shape,
            parameter,
            reason: reason.into(),
        }
    }

    fn real(&self, parameter: &'static str) -> Result<f64, ShapeError> {
        self.value(parameter)?
            .as_real()
            .filter(|value| value.is_finite())
            .ok_or_else(|| self.invalid(parameter, "expected a finite real number"))
    }

    fn complex(&self, parameter: &'static str) -> Result<Complex64, ShapeError> {
        self.value(parameter)?
            .as_complex()
            .filter(|value| value.is_finite())
            .ok_or_else(|| self.invalid(parameter, "expected a finite number"))
    }

    /// A time parameter in nanoseconds, converted to (fractional) samples.
    fn samples(&self, parameter: &'static str) -> Result<f64, ShapeError> {
        let value = self.real(parameter)?;
        if value < 0.0 {
            return Err(self.invalid(parameter, "must not be negative"));
        }
        Ok(value / self.sample_period_ns)
    }

    fn optional_samples(&self, parameter: &'static str) -> Result<f64, ShapeError> {
        match self.parameters.get(parameter) {
            Some(_) => self.samples(parameter),
            None => Ok(0.0),
        }
    }

    fn positive_samples(&self, parameter: &'static str) -> Result<f64, ShapeError> {
        let value = self.samples(parameter)?;
        if value == 0.0 {
            return Err(self.invalid(parameter, "must be positive"));
        }
        Ok(value)
    }

    fn sample_count(&self, max_samples: usize) -> Result<usize, ShapeError> {
        let count = ceiling_with_epsilon(self.samples("duration")?);
        if count > max_samples as f64 {
            return Err(self.invalid(
                "duration",
                format!("renders to {count} samples, more than the limit of {max_samples}"),
            ));
        }
        Ok(count as usize)
    }
}

impl ParametricShape {
    /// Resolve a generator by name and bind its parameters.
    ///
    /// Every shape requires `duration`; time-like parameters are given in nanoseconds and the
    /// generator produces one sample per `sample_period`, at most `max_samples` of them.
    pub fn from_parameters(
        pulse_shape: &str,
        parameters: &Parameters,
        sample_period: Picoseconds,
        max_samples: usize,
    ) -> Result<Self, ShapeError> {
        let shape = PulseShape::from_str(pulse_shape)
            .map_err(|_| ShapeError::UnknownShape(pulse_shape.to_string()))?;
        let reader = ParameterReader {
            shape,
            parameters,
            sample_period_ns: sample_period.as_nanoseconds(),
        };

        let duration = reader.sample_count(max_samples)?;
        let amp = reader.complex("amp")?;

        Ok(match shape {
            PulseShape::Constant => Self::Constant(Constant { duration, amp }),
            PulseShape::Gaussian => Self::Gaussian(Gaussian {
                duration,
                amp,
                sigma: reader.positive_samples("sigma")?,
            }),
            PulseShape::GaussianSquare => {
                let width = reader.samples("width")?;
                if width > duration as f64 {
                    return Err(reader.invalid("width", "exceeds the pulse duration"));
                }
                Self::GaussianSquare(GaussianSquare {
                    duration,
                    amp,
                    sigma: reader.positive_samples("sigma")?,
                    width,
                })
            }
            PulseShape::Drag => Self::Drag(Drag {
                duration,
                amp,
                sigma: reader.positive_samples("sigma")?,
                beta: reader.real("beta")?,
            }),
            PulseShape::ErfSquare => Self::ErfSquare(ErfSquare {
                duration,
                amp,
                risetime: reader.positive_samples("risetime")?,
                pad_left: reader.optional_samples("pad_left")?,
                pad_right: reader.optional_samples("pad_right")?,
                positive_polarity: match parameters.get("positive_polarity") {
                    Some(value) => value
                        .as_flag()
                        .ok_or_else(|| reader.invalid("positive_polarity", "expected a boolean"))?,
                    None => true,
                },
            }),
        })
    }

    pub fn pulse_shape(&self) -> PulseShape {
        match self {
            Self::Constant(_) => PulseShape::Constant,
            Self::Gaussian(_) => PulseShape::Gaussian,
            Self::GaussianSquare(_) => PulseShape::GaussianSquare,
            Self::Drag(_) => PulseShape::Drag,
            Self::ErfSquare(_) => PulseShape::ErfSquare,
        }
    }

    /// Evaluate the generator into a sample array.
    pub fn samples(&self) -> Vec<Complex64> {
        match *self {
            Self::Constant(shape) => shape.into_iq_values(),
            Self::Gaussian(shape) => shape.into_iq_values(),
            Self::GaussianSquare(shape) => shape.into_iq_values(),
            Self::Drag(shape) => shape.into_iq_values(),
            Self::ErfSquare(shape) => shape.into_iq_values(),
        }
    }

    /// Equality which treats all NaNs as equal, so that instructions holding shapes are [`Eq`].
    pub(crate) fn reflexive_eq(&self, other: &Self) -> bool {
        use crate::floating_point_eq::{complex64, f64 as real};

        match (self, other) {
            (Self::Constant(l), Self::Constant(r)) => {
                l.duration == r.duration && complex64::eq(l.amp, r.amp)
            }
            (Self::Gaussian(l), Self::Gaussian(r)) => {
                l.duration == r.duration
                    && complex64::eq(l.amp, r.amp)
                    && real::eq(l.sigma, r.sigma)
            }
            (Self::GaussianSquare(l), Self::GaussianSquare(r)) => {
                l.duration == r.duration
                    && complex64::eq(l.amp, r.amp)
                    && real::eq(l.sigma, r.sigma)
                    && real::eq(l.width, r.width)
            }
            (Self::Drag(l), Self::Drag(r)) => {
                l.duration == r.duration
                    && complex64::eq(l.amp, r.amp)
                    && real::eq(l.sigma, r.sigma)
                    && real::eq(l.beta, r.beta)
            }
            (Self::ErfSquare(l), Self::ErfSquare(r)) => {
                l.duration == r.duration
                    && complex64::eq(l.amp, r.amp)
                    && real::eq(l.risetime, r.risetime)
                    && real::eq(l.pad_left, r.pad_left)
                    && real::eq(l.pad_right, r.pad_right)
                    && l.positive_polarity == r.positive_polarity
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    const ONE_NS: Picoseconds = Picoseconds(1_000);
    const MAX_SAMPLES: usize = 1_024;

    fn parameters(values: &[(&str, ParameterValue)]) -> Parameters {
        values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(0.0-f64::EPSILON, 0.0)]
    #[case(0.0+f64::EPSILON, 1.0)]
    // Based on a past edge case
    #[case(8.800_000_000_000_001e-8 * 1.0e9, 88.0)]
    fn ceiling_with_epsilon(#[case] value: f64, #[case] expected: f64) {
        let result = super::ceiling_with_epsilon(value);
        assert_eq!(result, expected);
    }

    #[rstest]
    #[case("gaussian", PulseShape::Gaussian)]
    #[case("Gaussian", PulseShape::Gaussian)]
    #[case("GaussianSquare", PulseShape::GaussianSquare)]
    #[case("gaussian_square", PulseShape::GaussianSquare)]
    #[case("DRAG", PulseShape::Drag)]
    #[case("constant", PulseShape::Constant)]
    #[case("erf_square", PulseShape::ErfSquare)]
    fn pulse_shape_names(#[case] name: &str, #[case] expected: PulseShape) {
        assert_eq!(PulseShape::from_str(name), Ok(expected));
    }

    #[test]
    fn unknown_shape() {
        assert_eq!(
            ParametricShape::from_parameters("sech", &Parameters::new(), ONE_NS, MAX_SAMPLES),
            Err(ShapeError::UnknownShape("sech".to_string()))
        );
    }

    #[test]
    fn missing_parameter() {
        let params = parameters(&[
            ("duration", ParameterValue::Real(16.0)),
            ("amp", ParameterValue::Real(0.5)),
        ]);
        assert_eq!(
            ParametricShape::from_parameters("gaussian", &params, ONE_NS, MAX_SAMPLES),
            Err(ShapeError::MissingParameter {
                shape: PulseShape::Gaussian,
                parameter: "sigma"
            })
        );
    }

    #[test]
    fn gaussian_is_symmetric_and_peaks_at_amp() {
        let params = parameters(&[
            ("duration", ParameterValue::Real(16.0)),
            ("amp", ParameterValue::Complex(Complex64::new(0.0, 0.5))),
            ("sigma", ParameterValue::Real(4.0)),
        ]);
        let shape =
            ParametricShape::from_parameters("gaussian", &params, ONE_NS, MAX_SAMPLES).unwrap();
        let samples = shape.samples();

        assert_eq!(samples.len(), 16);
        for i in 0..8 {
            assert_relative_eq!(samples[i], samples[15 - i], epsilon = 1e-12);
        }
        let peak = samples.iter().map(|s| s.norm()).fold(0.0, f64::max);
        assert!(peak <= 0.5 + 1e-12);
        assert!(peak > 0.45);
        assert!(samples[0].norm() < samples[7].norm());
        assert!(samples.iter().all(|s| s.re.abs() < 1e-12));
    }

    #[test]
    fn sample_period_scales_duration() {
        let params = parameters(&[
            ("duration", ParameterValue::Real(16.0)),
            ("amp", ParameterValue::Real(1.0)),
        ]);
        let shape = ParametricShape::from_parameters(
            "constant",
            &params,
            Picoseconds(2_000),
            MAX_SAMPLES,
        )
        .unwrap();
        assert_eq!(shape.samples(), vec![Complex64::new(1.0, 0.0); 8]);
    }

    #[rstest]
    #[case(1_024.0, true)]
    #[case(1_025.0, false)]
    #[case(1e10, false)]
    fn duration_is_bounded(#[case] duration: f64, #[case] accepted: bool) {
        let params = parameters(&[
            ("duration", ParameterValue::Real(duration)),
            ("amp", ParameterValue::Real(1.0)),
        ]);
        match ParametricShape::from_parameters("constant", &params, ONE_NS, MAX_SAMPLES) {
            Ok(shape) => {
                assert!(accepted);
                assert_eq!(shape.samples().len(), MAX_SAMPLES);
            }
            Err(error) => {
                assert!(!accepted);
                assert!(matches!(
                    error,
                    ShapeError::InvalidParameter {
                        shape: PulseShape::Constant,
                        parameter: "duration",
                        ..
                    }
                ));
            }
        }
    }

    #[test]
    fn gaussian_square_has_flat_top() {
        let shape = GaussianSquare {
            duration: 40,
            amp: Complex64::new(0.25, 0.0),
            sigma: 3.0,
            width: 20.0,
        };
        let samples = shape.into_iq_values();
        assert_eq!(samples.len(), 40);
        for sample in &samples[10..30] {
            assert_relative_eq!(*sample, Complex64::new(0.25, 0.0));
        }
        assert!(samples[0].re < 0.25);
    }

    #[test]
    fn gaussian_square_rejects_wide_top() {
        let params = parameters(&[
            ("duration", ParameterValue::Real(16.0)),
            ("amp", ParameterValue::Real(1.0)),
            ("sigma", ParameterValue::Real(2.0)),
            ("width", ParameterValue::Real(20.0)),
        ]);
        assert!(matches!(
            ParametricShape::from_parameters("gaussian_square", &params, ONE_NS, MAX_SAMPLES),
            Err(ShapeError::InvalidParameter {
                parameter: "width",
                ..
            })
        ));
    }

    #[test]
    fn drag_derivative_is_antisymmetric() {
        let shape = Drag {
            duration: 20,
            amp: Complex64::new(1.0, 0.0),
            sigma: 4.0,
            beta: 0.5,
        };
        let samples = shape.into_iq_values();
        for i in 0..10 {
            assert_relative_eq!(samples[i].re, samples[19 - i].re, epsilon = 1e-12);
            assert_relative_eq!(samples[i].im, -samples[19 - i].im, epsilon = 1e-12);
        }
        assert!(samples[0].im > 0.0);
    }

    #[test]
    fn erf_square_padding_and_polarity() {
        let shape = ErfSquare {
            duration: 130,
            amp: Complex64::new(1.0, 0.0),
            risetime: 10.0,
            pad_left: 10.0,
            pad_right: 20.0,
            positive_polarity: false,
        };
        let samples = shape.into_iq_values();
        assert_eq!(samples.len(), 130);
        assert!(samples[..10].iter().all(|s| *s == Complex64::new(0.0, 0.0)));
        assert!(samples[110..].iter().all(|s| *s == Complex64::new(0.0, 0.0)));
        assert_relative_eq!(samples[60].re, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn reflexive_eq_treats_nan_as_equal() {
        let shape = ParametricShape::Gaussian(Gaussian {
            duration: 4,
            amp: Complex64::new(f64::NAN, 0.0),
            sigma: 1.0,
        });
        assert!(shape.reflexive_eq(&shape));
        assert_ne!(shape, shape);
    }
}
