//! Waveform generation: analytic pulse shapes, library lookups and phase rotation.

pub(crate) mod sampling;
pub(crate) mod templates;

pub use sampling::{apply_phase, time_tags};
pub use templates::*;

/// A library pulse names a waveform that the job's waveform library does not contain.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("waveform {name:?} is not defined in the job's waveform library")]
pub struct WaveformLookupError {
    pub name: String,
}
