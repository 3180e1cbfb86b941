//! The wire-level job descriptor accepted by the compiler.
//!
//! A job is a header, an unordered list of loosely time-stamped [`WireInstruction`]s and a
//! [`JobConfig`]. Everything here is plain data deserialized from JSON; decoding into native
//! instructions happens in [`crate::program::decode`].

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

mod config;
mod library;

pub use config::{
    AcquisitionProtocol, AcquisitionReturnType, BinMode, JobConfig, MeasurementLevel,
    MeasurementSettings, ReturnMode, TRACE_LENGTH,
};
pub use library::{PulseLibrary, PulseLibraryEntry, WaveformLibrary};

/// Separates a sanitized experiment name from its index within the job.
const NAME_INDEX_DELIMITER: char = '~';

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobHeader {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl JobHeader {
    /// A cleaned version of the job name, safe for use as a storage key.
    ///
    /// Only alphanumerics and `" -_,.()"` are kept; the index is appended after a `~`.
    pub fn sanitized_name(&self, index: usize) -> String {
        let name: String = self
            .name
            .chars()
            .filter(|c| c.is_alphanumeric() || " -_,.()".contains(*c))
            .collect();
        format!("{name}{NAME_INDEX_DELIMITER}{index}")
    }
}

/// A free-form instruction parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Real(f64),
    Complex(Complex64),
    Flag(bool),
    Text(String),
}

impl ParameterValue {
    /// The value as a real number, if it is one (or a complex number with no imaginary part).
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            Self::Complex(value) if value.im == 0.0 => Some(value.re),
            _ => None,
        }
    }

    /// The value as a complex number; reals are promoted.
    pub fn as_complex(&self) -> Option<Complex64> {
        match self {
            Self::Real(value) => Some(Complex64::new(*value, 0.0)),
            Self::Complex(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(value) => write!(f, "{value}"),
            Self::Complex(value) => write!(f, "{value}"),
            Self::Flag(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

pub type Parameters = BTreeMap<String, ParameterValue>;

/// One instruction as it arrives on the wire, before decoding.
///
/// Times are in nanoseconds, frequencies in GHz and phases in radians.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WireInstruction {
    pub name: String,
    #[serde(default, alias = "channel", skip_serializing_if = "Option::is_none")]
    pub ch: Option<String>,
    #[serde(default, alias = "t0_ns")]
    pub t0: f64,
    #[serde(default, alias = "duration_ns", skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, alias = "frequency_ghz", skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, alias = "phase_rad", skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse_shape: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: Parameters,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qubits: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memory_slot: Vec<u32>,
}

impl WireInstruction {
    pub fn new(name: impl Into<String>, channel: Option<&str>, t0: f64) -> Self {
        Self {
            name: name.into(),
            ch: channel.map(str::to_string),
            t0,
            ..Default::default()
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_pulse_shape(mut self, pulse_shape: impl Into<String>) -> Self {
        self.pulse_shape = Some(pulse_shape.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: ParameterValue) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn with_qubits(mut self, qubits: Vec<u32>, memory_slot: Vec<u32>) -> Self {
        self.qubits = qubits;
        self.memory_slot = memory_slot;
        self
    }
}

impl fmt::Display for WireInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(channel) = &self.ch {
            write!(f, " {channel}")?;
        }
        write!(f, " @ {} ns", self.t0)
    }
}

/// A complete job: header, unordered instructions and execution configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    #[serde(default)]
    pub header: JobHeader,
    pub instructions: Vec<WireInstruction>,
    #[serde(default)]
    pub config: JobConfig,
}

impl JobDescriptor {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
