//! Rendered operations: what a backend actually plays or records.
//!
//! Times in an operation are in seconds. An operation's `t0` is relative to the slot the schedule
//! assigns it; absolute start times live in the schedule.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::job::{AcquisitionProtocol, AcquisitionReturnType, BinMode};

/// How a backend reconstructs a waveform between time tags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
}

/// A timing-only operation: it occupies its channel without a waveform or measurement payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdleOperation {
    pub name: String,
    pub clock: String,
    pub t0: f64,
    pub duration: f64,
}

/// A numerically sampled waveform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseOperation {
    pub name: String,
    pub clock: String,
    pub port: String,
    pub t0: f64,
    pub duration: f64,
    pub samples: Vec<Complex64>,
    pub time_samples: Vec<f64>,
    pub interpolation: Interpolation,
}

/// A square integration weight spanning the whole acquisition window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationWeight {
    pub amplitude: Complex64,
    pub duration: f64,
}

/// A measurement of one qubit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionOperation {
    pub name: String,
    pub clock: String,
    pub port: String,
    pub t0: f64,
    pub duration: f64,
    /// Demodulation phase, in radians.
    pub phase: f64,
    pub weights: Vec<IntegrationWeight>,
    pub acq_channel: u32,
    pub acq_index: u32,
    pub bin_mode: BinMode,
    pub return_type: AcquisitionReturnType,
    pub protocol: AcquisitionProtocol,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Idle(IdleOperation),
    Pulse(PulseOperation),
    Acquisition(AcquisitionOperation),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Self::Idle(operation) => &operation.name,
            Self::Pulse(operation) => &operation.name,
            Self::Acquisition(operation) => &operation.name,
        }
    }

    pub fn clock(&self) -> &str {
        match self {
            Self::Idle(operation) => &operation.clock,
            Self::Pulse(operation) => &operation.clock,
            Self::Acquisition(operation) => &operation.clock,
        }
    }

    /// The output port, if the operation drives or reads one.
    pub fn port(&self) -> Option<&str> {
        match self {
            Self::Idle(_) => None,
            Self::Pulse(operation) => Some(&operation.port),
            Self::Acquisition(operation) => Some(&operation.port),
        }
    }

    pub fn t0(&self) -> f64 {
        match self {
            Self::Idle(operation) => operation.t0,
            Self::Pulse(operation) => operation.t0,
            Self::Acquisition(operation) => operation.t0,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Idle(operation) => operation.duration,
            Self::Pulse(operation) => operation.duration,
            Self::Acquisition(operation) => operation.duration,
        }
    }

    pub fn as_acquisition(&self) -> Option<&AcquisitionOperation> {
        match self {
            Self::Acquisition(operation) => Some(operation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_kind_tag() {
        let operation = Operation::Idle(IdleOperation {
            name: "delay-d0-0".to_string(),
            clock: "d0".to_string(),
            t0: 0.0,
            duration: 4e-9,
        });
        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(json["kind"], "idle");
        assert_eq!(json["clock"], "d0");
        assert_eq!(operation.port(), None);

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, operation);
    }
}
