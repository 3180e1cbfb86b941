use std::fmt;

use serde::{Deserialize, Serialize};

use super::PulseLibrary;
use crate::instruction::UnsupportedProtocolError;
use crate::program::DecodeError;

/// Number of samples in one acquired trace.
pub const TRACE_LENGTH: usize = 16_384;

/// Whether results are averaged over shots or kept per shot.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReturnMode {
    #[default]
    Avg,
    Single,
}

/// The level of processing applied to measurement results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MeasurementLevel {
    Raw,
    #[default]
    Kerneled,
    Classified,
}

impl TryFrom<u8> for MeasurementLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Kerneled),
            2 => Ok(Self::Classified),
            other => Err(format!("unknown measurement level {other}")),
        }
    }
}

impl From<MeasurementLevel> for u8 {
    fn from(level: MeasurementLevel) -> Self {
        match level {
            MeasurementLevel::Raw => 0,
            MeasurementLevel::Kerneled => 1,
            MeasurementLevel::Classified => 2,
        }
    }
}

/// The acquisition integration scheme.
///
/// Unknown protocol names are preserved so that the failure surfaces when an acquisition is
/// actually compiled, rather than when the job is parsed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AcquisitionProtocol {
    #[default]
    IntegratedComplex,
    Trace,
    Unsupported(String),
}

impl AcquisitionProtocol {
    pub fn as_str(&self) -> &str {
        match self {
            Self::IntegratedComplex => "SSBIntegrationComplex",
            Self::Trace => "trace",
            Self::Unsupported(name) => name,
        }
    }

    /// Fail with [`UnsupportedProtocolError`] unless this is a protocol the compiler can render.
    pub fn check_supported(&self) -> Result<(), UnsupportedProtocolError> {
        match self {
            Self::Unsupported(name) => Err(UnsupportedProtocolError {
                protocol: name.clone(),
            }),
            Self::IntegratedComplex | Self::Trace => Ok(()),
        }
    }
}

impl From<String> for AcquisitionProtocol {
    fn from(name: String) -> Self {
        match name.as_str() {
            "SSBIntegrationComplex" => Self::IntegratedComplex,
            "trace" | "Trace" => Self::Trace,
            _ => Self::Unsupported(name),
        }
    }
}

impl From<AcquisitionProtocol> for String {
    fn from(protocol: AcquisitionProtocol) -> Self {
        protocol.as_str().to_string()
    }
}

impl fmt::Display for AcquisitionProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy for combining repeated acquisitions into a result bin.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BinMode {
    #[default]
    Average,
    Append,
}

/// The shape of the value the hardware returns for one acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AcquisitionReturnType {
    /// A single complex value.
    Complex,
    /// An array of values: one per shot, or one per trace sample.
    Array,
}

/// Execution configuration attached to a job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_shots")]
    pub shots: u32,
    #[serde(default, alias = "meas_return")]
    pub return_mode: ReturnMode,
    #[serde(default)]
    pub meas_level: MeasurementLevel,
    #[serde(default)]
    pub protocol: AcquisitionProtocol,
    #[serde(default)]
    pub bin_mode: BinMode,
    #[serde(default, alias = "waveform_library")]
    pub pulse_library: PulseLibrary,
}

fn default_shots() -> u32 {
    1024
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            shots: default_shots(),
            return_mode: ReturnMode::default(),
            meas_level: MeasurementLevel::default(),
            protocol: AcquisitionProtocol::default(),
            bin_mode: BinMode::default(),
            pulse_library: PulseLibrary::default(),
        }
    }
}

/// Measurement settings derived from a job's bin mode and protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementSettings {
    pub return_type: AcquisitionReturnType,
    pub bin_mode: BinMode,
    /// Number of values stored per acquisition: 1, the trace length, or the shot count.
    pub columns: usize,
}

impl MeasurementSettings {
    /// Values read back per acquisition in each memory row.
    ///
    /// Appended shots are laid out as rows, one per repetition, so only traces widen a row.
    pub fn samples_per_acquisition(&self) -> usize {
        match self.bin_mode {
            BinMode::Average => self.columns,
            BinMode::Append => 1,
        }
    }
}

impl JobConfig {
    /// Derive the native measurement settings, rejecting combinations the hardware can't return.
    pub fn measurement_settings(&self) -> Result<MeasurementSettings, DecodeError> {
        let (return_type, columns) = match (self.bin_mode, &self.protocol) {
            (BinMode::Average, AcquisitionProtocol::IntegratedComplex) => {
                (AcquisitionReturnType::Complex, 1)
            }
            (BinMode::Average, AcquisitionProtocol::Trace) => {
                (AcquisitionReturnType::Array, TRACE_LENGTH)
            }
            (BinMode::Append, AcquisitionProtocol::IntegratedComplex) => {
                (AcquisitionReturnType::Array, self.shots as usize)
            }
            (bin_mode, protocol) => {
                return Err(DecodeError::UnsupportedConfig {
                    bin_mode,
                    protocol: protocol.to_string(),
                })
            }
        };

        Ok(MeasurementSettings {
            return_type,
            bin_mode: self.bin_mode,
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(BinMode::Average, "SSBIntegrationComplex", Some((AcquisitionReturnType::Complex, 1)))]
    #[case(BinMode::Average, "trace", Some((AcquisitionReturnType::Array, TRACE_LENGTH)))]
    #[case(BinMode::Append, "SSBIntegrationComplex", Some((AcquisitionReturnType::Array, 50)))]
    #[case(BinMode::Append, "trace", None)]
    #[case(BinMode::Average, "SSBIntegrationReal", None)]
    fn measurement_settings(
        #[case] bin_mode: BinMode,
        #[case] protocol: &str,
        #[case] expected: Option<(AcquisitionReturnType, usize)>,
    ) {
        let config = JobConfig {
            shots: 50,
            bin_mode,
            protocol: protocol.to_string().into(),
            ..Default::default()
        };
        let settings = config.measurement_settings().ok();
        assert_eq!(
            settings.map(|settings| (settings.return_type, settings.columns)),
            expected
        );
    }

    #[rstest]
    #[case(BinMode::Average, "SSBIntegrationComplex", 1)]
    #[case(BinMode::Average, "trace", TRACE_LENGTH)]
    #[case(BinMode::Append, "SSBIntegrationComplex", 1)]
    fn samples_per_acquisition(
        #[case] bin_mode: BinMode,
        #[case] protocol: &str,
        #[case] expected: usize,
    ) {
        let config = JobConfig {
            shots: 50,
            bin_mode,
            protocol: protocol.to_string().into(),
            ..Default::default()
        };
        let settings = config.measurement_settings().unwrap();
        assert_eq!(settings.samples_per_acquisition(), expected);
    }

    #[test]
    fn protocol_names_round_trip() {
        for name in ["SSBIntegrationComplex", "trace", "weighted"] {
            let protocol = AcquisitionProtocol::from(name.to_string());
            assert_eq!(protocol.as_str(), name);
        }
        assert!(AcquisitionProtocol::from("weighted".to_string())
            .check_supported()
            .is_err());
    }

    #[test]
    fn default_config() {
        let config: JobConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, JobConfig::default());
        assert_eq!(config.shots, 1024);
    }

    #[test]
    fn meas_level_out_of_range() {
        assert!(serde_json::from_str::<JobConfig>(r#"{"meas_level": 7}"#).is_err());
    }
}
