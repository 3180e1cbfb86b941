//! Compiler configuration.
//!
//! Configuration is loaded with the following priority (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. A YAML file
//! 3. Environment variables (`PULSE_*`)

use std::env;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::program::ChannelId;
use crate::timing::{GridAligner, GridAlignmentError, DEFAULT_GRID_INTERVAL_NS};
use crate::units::Picoseconds;

pub const GRID_INTERVAL_ENV: &str = "PULSE_GRID_INTERVAL_NS";
pub const SAMPLE_PERIOD_ENV: &str = "PULSE_SAMPLE_PERIOD_NS";
pub const SIMULATOR_SEED_ENV: &str = "PULSE_SIMULATOR_SEED";

/// Longest waveform a parametric pulse may render to, unless configured otherwise.
pub const DEFAULT_MAX_PULSE_SAMPLES: usize = 1 << 22;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    #[error("environment variable {variable} has invalid value {value:?}")]
    InvalidOverride { variable: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Maps channel names to the hardware ports that drive them.
pub type HardwareMap = IndexMap<String, String>;

/// Settings of the built-in simulator backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Seed for the IQ noise generator
    #[serde(default)]
    pub seed: u64,

    /// Half-width of the uniform noise added to each IQ component
    #[serde(default = "default_noise")]
    pub noise: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            noise: default_noise(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Execution grid interval of the control electronics, in ns
    #[serde(default = "default_grid_interval_ns")]
    pub grid_interval_ns: f64,

    /// Time between waveform samples, in ns
    #[serde(default = "default_sample_period_ns")]
    pub sample_period_ns: f64,

    /// Upper bound on the number of samples a parametric pulse renders to
    #[serde(default = "default_max_pulse_samples")]
    pub max_pulse_samples: usize,

    /// Channel holding the initial object that anchors every schedule
    #[serde(default = "default_baseband_channel")]
    pub baseband_channel: String,

    /// Leave channels consisting of a single delay out of the rendered schedule
    #[serde(default = "default_true")]
    pub skip_idle_channels: bool,

    #[serde(default)]
    pub hardware_map: HardwareMap,

    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            grid_interval_ns: default_grid_interval_ns(),
            sample_period_ns: default_sample_period_ns(),
            max_pulse_samples: default_max_pulse_samples(),
            baseband_channel: default_baseband_channel(),
            skip_idle_channels: true,
            hardware_map: HardwareMap::new(),
            simulator: SimulatorConfig::default(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from an optional YAML file, then apply environment overrides.
    pub fn load(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_yaml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_overrides(|variable| env::var(variable).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Apply `PULSE_*` overrides, reading variables through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(GRID_INTERVAL_ENV) {
            self.grid_interval_ns = parse_override(GRID_INTERVAL_ENV, value)?;
        }
        if let Some(value) = lookup(SAMPLE_PERIOD_ENV) {
            self.sample_period_ns = parse_override(SAMPLE_PERIOD_ENV, value)?;
        }
        if let Some(value) = lookup(SIMULATOR_SEED_ENV) {
            self.simulator.seed = parse_override(SIMULATOR_SEED_ENV, value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.grid_aligner()
            .map_err(|error| ConfigError::Invalid(format!("grid_interval_ns: {error}")))?;
        if !(self.sample_period_ns.is_finite() && self.sample_period_ns > 0.0) {
            return Err(ConfigError::Invalid(
                "sample_period_ns must be a positive number".into(),
            ));
        }
        if self.sample_period().0 == 0 {
            return Err(ConfigError::Invalid(
                "sample_period_ns must be at least 1 ps".into(),
            ));
        }
        if self.max_pulse_samples == 0 {
            return Err(ConfigError::Invalid(
                "max_pulse_samples must be at least 1".into(),
            ));
        }
        if self.baseband_channel.is_empty() {
            return Err(ConfigError::Invalid(
                "baseband_channel cannot be empty".into(),
            ));
        }
        if !(self.simulator.noise.is_finite() && self.simulator.noise >= 0.0) {
            return Err(ConfigError::Invalid(
                "simulator.noise must be a non-negative number".into(),
            ));
        }
        if self.grid_interval_ns < self.sample_period_ns {
            tracing::warn!(
                grid_interval_ns = self.grid_interval_ns,
                sample_period_ns = self.sample_period_ns,
                "grid interval is shorter than one sample"
            );
        }
        Ok(())
    }

    pub fn grid_aligner(&self) -> Result<GridAligner, GridAlignmentError> {
        GridAligner::from_nanoseconds(self.grid_interval_ns)
    }

    pub fn sample_period(&self) -> Picoseconds {
        Picoseconds::signed_from_nanoseconds(self.sample_period_ns)
            .filter(|period| *period > 0)
            .map(|period| Picoseconds(period as u64))
            .unwrap_or(Picoseconds(1_000))
    }

    pub fn baseband_channel(&self) -> ChannelId {
        ChannelId::new(self.baseband_channel.clone())
    }

    /// The port driving `channel`; unmapped channels are their own port.
    pub fn port_for(&self, channel: &ChannelId) -> String {
        self.hardware_map
            .get(channel.as_str())
            .cloned()
            .unwrap_or_else(|| channel.to_string())
    }
}

fn parse_override<T: std::str::FromStr>(variable: &'static str, value: String) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { variable, value })
}

fn default_grid_interval_ns() -> f64 {
    DEFAULT_GRID_INTERVAL_NS
}

fn default_sample_period_ns() -> f64 {
    1.0
}

fn default_max_pulse_samples() -> usize {
    DEFAULT_MAX_PULSE_SAMPLES
}

fn default_baseband_channel() -> String {
    "cl0.baseband".to_string()
}

fn default_noise() -> f64 {
    0.01
}

fn default_true() -> bool {
    true
}
