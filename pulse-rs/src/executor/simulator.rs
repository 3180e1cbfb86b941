//! A deterministic stand-in for control hardware.
//!
//! No physics is simulated. Every acquisition reads back a fixed centroid for its acquisition
//! channel, plus bounded uniform noise from a seeded generator. Trace acquisitions read back
//! the same, once per trace sample.

use ndarray::Array3;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use super::backend::{Backend, BackendError, BackendRequest, BackendResponse};
use crate::config::SimulatorConfig;
use crate::job::ReturnMode;

#[derive(Debug)]
pub struct SimulatorBackend {
    config: SimulatorConfig,
    rng: StdRng,
    closed: bool,
}

impl SimulatorBackend {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            closed: false,
        }
    }

    /// The noiseless IQ value read on `acq_channel`: a point on the unit circle, so distinct
    /// channels are easy to tell apart.
    pub fn centroid(acq_channel: u32) -> Complex64 {
        Complex64::from_polar(1.0, 0.5 + f64::from(acq_channel))
    }

    fn noise(&mut self, scale: f64) -> f64 {
        (self.rng.gen::<f64>() * 2.0 - 1.0) * scale
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        "simulator"
    }

    #[instrument(skip_all, fields(job = request.name, shots = request.shots, mode = %request.return_mode))]
    fn execute(&mut self, request: &BackendRequest<'_>) -> Result<BackendResponse, BackendError> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        if request.shots == 0 {
            return Err(BackendError::Execution {
                message: "at least one shot is required".to_string(),
                partial: None,
            });
        }

        let rows = request.expected_rows();
        let samples = request.settings.samples_per_acquisition();
        // averaging over shots shrinks the noise
        let scale = match request.return_mode {
            ReturnMode::Avg => self.config.noise / f64::from(request.shots).sqrt(),
            ReturnMode::Single => self.config.noise,
        };

        let mut memory = Array3::zeros((rows, request.expected_columns(), 2));
        for row in 0..rows {
            for (index, slot) in request.acquisitions.iter().enumerate() {
                let centroid = Self::centroid(slot.acq_channel);
                for column in index * samples..(index + 1) * samples {
                    memory[[row, column, 0]] = centroid.re + self.noise(scale);
                    memory[[row, column, 1]] = centroid.im + self.noise(scale);
                }
            }
        }

        debug!(
            rows,
            acquisitions = request.acquisitions.len(),
            samples,
            "simulated measurement"
        );
        Ok(BackendResponse { memory })
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.closed = true;
        Ok(())
    }
}
