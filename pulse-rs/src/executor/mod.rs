//! Orchestration of a job from descriptor to dataset: compile, dispatch to a backend, and shape
//! the returned memory.

use tracing::{debug, info, instrument, warn};

use crate::config::CompilerConfig;
use crate::error::{BackendExecutionError, ExecutionResult, ExecutorError, UnsupportedModeError};
use crate::job::{JobDescriptor, ReturnMode};
use crate::program::{CompiledSchedule, Program};

pub use self::backend::{Backend, BackendError, BackendRequest, BackendResponse};
pub use self::dataset::{ChannelData, Dataset};
pub use self::simulator::SimulatorBackend;

mod backend;
mod dataset;
mod simulator;

/// The lifecycle of an [`Executor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExecutorState {
    Idle,
    Constructing,
    Ready,
    Running,
    Closed,
}

/// Compiles jobs and runs them on one backend.
///
/// An executor runs one schedule at a time. If a caller gives up on a `run` (for example on a
/// timeout), the executor should be discarded rather than reused.
#[derive(Debug)]
pub struct Executor<B> {
    config: CompilerConfig,
    backend: B,
    state: ExecutorState,
}

impl Executor<SimulatorBackend> {
    /// An executor backed by the simulator configured in `config`.
    pub fn simulated(config: CompilerConfig) -> Self {
        let backend = SimulatorBackend::new(config.simulator.clone());
        Self::new(config, backend)
    }
}

impl<B: Backend> Executor<B> {
    pub fn new(config: CompilerConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            state: ExecutorState::Idle,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_open(&self, operation: &'static str) -> ExecutionResult<()> {
        match self.state {
            ExecutorState::Closed => Err(ExecutorError::Closed),
            ExecutorState::Idle | ExecutorState::Ready => Ok(()),
            state => Err(ExecutorError::InvalidState { operation, state }),
        }
    }

    /// Compile `job` into a schedule ready to run.
    ///
    /// On failure the executor returns to idle; no partial schedule is kept.
    #[instrument(skip_all, fields(job = %job.header.name))]
    pub fn construct_schedule(&mut self, job: &JobDescriptor) -> ExecutionResult<CompiledSchedule> {
        self.ensure_open("construct a schedule")?;
        self.state = ExecutorState::Constructing;

        let compiled = Program::from_job(job, &self.config)
            .and_then(|program| program.compile(&self.config));
        match compiled {
            Ok(compiled) => {
                self.state = ExecutorState::Ready;
                Ok(compiled)
            }
            Err(error) => {
                warn!(%error, "failed to compile job");
                self.state = ExecutorState::Idle;
                Err(error.into())
            }
        }
    }

    /// Execute `compiled` for `shots` repetitions and shape the results per acquisition channel.
    #[instrument(skip_all, fields(job = %compiled.name, shots = shots, backend = self.backend.name()))]
    pub fn run(&mut self, compiled: &CompiledSchedule, shots: u32) -> ExecutionResult<Dataset> {
        self.ensure_open("run")?;

        let acquisition_channels = compiled.acquisition_channels().len();
        if compiled.return_mode == ReturnMode::Avg && acquisition_channels > 1 {
            return Err(UnsupportedModeError {
                return_mode: compiled.return_mode,
                acquisition_channels,
            }
            .into());
        }

        let request = BackendRequest {
            name: &compiled.name,
            operations: &compiled.operations,
            acquisitions: &compiled.acquisitions,
            shots,
            return_mode: compiled.return_mode,
            settings: &compiled.settings,
        };

        self.state = ExecutorState::Running;
        let response = self.backend.execute(&request);
        self.state = ExecutorState::Idle;

        let response = response.map_err(|error| self.execution_error(compiled, error))?;
        let (rows, columns, _) = response.memory.dim();
        if rows != request.expected_rows() || columns != request.expected_columns() {
            return Err(self.malformed_memory(compiled, &response));
        }
        let dataset = Dataset::from_raw_memory(
            &response.memory,
            &compiled.acquisitions,
            compiled.return_mode,
            compiled.settings.samples_per_acquisition(),
        )
        .ok_or_else(|| self.malformed_memory(compiled, &response))?;

        info!(channels = dataset.len(), "run complete");
        Ok(dataset)
    }

    fn execution_error(&self, compiled: &CompiledSchedule, error: BackendError) -> ExecutorError {
        match error {
            BackendError::Execution { message, partial } => {
                let partial = partial.and_then(|memory| {
                    Dataset::from_raw_memory(
                        &memory,
                        &compiled.acquisitions,
                        compiled.return_mode,
                        compiled.settings.samples_per_acquisition(),
                    )
                });
                self.backend_error(message, partial)
            }
            other => self.backend_error(other.to_string(), None),
        }
    }

    fn malformed_memory(
        &self,
        compiled: &CompiledSchedule,
        response: &BackendResponse,
    ) -> ExecutorError {
        self.backend_error(
            format!(
                "returned memory of shape {:?} for {} acquisitions",
                response.memory.dim(),
                compiled.acquisitions.len()
            ),
            None,
        )
    }

    fn backend_error(&self, message: String, partial: Option<Dataset>) -> ExecutorError {
        BackendExecutionError {
            backend: self.backend.name().to_string(),
            message,
            partial,
        }
        .into()
    }

    /// Release the backend. Every later call fails with [`ExecutorError::Closed`]; closing again
    /// does nothing.
    pub fn close(&mut self) -> ExecutionResult<()> {
        if self.state == ExecutorState::Closed {
            return Ok(());
        }
        self.state = ExecutorState::Closed;
        debug!(backend = self.backend.name(), "closing executor");
        self.backend
            .close()
            .map_err(|error| self.backend_error(error.to_string(), None))
    }
}
