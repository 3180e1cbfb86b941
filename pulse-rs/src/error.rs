//! Error aggregates for compilation and execution.

use crate::executor::Dataset;
use crate::instruction::UnsupportedProtocolError;
use crate::job::ReturnMode;
use crate::program::{DecodeError, SchedulingConflictError};
use crate::timing::GridAlignmentError;
use crate::waveform::WaveformLookupError;

/// Any failure while turning a job into a compiled schedule. Compilation never returns a
/// partial schedule.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    GridAlignment(#[from] GridAlignmentError),

    #[error(transparent)]
    WaveformLookup(#[from] WaveformLookupError),

    #[error(transparent)]
    SchedulingConflict(#[from] SchedulingConflictError),

    #[error(transparent)]
    UnsupportedProtocol(#[from] UnsupportedProtocolError),
}

pub type CompileResult<T> = Result<T, CompileError>;

/// The requested return mode can't be produced for this schedule.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("return mode {return_mode} is not supported with {acquisition_channels} acquisition channels")]
pub struct UnsupportedModeError {
    pub return_mode: ReturnMode,
    pub acquisition_channels: usize,
}

/// The backend failed while executing a schedule.
#[derive(Debug, thiserror::Error)]
#[error("backend {backend} failed: {message}")]
pub struct BackendExecutionError {
    pub backend: String,
    pub message: String,
    /// Results collected before the failure, if the backend returned any.
    pub partial: Option<Dataset>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("the executor has been closed")]
    Closed,

    #[error("cannot {operation} while the executor is {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::executor::ExecutorState,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    UnsupportedMode(#[from] UnsupportedModeError),

    #[error(transparent)]
    Backend(#[from] BackendExecutionError),
}

pub type ExecutionResult<T> = Result<T, ExecutorError>;
