//! The seam between the executor and whatever runs a compiled schedule.

use indexmap::IndexMap;
use ndarray::Array3;

use crate::job::{MeasurementSettings, ReturnMode};
use crate::operation::Operation;
use crate::program::{AcquisitionSlot, ChannelId};

/// Everything a backend needs to execute one compiled schedule.
#[derive(Clone, Copy, Debug)]
pub struct BackendRequest<'a> {
    pub name: &'a str,
    pub operations: &'a IndexMap<ChannelId, Vec<Operation>>,
    /// Ordered by acquisition channel, then acquisition index
    pub acquisitions: &'a [AcquisitionSlot],
    pub shots: u32,
    pub return_mode: ReturnMode,
    pub settings: &'a MeasurementSettings,
}

impl BackendRequest<'_> {
    /// The number of rows the response memory must have.
    pub fn expected_rows(&self) -> usize {
        match self.return_mode {
            ReturnMode::Avg => 1,
            ReturnMode::Single => self.shots as usize,
        }
    }

    /// The number of values each response row must hold: every acquisition's samples, back to
    /// back in acquisition order.
    pub fn expected_columns(&self) -> usize {
        self.acquisitions.len() * self.settings.samples_per_acquisition()
    }
}

/// Raw measurement memory returned by a backend.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendResponse {
    /// Indexed `[row][column][re | im]`. There is one row per repetition, or a single row of
    /// averages. Each acquisition of [`BackendRequest::acquisitions`] owns
    /// [`MeasurementSettings::samples_per_acquisition`] consecutive columns, in order.
    pub memory: Array3<f64>,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("execution failed: {message}")]
    Execution {
        message: String,
        /// Memory collected before the failure, in the same layout as a full response
        partial: Option<Array3<f64>>,
    },

    #[error("the backend has been closed")]
    Closed,

    #[error("failed to release backend resources: {0}")]
    Release(String),
}

/// A blocking executor of compiled schedules: a hardware driver or a simulator.
pub trait Backend: Send {
    fn name(&self) -> &str;

    fn execute(&mut self, request: &BackendRequest<'_>) -> Result<BackendResponse, BackendError>;

    /// Release any resources held by the backend. Calling this more than once is allowed.
    fn close(&mut self) -> Result<(), BackendError>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn execute(&mut self, request: &BackendRequest<'_>) -> Result<BackendResponse, BackendError> {
        (**self).execute(request)
    }

    fn close(&mut self) -> Result<(), BackendError> {
        (**self).close()
    }
}
