use serde::{Deserialize, Serialize};

use crate::waveform::ParametricShape;

/// A pulse whose samples come from evaluating an analytic generator.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ParametricPulse {
    pub shape: ParametricShape,
}

impl ParametricPulse {
    pub fn new(shape: ParametricShape) -> Self {
        Self { shape }
    }
}

impl PartialEq for ParametricPulse {
    fn eq(&self, other: &Self) -> bool {
        self.shape.reflexive_eq(&other.shape)
    }
}

impl Eq for ParametricPulse {}

/// A pulse whose samples are looked up by name in the job's waveform library.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryPulse {
    pub name: String,
}

impl LibraryPulse {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
