use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A process-unique tag identifying one registered instruction.
///
/// Labels exist for diagnostics and bookkeeping only: they never take part in instruction
/// equality or in scheduling decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(Uuid);

impl Label {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
