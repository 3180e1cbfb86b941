use serde::{Deserialize, Serialize};

use crate::job::{AcquisitionProtocol, AcquisitionReturnType, BinMode};

/// The acquisition protocol is not one the compiler knows how to render.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("acquisition protocol {protocol:?} is not supported")]
pub struct UnsupportedProtocolError {
    pub protocol: String,
}

/// Records the response of one qubit into a memory slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acquire {
    pub qubit: u32,
    pub memory_slot: u32,
    pub protocol: AcquisitionProtocol,
    pub bin_mode: BinMode,
    pub return_type: AcquisitionReturnType,
}
