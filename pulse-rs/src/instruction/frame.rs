use serde::{Deserialize, Serialize};

use crate::floating_point_eq;

/// Sets the channel's carrier frequency, in Hz.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SetFrequency {
    pub frequency: f64,
}

impl SetFrequency {
    pub fn new(frequency: f64) -> Self {
        Self { frequency }
    }
}

impl PartialEq for SetFrequency {
    fn eq(&self, other: &Self) -> bool {
        floating_point_eq::f64::eq(self.frequency, other.frequency)
    }
}

impl Eq for SetFrequency {}

/// Shifts the channel's carrier frequency by an offset, in Hz.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShiftFrequency {
    pub frequency: f64,
}

impl ShiftFrequency {
    pub fn new(frequency: f64) -> Self {
        Self { frequency }
    }
}

impl PartialEq for ShiftFrequency {
    fn eq(&self, other: &Self) -> bool {
        floating_point_eq::f64::eq(self.frequency, other.frequency)
    }
}

impl Eq for ShiftFrequency {}

/// Sets the channel's phase, in radians.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SetPhase {
    pub phase: f64,
}

impl SetPhase {
    pub fn new(phase: f64) -> Self {
        Self { phase }
    }
}

impl PartialEq for SetPhase {
    fn eq(&self, other: &Self) -> bool {
        floating_point_eq::f64::eq(self.phase, other.phase)
    }
}

impl Eq for SetPhase {}

/// Advances the channel's phase by an offset, in radians.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ShiftPhase {
    pub phase: f64,
}

impl ShiftPhase {
    pub fn new(phase: f64) -> Self {
        Self { phase }
    }
}

impl PartialEq for ShiftPhase {
    fn eq(&self, other: &Self) -> bool {
        floating_point_eq::f64::eq(self.phase, other.phase)
    }
}

impl Eq for ShiftPhase {}
