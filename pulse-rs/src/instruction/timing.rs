use serde::{Deserialize, Serialize};

/// Anchors a schedule at time zero on the baseband channel.
///
/// Every compiled schedule starts with exactly one of these, so that the earliest instruction of
/// the job is measured from a common origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InitialObject;

/// Holds a channel idle for the instruction's duration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delay;
