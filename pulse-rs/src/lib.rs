// Copyright 2021 Rigetti Computing
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A compiler from loosely timed pulse job descriptors to hardware schedules.
//!
//! Within this crate you'll find:
//!
//! * A [decoder] turning wire-level [jobs] into native instructions, aligned to the hardware
//!   execution grid and registered on their channels
//! * An [assembler] that orders each channel in time and rejects overlapping instructions
//! * A render pass producing backend-ready [operations], with phase, frequency and acquisition
//!   index bookkeeping carried per channel
//! * An [executor] that dispatches compiled schedules to a [backend] and shapes the returned
//!   measurement memory into a dataset
//!
//! [assembler]: crate::program::assemble
//! [backend]: crate::executor::Backend
//! [decoder]: crate::program::Decoder
//! [executor]: crate::executor::Executor
//! [jobs]: crate::job::JobDescriptor
//! [operations]: crate::operation::Operation

pub mod config;
pub mod error;
pub mod executor;
mod floating_point_eq;
pub mod instruction;
pub mod job;
pub mod operation;
pub mod program;
pub mod timing;
pub mod units;
pub mod waveform;

pub use program::Program;
