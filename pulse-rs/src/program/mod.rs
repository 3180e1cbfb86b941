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

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::CompilerConfig;
use crate::error::CompileResult;
use crate::instruction::InstructionKind;
use crate::job::{
    JobDescriptor, MeasurementSettings, ReturnMode, WaveformLibrary, WireInstruction,
};
use crate::operation::Operation;
use crate::units::Picoseconds;

pub use self::channel::{Channel, ChannelId, ChannelRegistry, ChannelState, InstructionHandle};
pub use self::decode::{DecodeError, Decoder};
pub use self::scheduling::{
    assemble, ChannelSchedule, ConflictingInstruction, ManifestEntry, Schedule, ScheduleEntry,
    ScheduleGraph, ScheduledGraphNode, SchedulingConflictError, TimeSpan,
};

mod channel;
pub mod decode;
pub mod scheduling;

/// Where the result of one acquisition is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AcquisitionSlot {
    pub acq_channel: u32,
    pub acq_index: u32,
    pub qubit: u32,
    pub memory_slot: u32,
}

/// A decoded job: every native instruction registered on its channel, in wire order.
///
/// A program is the unit of one compilation pass. It exclusively owns its channel registry.
#[derive(Clone, Debug)]
pub struct Program {
    name: String,
    registry: ChannelRegistry,
    library: WaveformLibrary,
    settings: MeasurementSettings,
    return_mode: ReturnMode,
    handles: Vec<InstructionHandle>,
}

impl Program {
    /// Decode every instruction of `job`, after anchoring the program with an initial object at
    /// time zero on the baseband channel.
    #[instrument(skip_all, fields(job = %job.header.name, instructions = job.instructions.len()))]
    pub fn from_job(job: &JobDescriptor, config: &CompilerConfig) -> CompileResult<Self> {
        let library = job.config.pulse_library.normalize()?;
        let decoder = Decoder::new(config, &job.config, &library)?;
        let mut registry = ChannelRegistry::new();

        let initial_object =
            WireInstruction::new("initial_object", Some(&config.baseband_channel), 0.0);
        let mut handles = decoder.decode(&initial_object, &mut registry)?;
        for wire in &job.instructions {
            handles.extend(decoder.decode(wire, &mut registry)?);
        }
        let settings = *decoder.settings();

        debug!(
            channels = registry.len(),
            instructions = registry.instruction_count(),
            "decoded job"
        );
        Ok(Self {
            name: job.header.sanitized_name(0),
            registry,
            library,
            settings,
            return_mode: job.config.return_mode,
            handles,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn library(&self) -> &WaveformLibrary {
        &self.library
    }

    pub fn settings(&self) -> &MeasurementSettings {
        &self.settings
    }

    pub fn return_mode(&self) -> ReturnMode {
        self.return_mode
    }

    /// Handles of the registered instructions, in decoding order.
    pub fn handles(&self) -> &[InstructionHandle] {
        &self.handles
    }

    pub fn assemble(&self) -> Result<Schedule, SchedulingConflictError> {
        assemble(&self.registry)
    }

    /// Render every channel's instructions in ascending registration position.
    ///
    /// With `skip_idle_channels`, channels holding nothing but a single delay are left out.
    pub fn render(&self, skip_idle_channels: bool) -> CompileResult<RenderedChannels> {
        let mut rendered = RenderedChannels::default();
        for channel in self.registry.channels() {
            if skip_idle_channels && channel.is_lone_delay() {
                debug!(channel = %channel.id(), "skipping idle channel");
                continue;
            }

            let mut operations = Vec::with_capacity(channel.len());
            for (position, instruction) in channel.instructions().iter().enumerate() {
                let operation = instruction.to_operation(channel, position, &self.library)?;
                if let (InstructionKind::Acquire(acquire), Some(acquisition)) =
                    (&instruction.kind, operation.as_acquisition())
                {
                    rendered.acquisitions.push(AcquisitionSlot {
                        acq_channel: acquisition.acq_channel,
                        acq_index: acquisition.acq_index,
                        qubit: acquire.qubit,
                        memory_slot: acquire.memory_slot,
                    });
                }
                operations.push(operation);
            }
            rendered.operations.insert(channel.id().clone(), operations);
        }
        rendered.acquisitions.sort();
        Ok(rendered)
    }

    /// Assemble and render, producing everything a backend needs to run the job.
    pub fn compile(self, config: &CompilerConfig) -> CompileResult<CompiledSchedule> {
        let schedule = self.assemble()?;
        let rendered = self.render(config.skip_idle_channels)?;
        info!(
            name = %self.name,
            channels = rendered.operations.len(),
            acquisitions = rendered.acquisitions.len(),
            duration = %schedule.total_duration(),
            "compiled schedule"
        );
        Ok(CompiledSchedule {
            name: self.name,
            schedule,
            operations: rendered.operations,
            acquisitions: rendered.acquisitions,
            settings: self.settings,
            return_mode: self.return_mode,
        })
    }
}

/// Rendered operations per channel, plus the acquisitions among them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderedChannels {
    pub operations: IndexMap<ChannelId, Vec<Operation>>,
    /// Ordered by acquisition channel, then acquisition index
    pub acquisitions: Vec<AcquisitionSlot>,
}

/// The result of compiling a job: a verified schedule and its rendered operations.
#[derive(Debug)]
pub struct CompiledSchedule {
    pub name: String,
    pub schedule: Schedule,
    pub operations: IndexMap<ChannelId, Vec<Operation>>,
    pub acquisitions: Vec<AcquisitionSlot>,
    pub settings: MeasurementSettings,
    pub return_mode: ReturnMode,
}

impl CompiledSchedule {
    pub fn total_duration(&self) -> Picoseconds {
        self.schedule.total_duration()
    }

    /// The distinct acquisition channels, in ascending order.
    pub fn acquisition_channels(&self) -> Vec<u32> {
        let mut channels: Vec<u32> = self
            .acquisitions
            .iter()
            .map(|slot| slot.acq_channel)
            .collect();
        channels.dedup();
        channels
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values().flatten()
    }
}
