//! Decoding of wire instructions into registered native instructions.

use tracing::{debug, instrument, trace};

use crate::config::CompilerConfig;
use crate::error::CompileResult;
use crate::instruction::{
    Acquire, Delay, InitialObject, InstructionHeader, InstructionKind, LibraryPulse,
    NativeInstruction, ParametricPulse, SetFrequency, SetPhase, ShiftFrequency, ShiftPhase,
};
use crate::job::{
    AcquisitionProtocol, BinMode, JobConfig, MeasurementSettings, WaveformLibrary,
    WireInstruction,
};
use crate::timing::GridAligner;
use crate::units::{Picoseconds, HZ_PER_GHZ};
use crate::waveform::{ParametricShape, ShapeError, WaveformLookupError};

use super::channel::{ChannelId, ChannelRegistry, InstructionHandle};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown instruction {name:?}: not a native kind nor a waveform library entry")]
    UnknownInstruction { name: String },

    #[error("instruction {instruction:?} is missing required field {field:?}")]
    MissingField {
        instruction: String,
        field: &'static str,
    },

    #[error("acquire of qubit {qubit} has no memory slot at index {index}")]
    MissingMemorySlot { qubit: u32, index: usize },

    #[error("bin mode {bin_mode} cannot be combined with acquisition protocol {protocol:?}")]
    UnsupportedConfig { bin_mode: BinMode, protocol: String },

    #[error("waveform {name:?} is defined more than once in the waveform library")]
    DuplicateWaveform { name: String },

    #[error("invalid parametric pulse: {0}")]
    Shape(#[from] ShapeError),
}

/// The native kinds a wire instruction name can decode to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum WireKind {
    Delay,
    Acquire,
    #[strum(serialize = "setf")]
    SetFrequency,
    #[strum(serialize = "shiftf")]
    ShiftFrequency,
    #[strum(serialize = "setp")]
    SetPhase,
    #[strum(serialize = "fc", serialize = "shiftp")]
    ShiftPhase,
    ParametricPulse,
    InitialObject,
}

/// Turns wire instructions into native instructions registered on a [`ChannelRegistry`].
///
/// All timestamps and durations are converted to picoseconds and aligned to the execution grid
/// before an instruction is built.
#[derive(Debug)]
pub struct Decoder<'a> {
    config: &'a CompilerConfig,
    aligner: GridAligner,
    library: &'a WaveformLibrary,
    protocol: &'a AcquisitionProtocol,
    settings: MeasurementSettings,
}

impl<'a> Decoder<'a> {
    /// Validate the job configuration and prepare to decode its instructions.
    pub fn new(
        config: &'a CompilerConfig,
        job_config: &'a JobConfig,
        library: &'a WaveformLibrary,
    ) -> CompileResult<Self> {
        job_config.protocol.check_supported()?;
        let settings = job_config.measurement_settings()?;
        Ok(Self {
            config,
            aligner: config.grid_aligner()?,
            library,
            protocol: &job_config.protocol,
            settings,
        })
    }

    pub fn settings(&self) -> &MeasurementSettings {
        &self.settings
    }

    /// Decode one wire instruction, registering every native instruction it expands to.
    ///
    /// Acquisitions of several qubits expand to one instruction per qubit, in qubit order.
    #[instrument(skip_all, fields(instruction = %wire))]
    pub fn decode(
        &self,
        wire: &WireInstruction,
        registry: &mut ChannelRegistry,
    ) -> CompileResult<Vec<InstructionHandle>> {
        let t0 = self.aligner.align_nanoseconds(wire.t0)?;

        let wire_kind = match wire.name.parse::<WireKind>() {
            Ok(kind) => kind,
            Err(_) if self.library.contains(&wire.name) => {
                let channel = self.channel(wire)?;
                let duration = self.library_duration(&wire.name)?;
                let kind = InstructionKind::LibraryPulse(LibraryPulse::new(wire.name.clone()));
                return Ok(vec![self.register(registry, channel, t0, duration, kind)]);
            }
            Err(_) => {
                return Err(DecodeError::UnknownInstruction {
                    name: wire.name.clone(),
                }
                .into())
            }
        };

        let (kind, duration) = match wire_kind {
            WireKind::Acquire => return self.decode_acquire(wire, t0, registry),
            WireKind::Delay => (InstructionKind::Delay(Delay), self.wire_duration(wire)?),
            WireKind::InitialObject => (
                InstructionKind::InitialObject(InitialObject),
                match wire.duration {
                    Some(duration) => self.aligner.align_nanoseconds(duration)?,
                    None => Picoseconds::ZERO,
                },
            ),
            WireKind::SetFrequency => (
                InstructionKind::SetFrequency(SetFrequency::new(self.frequency_hz(wire)?)),
                Picoseconds::ZERO,
            ),
            WireKind::ShiftFrequency => (
                InstructionKind::ShiftFrequency(ShiftFrequency::new(self.frequency_hz(wire)?)),
                Picoseconds::ZERO,
            ),
            WireKind::SetPhase => (
                InstructionKind::SetPhase(SetPhase::new(self.phase(wire)?)),
                Picoseconds::ZERO,
            ),
            WireKind::ShiftPhase => (
                InstructionKind::ShiftPhase(ShiftPhase::new(self.phase(wire)?)),
                Picoseconds::ZERO,
            ),
            WireKind::ParametricPulse => {
                let pulse_shape = wire
                    .pulse_shape
                    .as_deref()
                    .ok_or_else(|| missing(wire, "pulse_shape"))?;
                let shape = ParametricShape::from_parameters(
                    pulse_shape,
                    &wire.parameters,
                    self.config.sample_period(),
                    self.config.max_pulse_samples,
                )
                .map_err(DecodeError::from)?;
                let duration_ns = wire
                    .parameters
                    .get("duration")
                    .and_then(|duration| duration.as_real())
                    .ok_or_else(|| missing(wire, "parameters.duration"))?;
                (
                    InstructionKind::ParametricPulse(ParametricPulse::new(shape)),
                    self.aligner.align_nanoseconds(duration_ns)?,
                )
            }
        };

        let channel = match (wire_kind, &wire.ch) {
            (WireKind::InitialObject, None) => self.config.baseband_channel(),
            _ => self.channel(wire)?,
        };
        Ok(vec![self.register(registry, channel, t0, duration, kind)])
    }

    fn decode_acquire(
        &self,
        wire: &WireInstruction,
        t0: Picoseconds,
        registry: &mut ChannelRegistry,
    ) -> CompileResult<Vec<InstructionHandle>> {
        if wire.qubits.is_empty() {
            return Err(missing(wire, "qubits").into());
        }
        let duration = self.wire_duration(wire)?;

        wire.qubits
            .iter()
            .enumerate()
            .map(|(index, &qubit)| -> CompileResult<InstructionHandle> {
                let memory_slot = *wire
                    .memory_slot
                    .get(index)
                    .ok_or(DecodeError::MissingMemorySlot { qubit, index })?;
                let kind = InstructionKind::Acquire(Acquire {
                    qubit,
                    memory_slot,
                    protocol: self.protocol.clone(),
                    bin_mode: self.settings.bin_mode,
                    return_type: self.settings.return_type,
                });
                Ok(self.register(registry, ChannelId::measure(qubit), t0, duration, kind))
            })
            .collect()
    }

    fn register(
        &self,
        registry: &mut ChannelRegistry,
        channel: ChannelId,
        t0: Picoseconds,
        duration: Picoseconds,
        kind: InstructionKind,
    ) -> InstructionHandle {
        let port = self.config.port_for(&channel);
        let header = InstructionHeader::new(channel, port, t0, duration);
        let instruction = NativeInstruction::new(header, kind);
        trace!(%instruction, "registering");
        let handle = registry.register(instruction);
        debug!(channel = %handle.channel, position = handle.position, "registered instruction");
        handle
    }

    fn channel(&self, wire: &WireInstruction) -> Result<ChannelId, DecodeError> {
        wire.ch
            .as_deref()
            .map(ChannelId::from)
            .ok_or_else(|| missing(wire, "ch"))
    }

    fn wire_duration(&self, wire: &WireInstruction) -> CompileResult<Picoseconds> {
        let duration = wire.duration.ok_or_else(|| missing(wire, "duration"))?;
        Ok(self.aligner.align_nanoseconds(duration)?)
    }

    /// Library waveforms last one sample period per sample.
    fn library_duration(&self, name: &str) -> CompileResult<Picoseconds> {
        let samples = self
            .library
            .get(name)
            .ok_or_else(|| WaveformLookupError {
                name: name.to_string(),
            })?;
        let raw = Picoseconds(samples.len() as u64 * self.config.sample_period().0);
        Ok(self.aligner.align(raw))
    }

    fn frequency_hz(&self, wire: &WireInstruction) -> Result<f64, DecodeError> {
        wire.frequency
            .map(|frequency| frequency * HZ_PER_GHZ)
            .ok_or_else(|| missing(wire, "frequency"))
    }

    fn phase(&self, wire: &WireInstruction) -> Result<f64, DecodeError> {
        wire.phase.ok_or_else(|| missing(wire, "phase"))
    }
}

fn missing(wire: &WireInstruction, field: &'static str) -> DecodeError {
    DecodeError::MissingField {
        instruction: wire.name.clone(),
        field,
    }
}
