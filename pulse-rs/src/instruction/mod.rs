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

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::CompileResult;
use crate::job::{AcquisitionProtocol, WaveformLibrary};
use crate::operation::{
    AcquisitionOperation, IdleOperation, IntegrationWeight, Interpolation, Operation,
    PulseOperation,
};
use crate::program::{Channel, ChannelId, ChannelState};
use crate::units::{Picoseconds, Radians};
use crate::waveform::{apply_phase, time_tags, WaveformLookupError};

mod acquire;
mod frame;
mod label;
mod pulse;
mod timing;

pub use self::acquire::{Acquire, UnsupportedProtocolError};
pub use self::frame::{SetFrequency, SetPhase, ShiftFrequency, ShiftPhase};
pub use self::label::Label;
pub use self::pulse::{LibraryPulse, ParametricPulse};
pub use self::timing::{Delay, InitialObject};

/// Attributes common to every native instruction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstructionHeader {
    pub t0: Picoseconds,
    pub channel: ChannelId,
    pub port: String,
    pub duration: Picoseconds,
    pub label: Label,
}

impl InstructionHeader {
    /// Build a header with a freshly generated label.
    pub fn new(
        channel: ChannelId,
        port: impl Into<String>,
        t0: Picoseconds,
        duration: Picoseconds,
    ) -> Self {
        Self {
            t0,
            channel,
            port: port.into(),
            duration,
            label: Label::new(),
        }
    }

    /// The first instant after the instruction has finished.
    pub fn end(&self) -> Picoseconds {
        self.t0 + self.duration
    }
}

// The label is an identity tag, not a property of the instruction.
impl PartialEq for InstructionHeader {
    fn eq(&self, other: &Self) -> bool {
        self.t0 == other.t0
            && self.channel == other.channel
            && self.port == other.port
            && self.duration == other.duration
    }
}

impl Eq for InstructionHeader {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "attributes", rename_all = "snake_case")]
pub enum InstructionKind {
    InitialObject(InitialObject),
    Delay(Delay),
    Acquire(Acquire),
    SetFrequency(SetFrequency),
    ShiftFrequency(ShiftFrequency),
    SetPhase(SetPhase),
    ShiftPhase(ShiftPhase),
    ParametricPulse(ParametricPulse),
    LibraryPulse(LibraryPulse),
}

/// One instruction of the closed native set, bound to a channel and a grid-aligned time slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeInstruction {
    pub header: InstructionHeader,
    pub kind: InstructionKind,
}

impl NativeInstruction {
    pub fn new(header: InstructionHeader, kind: InstructionKind) -> Self {
        Self { header, kind }
    }

    pub fn t0(&self) -> Picoseconds {
        self.header.t0
    }

    pub fn duration(&self) -> Picoseconds {
        self.header.duration
    }

    pub fn end(&self) -> Picoseconds {
        self.header.end()
    }

    pub fn channel(&self) -> &ChannelId {
        &self.header.channel
    }

    pub fn label(&self) -> Label {
        self.header.label
    }

    /// The change this instruction makes to the channel phase, given the state before it.
    pub fn phase_delta(&self, current: &ChannelState) -> f64 {
        match &self.kind {
            InstructionKind::SetPhase(SetPhase { phase }) => phase - current.phase,
            InstructionKind::ShiftPhase(ShiftPhase { phase }) => *phase,
            _ => 0.0,
        }
    }

    /// The change this instruction makes to the channel frequency, given the state before it.
    pub fn frequency_delta(&self, current: &ChannelState) -> f64 {
        match &self.kind {
            InstructionKind::SetFrequency(SetFrequency { frequency }) => {
                frequency - current.frequency
            }
            InstructionKind::ShiftFrequency(ShiftFrequency { frequency }) => *frequency,
            _ => 0.0,
        }
    }

    pub fn acquisition_delta(&self) -> u32 {
        match &self.kind {
            InstructionKind::Acquire(_) => 1,
            _ => 0,
        }
    }

    /// A short name describing what the instruction does: the wire kind, the pulse shape, the
    /// library waveform or the acquisition protocol.
    pub fn pretty_name(&self) -> String {
        match &self.kind {
            InstructionKind::InitialObject(_) => "initial_object".to_string(),
            InstructionKind::Delay(_) => "delay".to_string(),
            InstructionKind::Acquire(acquire) => acquire.protocol.to_string(),
            InstructionKind::SetFrequency(_) => "setf".to_string(),
            InstructionKind::ShiftFrequency(_) => "shiftf".to_string(),
            InstructionKind::SetPhase(_) => "setp".to_string(),
            InstructionKind::ShiftPhase(_) => "fc".to_string(),
            InstructionKind::ParametricPulse(pulse) => pulse.shape.pulse_shape().to_string(),
            InstructionKind::LibraryPulse(pulse) => pulse.name.clone(),
        }
    }

    /// The operation name: `{pretty_name}-{channel}-{t0 in whole ns}`.
    pub fn unique_name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.pretty_name(),
            self.header.channel,
            self.header.t0.as_nanoseconds().round()
        )
    }

    /// Render the instruction registered at `position` on `channel` into an [`Operation`].
    ///
    /// The result depends only on the instruction itself, the job's waveform library, and the
    /// channel state accumulated by instructions registered before `position`.
    pub fn to_operation(
        &self,
        channel: &Channel,
        position: usize,
        library: &WaveformLibrary,
    ) -> CompileResult<Operation> {
        let name = self.unique_name();
        let clock = self.header.channel.to_string();
        let duration = self.header.duration.as_seconds();

        match &self.kind {
            InstructionKind::InitialObject(_)
            | InstructionKind::Delay(_)
            | InstructionKind::SetFrequency(_)
            | InstructionKind::ShiftFrequency(_)
            | InstructionKind::SetPhase(_)
            | InstructionKind::ShiftPhase(_) => Ok(Operation::Idle(IdleOperation {
                name,
                clock,
                t0: 0.0,
                duration,
            })),
            InstructionKind::Acquire(acquire) => {
                acquire.protocol.check_supported()?;
                let weights = match acquire.protocol {
                    AcquisitionProtocol::IntegratedComplex => vec![
                        IntegrationWeight {
                            amplitude: Complex64::new(1.0, 0.0),
                            duration,
                        },
                        IntegrationWeight {
                            amplitude: Complex64::new(0.0, 1.0),
                            duration,
                        },
                    ],
                    _ => Vec::new(),
                };
                let acq_channel = self.header.channel.index().unwrap_or(acquire.qubit);
                let acq_index = channel.acquisitions_through(position).saturating_sub(1);

                Ok(Operation::Acquisition(AcquisitionOperation {
                    name,
                    clock,
                    port: self.header.port.clone(),
                    t0: 0.0,
                    duration,
                    // demodulation is referenced to zero; frame phase only rotates pulses
                    phase: 0.0,
                    weights,
                    acq_channel,
                    acq_index,
                    bin_mode: acquire.bin_mode,
                    return_type: acquire.return_type,
                    protocol: acquire.protocol.clone(),
                }))
            }
            InstructionKind::ParametricPulse(pulse) => {
                let samples = pulse.shape.samples();
                Ok(self.render_samples(name, clock, samples, channel, position))
            }
            InstructionKind::LibraryPulse(pulse) => {
                let samples = library
                    .get(&pulse.name)
                    .ok_or_else(|| WaveformLookupError {
                        name: pulse.name.clone(),
                    })?
                    .to_vec();
                Ok(self.render_samples(name, clock, samples, channel, position))
            }
        }
    }

    fn render_samples(
        &self,
        name: String,
        clock: String,
        mut samples: Vec<Complex64>,
        channel: &Channel,
        position: usize,
    ) -> Operation {
        let duration = self.header.duration.as_seconds();
        apply_phase(&mut samples, Radians(channel.state_at(position).phase));
        let time_samples = time_tags(duration, samples.len());
        Operation::Pulse(PulseOperation {
            name,
            clock,
            port: self.header.port.clone(),
            t0: 0.0,
            duration,
            samples,
            time_samples,
            interpolation: Interpolation::Linear,
        })
    }
}

impl fmt::Display for NativeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} @ [{}, {})",
            self.pretty_name(),
            self.header.channel,
            self.header.t0,
            self.end()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;
    use crate::error::CompileError;
    use crate::job::{AcquisitionReturnType, BinMode};
    use crate::waveform::{Constant, ParametricShape};

    fn ns(value: u64) -> Picoseconds {
        Picoseconds::from_nanoseconds_unchecked(value)
    }

    fn header(channel: &str, t0: u64, duration: u64) -> InstructionHeader {
        InstructionHeader::new(ChannelId::from(channel), channel, ns(t0), ns(duration))
    }

    fn acquire(channel: &str, t0: u64, protocol: &str) -> NativeInstruction {
        NativeInstruction::new(
            header(channel, t0, 8),
            InstructionKind::Acquire(Acquire {
                qubit: 0,
                memory_slot: 0,
                protocol: protocol.to_string().into(),
                bin_mode: BinMode::Average,
                return_type: AcquisitionReturnType::Complex,
            }),
        )
    }

    fn constant_pulse(channel: &str, t0: u64) -> NativeInstruction {
        NativeInstruction::new(
            header(channel, t0, 4),
            InstructionKind::ParametricPulse(ParametricPulse::new(ParametricShape::Constant(
                Constant {
                    duration: 4,
                    amp: Complex64::new(1.0, 0.0),
                },
            ))),
        )
    }

    #[test]
    fn equality_ignores_label() {
        let first = NativeInstruction::new(
            header("d0", 4, 8),
            InstructionKind::ShiftPhase(ShiftPhase::new(f64::NAN)),
        );
        let second = NativeInstruction::new(
            header("d0", 4, 8),
            InstructionKind::ShiftPhase(ShiftPhase::new(f64::NAN)),
        );
        assert_ne!(first.label(), second.label());
        assert_eq!(first, second);

        let moved = NativeInstruction::new(
            header("d0", 8, 8),
            InstructionKind::ShiftPhase(ShiftPhase::new(f64::NAN)),
        );
        assert_ne!(first, moved);
    }

    #[test]
    fn display() {
        insta::assert_snapshot!(constant_pulse("d0", 8), @"constant on d0 @ [8 ns, 12 ns)");
        insta::assert_snapshot!(acquire("m1", 0, "trace"), @"trace on m1 @ [0 ns, 8 ns)");
    }

    #[rstest]
    #[case(InstructionKind::SetPhase(SetPhase::new(PI)), 1.0, PI - 1.0)]
    #[case(InstructionKind::ShiftPhase(ShiftPhase::new(0.5)), 1.0, 0.5)]
    #[case(InstructionKind::Delay(Delay), 1.0, 0.0)]
    fn phase_delta(#[case] kind: InstructionKind, #[case] current: f64, #[case] expected: f64) {
        let instruction = NativeInstruction::new(header("d0", 0, 0), kind);
        let state = ChannelState {
            phase: current,
            ..Default::default()
        };
        assert_relative_eq!(instruction.phase_delta(&state), expected);
    }

    #[rstest]
    #[case(InstructionKind::SetFrequency(SetFrequency::new(5e9)), 4e9, 1e9)]
    #[case(InstructionKind::ShiftFrequency(ShiftFrequency::new(-2e6)), 4e9, -2e6)]
    #[case(InstructionKind::SetPhase(SetPhase::new(1.0)), 4e9, 0.0)]
    fn frequency_delta(
        #[case] kind: InstructionKind,
        #[case] current: f64,
        #[case] expected: f64,
    ) {
        let instruction = NativeInstruction::new(header("d0", 0, 0), kind);
        let state = ChannelState {
            frequency: current,
            ..Default::default()
        };
        assert_relative_eq!(instruction.frequency_delta(&state), expected);
    }

    #[test]
    fn unique_name() {
        assert_eq!(
            acquire("m0", 12, "SSBIntegrationComplex").unique_name(),
            "SSBIntegrationComplex-m0-12"
        );
        assert_eq!(constant_pulse("d1", 8).unique_name(), "constant-d1-8");
    }

    #[test]
    fn frame_updates_render_as_idle() {
        let mut channel = Channel::new(ChannelId::from("d0"));
        let position = channel.register(NativeInstruction::new(
            header("d0", 4, 0),
            InstructionKind::SetPhase(SetPhase::new(1.0)),
        ));
        let operation = channel
            .get(position)
            .unwrap()
            .to_operation(&channel, position, &WaveformLibrary::default())
            .unwrap();
        assert_eq!(
            operation,
            Operation::Idle(IdleOperation {
                name: "setp-d0-4".to_string(),
                clock: "d0".to_string(),
                t0: 0.0,
                duration: 0.0,
            })
        );
    }

    #[test]
    fn pulse_is_rotated_by_preceding_phase() {
        let mut channel = Channel::new(ChannelId::from("d0"));
        channel.register(NativeInstruction::new(
            header("d0", 0, 0),
            InstructionKind::SetPhase(SetPhase::new(FRAC_PI_2)),
        ));
        let position = channel.register(constant_pulse("d0", 0));
        // A later phase change must not affect the earlier pulse.
        channel.register(NativeInstruction::new(
            header("d0", 4, 0),
            InstructionKind::ShiftPhase(ShiftPhase::new(PI)),
        ));

        let operation = channel
            .get(position)
            .unwrap()
            .to_operation(&channel, position, &WaveformLibrary::default())
            .unwrap();
        let pulse = match operation {
            Operation::Pulse(pulse) => pulse,
            other => panic!("expected a pulse, got {other:?}"),
        };
        assert_eq!(pulse.samples.len(), 4);
        for sample in &pulse.samples {
            assert_relative_eq!(*sample, Complex64::new(0.0, 1.0), epsilon = 1e-12);
        }
        assert_eq!(pulse.time_samples.len(), 4);
        assert_relative_eq!(pulse.time_samples[3], 4e-9);
    }

    #[test]
    fn library_pulse_lookup() {
        let library: WaveformLibrary =
            [("x90".to_string(), vec![Complex64::new(0.5, 0.0); 2])].into_iter().collect();
        let mut channel = Channel::new(ChannelId::from("d0"));
        let found = channel.register(NativeInstruction::new(
            header("d0", 0, 4),
            InstructionKind::LibraryPulse(LibraryPulse::new("x90")),
        ));
        let missing = channel.register(NativeInstruction::new(
            header("d0", 4, 4),
            InstructionKind::LibraryPulse(LibraryPulse::new("y90")),
        ));

        let operation = channel
            .get(found)
            .unwrap()
            .to_operation(&channel, found, &library)
            .unwrap();
        assert_eq!(operation.name(), "x90-d0-0");
        assert_eq!(operation.port(), Some("d0"));

        let error = channel
            .get(missing)
            .unwrap()
            .to_operation(&channel, missing, &library)
            .unwrap_err();
        assert!(matches!(
            error,
            CompileError::WaveformLookup(WaveformLookupError { name }) if name == "y90"
        ));
    }

    #[rstest]
    #[case("SSBIntegrationComplex", 2)]
    #[case("trace", 0)]
    fn acquisition_weights(#[case] protocol: &str, #[case] weights: usize) {
        let mut channel = Channel::new(ChannelId::from("m3"));
        let position = channel.register(acquire("m3", 0, protocol));
        let operation = channel
            .get(position)
            .unwrap()
            .to_operation(&channel, position, &WaveformLibrary::default())
            .unwrap();
        let acquisition = operation.as_acquisition().unwrap();
        assert_eq!(acquisition.weights.len(), weights);
        assert_eq!(acquisition.acq_channel, 3);
        assert_eq!(acquisition.acq_index, 0);
        assert_eq!(
            acquisition.protocol,
            AcquisitionProtocol::from(protocol.to_string())
        );
    }

    #[test]
    fn acquisition_ignores_frame_phase() {
        let mut channel = Channel::new(ChannelId::from("m0"));
        channel.register(NativeInstruction::new(
            header("m0", 0, 0),
            InstructionKind::SetPhase(SetPhase::new(FRAC_PI_2)),
        ));
        let position = channel.register(acquire("m0", 0, "SSBIntegrationComplex"));
        assert_relative_eq!(channel.state_at(position).phase, FRAC_PI_2);

        let operation = channel
            .get(position)
            .unwrap()
            .to_operation(&channel, position, &WaveformLibrary::default())
            .unwrap();
        assert_eq!(operation.as_acquisition().unwrap().phase, 0.0);
    }

    #[test]
    fn unsupported_protocol_fails_to_render() {
        let mut channel = Channel::new(ChannelId::from("m0"));
        let position = channel.register(acquire("m0", 0, "SSBIntegrationReal"));
        let error = channel
            .get(position)
            .unwrap()
            .to_operation(&channel, position, &WaveformLibrary::default())
            .unwrap_err();
        assert!(matches!(
            error,
            CompileError::UnsupportedProtocol(UnsupportedProtocolError { protocol })
                if protocol == "SSBIntegrationReal"
        ));
    }
}
