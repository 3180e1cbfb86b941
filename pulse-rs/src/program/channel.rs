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

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::instruction::{InstructionKind, NativeInstruction};

/// Trailing digits of a channel name, optionally followed by a dotted clock suffix:
/// `m3` → 3, `cl0.baseband` → 0.
static CHANNEL_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex"));

/// The name of a control or acquisition channel, such as `d0`, `m1` or `cl0.baseband`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The measurement channel reading out `qubit`.
    pub fn measure(qubit: u32) -> Self {
        Self(format!("m{qubit}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric index embedded in the channel name, if any.
    pub fn index(&self) -> Option<u32> {
        CHANNEL_INDEX
            .captures(&self.0)
            .and_then(|captures| captures.get(1))
            .and_then(|index| index.as_str().parse().ok())
    }
}

impl From<&str> for ChannelId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ChannelId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The accumulated frame state of a channel at some point in its instruction list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Radians
    pub phase: f64,
    /// Hz
    pub frequency: f64,
    pub acquisitions: u32,
}

impl ChannelState {
    /// The state after `instruction` has been played on a channel in this state.
    pub fn advance(&self, instruction: &NativeInstruction) -> Self {
        Self {
            phase: self.phase + instruction.phase_delta(self),
            frequency: self.frequency + instruction.frequency_delta(self),
            acquisitions: self.acquisitions + instruction.acquisition_delta(),
        }
    }
}

/// Identifies a registered instruction by its channel and position on that channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionHandle {
    pub channel: ChannelId,
    pub position: usize,
}

/// The ordered list of instructions registered on one channel, in registration order.
///
/// State is played back incrementally as instructions are registered: `states[p]` is the state
/// before the instruction at position `p`, and the last entry is the final state.
#[derive(Clone, Debug)]
pub struct Channel {
    id: ChannelId,
    instructions: Vec<NativeInstruction>,
    states: Vec<ChannelState>,
}

impl Channel {
    pub fn new(id: ChannelId) -> Self {
        Self {
            id,
            instructions: Vec::new(),
            states: vec![ChannelState::default()],
        }
    }

    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    /// Append an instruction, returning its position.
    pub fn register(&mut self, instruction: NativeInstruction) -> usize {
        let position = self.instructions.len();
        let next = self.final_state().advance(&instruction);
        self.instructions.push(instruction);
        self.states.push(next);
        position
    }

    pub fn get(&self, position: usize) -> Option<&NativeInstruction> {
        self.instructions.get(position)
    }

    pub fn instructions(&self) -> &[NativeInstruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The state contributed by the instructions at positions `0..position`.
    ///
    /// The instruction at `position` itself is excluded. Positions at or past the end of the
    /// channel yield the final state.
    pub fn state_at(&self, position: usize) -> ChannelState {
        self.states
            .get(position)
            .copied()
            .unwrap_or_else(|| self.final_state())
    }

    /// Recompute [`Channel::state_at`] by replaying the instruction list from the start.
    pub fn replay_state_at(&self, position: usize) -> ChannelState {
        self.instructions
            .iter()
            .take(position)
            .fold(ChannelState::default(), |state, instruction| {
                state.advance(instruction)
            })
    }

    /// The state after every registered instruction.
    pub fn final_state(&self) -> ChannelState {
        self.states.last().copied().unwrap_or_default()
    }

    /// Number of acquisitions at positions `0..=position`.
    pub fn acquisitions_through(&self, position: usize) -> u32 {
        self.state_at(position.saturating_add(1)).acquisitions
    }

    /// Whether the channel holds nothing but a single delay.
    pub fn is_lone_delay(&self) -> bool {
        matches!(
            self.instructions.as_slice(),
            [instruction] if matches!(instruction.kind, InstructionKind::Delay(_))
        )
    }
}

/// All channels touched by one compilation pass, in order of first use.
#[derive(Clone, Debug, Default)]
pub struct ChannelRegistry {
    channels: IndexMap<ChannelId, Channel>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instruction on its channel, creating the channel on first use.
    pub fn register(&mut self, instruction: NativeInstruction) -> InstructionHandle {
        let channel_id = instruction.channel().clone();
        let position = self
            .channels
            .entry(channel_id.clone())
            .or_insert_with(|| Channel::new(channel_id.clone()))
            .register(instruction);
        InstructionHandle {
            channel: channel_id,
            position,
        }
    }

    pub fn get(&self, channel: &ChannelId) -> Option<&Channel> {
        self.channels.get(channel)
    }

    /// Borrow back a registered instruction.
    pub fn instruction(&self, handle: &InstructionHandle) -> Option<&NativeInstruction> {
        self.channels
            .get(&handle.channel)
            .and_then(|channel| channel.get(handle.position))
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of instructions registered across all channels.
    pub fn instruction_count(&self) -> usize {
        self.channels.values().map(Channel::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::instruction::{
        Acquire, Delay, InstructionHeader, SetFrequency, SetPhase, ShiftFrequency, ShiftPhase,
    };
    use crate::job::{AcquisitionProtocol, AcquisitionReturnType, BinMode};
    use crate::units::Picoseconds;

    fn instruction(channel: &str, kind: InstructionKind) -> NativeInstruction {
        NativeInstruction::new(
            InstructionHeader::new(
                ChannelId::from(channel),
                channel,
                Picoseconds::ZERO,
                Picoseconds(4_000),
            ),
            kind,
        )
    }

    fn acquire() -> InstructionKind {
        InstructionKind::Acquire(Acquire {
            qubit: 0,
            memory_slot: 0,
            protocol: AcquisitionProtocol::Trace,
            bin_mode: BinMode::Average,
            return_type: AcquisitionReturnType::Array,
        })
    }

    #[rstest]
    #[case("m3", Some(3))]
    #[case("d12", Some(12))]
    #[case("cl0.baseband", Some(0))]
    #[case("u0_1", Some(1))]
    #[case("baseband", None)]
    fn channel_index(#[case] name: &str, #[case] expected: Option<u32>) {
        assert_eq!(ChannelId::from(name).index(), expected);
    }

    #[test]
    fn state_excludes_own_contribution() {
        let mut channel = Channel::new(ChannelId::from("d0"));
        let set = channel.register(instruction(
            "d0",
            InstructionKind::SetPhase(SetPhase::new(FRAC_PI_2)),
        ));
        let shift = channel.register(instruction(
            "d0",
            InstructionKind::ShiftPhase(ShiftPhase::new(PI)),
        ));

        assert_eq!(set, 0);
        assert_eq!(shift, 1);
        assert_relative_eq!(channel.state_at(0).phase, 0.0);
        assert_relative_eq!(channel.state_at(1).phase, FRAC_PI_2);
        assert_relative_eq!(channel.state_at(2).phase, FRAC_PI_2 + PI);
        assert_relative_eq!(channel.final_state().phase, FRAC_PI_2 + PI);
        assert_relative_eq!(channel.state_at(99).phase, FRAC_PI_2 + PI);
    }

    #[test]
    fn set_frequency_overrides_shifts() {
        let mut channel = Channel::new(ChannelId::from("d0"));
        channel.register(instruction(
            "d0",
            InstructionKind::ShiftFrequency(ShiftFrequency::new(1e6)),
        ));
        channel.register(instruction(
            "d0",
            InstructionKind::SetFrequency(SetFrequency::new(5e9)),
        ));
        channel.register(instruction(
            "d0",
            InstructionKind::ShiftFrequency(ShiftFrequency::new(-2e6)),
        ));
        assert_relative_eq!(channel.state_at(2).frequency, 5e9);
        assert_relative_eq!(channel.final_state().frequency, 5e9 - 2e6);
    }

    #[test]
    fn acquisitions_count_across_delays() {
        let mut channel = Channel::new(ChannelId::from("m0"));
        let first = channel.register(instruction("m0", acquire()));
        channel.register(instruction("m0", InstructionKind::Delay(Delay)));
        let second = channel.register(instruction("m0", acquire()));

        assert_eq!(channel.acquisitions_through(first), 1);
        assert_eq!(channel.acquisitions_through(first + 1), 1);
        assert_eq!(channel.acquisitions_through(second), 2);
        assert_eq!(channel.state_at(second).acquisitions, 1);
    }

    #[test]
    fn lone_delay() {
        let mut channel = Channel::new(ChannelId::from("d0"));
        assert!(!channel.is_lone_delay());
        channel.register(instruction("d0", InstructionKind::Delay(Delay)));
        assert!(channel.is_lone_delay());
        channel.register(instruction("d0", InstructionKind::Delay(Delay)));
        assert!(!channel.is_lone_delay());
    }

    #[test]
    fn registry_creates_channels_in_order_of_use() {
        let mut registry = ChannelRegistry::new();
        let first = registry.register(instruction("d1", InstructionKind::Delay(Delay)));
        registry.register(instruction("d0", InstructionKind::Delay(Delay)));
        let third = registry.register(instruction("d1", acquire()));

        assert_eq!(first.position, 0);
        assert_eq!(third.position, 1);
        assert_eq!(
            registry
                .channels()
                .map(|channel| channel.id().as_str())
                .collect::<Vec<_>>(),
            vec!["d1", "d0"]
        );
        assert_eq!(registry.instruction_count(), 3);
        assert_eq!(
            registry.instruction(&third).map(|instruction| &instruction.kind),
            Some(&acquire())
        );
    }

    fn arbitrary_kind() -> impl Strategy<Value = InstructionKind> {
        prop_oneof![
            (-10.0f64..10.0).prop_map(|phase| InstructionKind::SetPhase(SetPhase::new(phase))),
            (-10.0f64..10.0).prop_map(|phase| InstructionKind::ShiftPhase(ShiftPhase::new(phase))),
            (0.0f64..1e10)
                .prop_map(|frequency| InstructionKind::SetFrequency(SetFrequency::new(frequency))),
            (-1e8f64..1e8).prop_map(|frequency| InstructionKind::ShiftFrequency(
                ShiftFrequency::new(frequency)
            )),
            Just(InstructionKind::Delay(Delay)),
            Just(acquire()),
        ]
    }

    proptest! {
        #[test]
        fn incremental_state_matches_replay(kinds in prop::collection::vec(arbitrary_kind(), 0..40)) {
            let mut channel = Channel::new(ChannelId::from("d0"));
            for kind in kinds {
                channel.register(instruction("d0", kind));
            }
            for position in 0..=channel.len() {
                let incremental = channel.state_at(position);
                let replayed = channel.replay_state_at(position);
                prop_assert!((incremental.phase - replayed.phase).abs() < 1e-9);
                prop_assert!((incremental.frequency - replayed.frequency).abs() < 1e-3);
                prop_assert_eq!(incremental.acquisitions, replayed.acquisitions);
            }
        }
    }
}
