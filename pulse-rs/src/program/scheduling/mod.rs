//! Assembly of registered instructions into a per-channel, time-ordered schedule.

pub(crate) mod graph;
pub(crate) mod schedule;

use std::fmt;

use tracing::{debug, instrument};

use crate::instruction::{Label, NativeInstruction};
use crate::program::{ChannelId, ChannelRegistry};

pub use graph::{ScheduleGraph, ScheduledGraphNode};
pub use schedule::{ChannelSchedule, ManifestEntry, Schedule, ScheduleEntry, TimeSpan};

/// One side of a scheduling conflict.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictingInstruction {
    pub position: usize,
    pub label: Label,
    pub name: String,
    pub time_span: TimeSpan,
}

impl ConflictingInstruction {
    fn new(position: usize, instruction: &NativeInstruction) -> Self {
        Self {
            position,
            label: instruction.label(),
            name: instruction.unique_name(),
            time_span: TimeSpan::new(instruction.t0(), instruction.duration()),
        }
    }
}

impl fmt::Display for ConflictingInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.name, self.label, self.time_span)
    }
}

/// Two instructions on the same channel overlap in time.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("instructions overlap on channel {channel}: {earlier} and {later}")]
pub struct SchedulingConflictError {
    pub channel: ChannelId,
    pub earlier: ConflictingInstruction,
    pub later: ConflictingInstruction,
}

/// Lay out every channel of the registry in time order and verify nothing overlaps.
///
/// Each channel is stably sorted by start time, so instructions starting together keep their
/// registration order.
#[instrument(skip_all, fields(channels = registry.len()))]
pub fn assemble(registry: &ChannelRegistry) -> Result<Schedule, SchedulingConflictError> {
    let mut graph = ScheduleGraph::new();
    let mut channels = Vec::with_capacity(registry.len());

    for (channel_index, channel) in registry.channels().enumerate() {
        let instructions = channel.instructions();
        let mut order: Vec<usize> = (0..instructions.len()).collect();
        order.sort_by_key(|&position| instructions[position].t0());

        for &position in &order {
            graph.add_node(ScheduledGraphNode::new(channel_index, position));
        }
        for pair in order.windows(2) {
            let (earlier, later) = (pair[0], pair[1]);
            let gap = instructions[later]
                .t0()
                .signed_difference(instructions[earlier].end());
            if gap < 0 {
                return Err(SchedulingConflictError {
                    channel: channel.id().clone(),
                    earlier: ConflictingInstruction::new(earlier, &instructions[earlier]),
                    later: ConflictingInstruction::new(later, &instructions[later]),
                });
            }
            graph.add_gap(
                ScheduledGraphNode::new(channel_index, earlier),
                ScheduledGraphNode::new(channel_index, later),
                instructions[later].t0() - instructions[earlier].end(),
            );
        }

        let entries = order
            .into_iter()
            .map(|position| {
                let instruction = &instructions[position];
                ScheduleEntry {
                    position,
                    label: instruction.label(),
                    name: instruction.unique_name(),
                    time_span: TimeSpan::new(instruction.t0(), instruction.duration()),
                }
            })
            .collect();
        channels.push(ChannelSchedule {
            channel: channel.id().clone(),
            entries,
        });
    }

    let schedule = Schedule::new(channels, graph);
    debug!(
        total_duration = %schedule.total_duration(),
        edges = schedule.graph().edge_count(),
        "assembled schedule"
    );
    Ok(schedule)
}
